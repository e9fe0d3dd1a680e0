//! Character vocabulary and label index.
//!
//! Both are built once from the training corpus and never mutated afterwards.
//! They are shared by `Arc` between the dataset, the predictor and the
//! trained classifier.

use std::collections::{BTreeSet, HashMap};

use crate::classifier::ClassifierError;

/// Id reserved for padding and for characters absent from the vocabulary.
pub const PAD_ID: usize = 0;

/// Display form of the padding/unknown sentinel.
pub const PAD_TOKEN: &str = "<pad>";

/// Mapping from character to a stable integer id.
///
/// Id 0 is always the padding/unknown sentinel. Every other id is handed out
/// in first-seen order starting at 1, so building twice from the same records
/// in the same order yields the same mapping.
///
/// ```
/// use charcls::Vocabulary;
///
/// let vocab = Vocabulary::build(["播放音乐", "播放"]);
/// assert_eq!(vocab.len(), 5);
/// assert_eq!(vocab.id('播'), 1);
/// assert_eq!(vocab.id('?'), charcls::PAD_ID);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    token_to_id: HashMap<char, usize>,
    // id_to_token[i] holds the character with id i + 1
    id_to_token: Vec<char>,
}

impl Vocabulary {
    /// Builds a vocabulary from records in iteration order.
    pub fn build<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut token_to_id = HashMap::new();
        let mut id_to_token = Vec::new();
        for text in texts {
            for ch in text.as_ref().chars() {
                token_to_id.entry(ch).or_insert_with(|| {
                    id_to_token.push(ch);
                    id_to_token.len()
                });
            }
        }
        Self { token_to_id, id_to_token }
    }

    /// Number of ids, including the sentinel.
    pub fn len(&self) -> usize {
        self.id_to_token.len() + 1
    }

    /// True when only the sentinel is present.
    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Id for `ch`, or [`PAD_ID`] when the character was never seen.
    pub fn id(&self, ch: char) -> usize {
        self.token_to_id.get(&ch).copied().unwrap_or(PAD_ID)
    }

    pub fn contains(&self, ch: char) -> bool {
        self.token_to_id.contains_key(&ch)
    }

    /// Character for a non-sentinel id.
    pub fn token(&self, id: usize) -> Option<char> {
        id.checked_sub(1).and_then(|i| self.id_to_token.get(i)).copied()
    }

    /// Characters with their ids, in id order. The sentinel is not included.
    pub fn iter(&self) -> impl Iterator<Item = (char, usize)> + '_ {
        self.id_to_token.iter().enumerate().map(|(i, &ch)| (ch, i + 1))
    }
}

/// Bidirectional mapping between label strings and class positions.
///
/// Labels are sorted before ids are assigned, so the mapping does not depend
/// on corpus order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelIndex {
    /// Builds the index from every label occurrence in the corpus.
    ///
    /// # Errors
    /// `ValidationError` if there are no labels or a label is empty.
    pub fn build<I, S>(labels: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct = BTreeSet::new();
        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                return Err(ClassifierError::ValidationError("Class label cannot be empty".into()));
            }
            distinct.insert(label.to_string());
        }
        if distinct.is_empty() {
            return Err(ClassifierError::ValidationError(
                "At least one class label is required".into(),
            ));
        }

        let labels: Vec<String> = distinct.into_iter().collect();
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Ok(Self { labels, index })
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Class position of `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Label at class position `index`.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Labels in class-position order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Converts label strings to class positions.
    ///
    /// # Errors
    /// `ValidationError` for a label that is not part of the index.
    pub fn encode<I, S>(&self, labels: I) -> Result<Vec<usize>, ClassifierError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| {
                let label = label.as_ref();
                self.index_of(label).ok_or_else(|| {
                    ClassifierError::ValidationError(format!("Unknown class label '{}'", label))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let vocab = Vocabulary::build(["帮我导航到北京", "播放音乐"]);
        let expected = "帮我导航到北京播放音乐";
        for (i, ch) in expected.chars().enumerate() {
            assert_eq!(vocab.id(ch), i + 1);
            assert_eq!(vocab.token(i + 1), Some(ch));
        }
        assert_eq!(vocab.len(), 12);
        assert_eq!(vocab.token(PAD_ID), None);
    }

    #[test]
    fn test_repeated_characters_keep_first_id() {
        let vocab = Vocabulary::build(["abca", "cab"]);
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.id('a'), 1);
        assert_eq!(vocab.id('c'), 3);
    }

    #[test]
    fn test_empty_input() {
        let vocab = Vocabulary::build(Vec::<String>::new());
        assert_eq!(vocab.len(), 1);
        assert!(vocab.is_empty());

        let vocab = Vocabulary::build(["", ""]);
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn test_both_directions_agree() {
        let vocab = Vocabulary::build(["查询明天北京的天气", "播放音乐"]);
        assert_eq!(vocab.iter().count(), vocab.len() - 1);
        for (ch, id) in vocab.iter() {
            assert_eq!(vocab.id(ch), id);
            assert_eq!(vocab.token(id), Some(ch));
        }

        let index = LabelIndex::build(["Weather-Query", "Music-Play"]).unwrap();
        for (position, label) in index.labels().iter().enumerate() {
            assert_eq!(index.index_of(label), Some(position));
            assert_eq!(index.label(position), Some(label.as_str()));
        }
    }

    #[test]
    fn test_label_index_sorted() {
        let index = LabelIndex::build(["Music-Play", "Travel-Query", "Music-Play", "Alarm-Update"]).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.labels(), &["Alarm-Update", "Music-Play", "Travel-Query"]);
        assert_eq!(index.index_of("Travel-Query"), Some(2));
        assert_eq!(index.label(1), Some("Music-Play"));
        assert_eq!(index.label(3), None);
    }

    #[test]
    fn test_label_index_validation() {
        assert!(LabelIndex::build(Vec::<&str>::new()).is_err());
        assert!(LabelIndex::build(["ok", ""]).is_err());

        let index = LabelIndex::build(["a", "b"]).unwrap();
        assert_eq!(index.encode(["b", "a"]).unwrap(), vec![1, 0]);
        assert!(matches!(index.encode(["c"]), Err(ClassifierError::ValidationError(_))));
    }
}

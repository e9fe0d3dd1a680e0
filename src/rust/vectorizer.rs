//! Fixed-length vectorization of raw text.
//!
//! Text is truncated to its first `max_len` characters and mapped through the
//! [`Vocabulary`]. Unknown characters map to [`PAD_ID`] and carry no signal.

use std::sync::Arc;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;
use crate::vocab::{Vocabulary, PAD_ID};

/// How a text is turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorizeMode {
    /// `max_len` vocabulary ids, right-padded with [`PAD_ID`]
    Sequence,
    /// `vocab_size` counts of the ids among the first `max_len` characters
    BagOfWords,
}

/// A single vectorized record.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    Ids(Array1<usize>),
    Counts(Array1<f32>),
}

impl Encoded {
    pub fn len(&self) -> usize {
        match self {
            Encoded::Ids(ids) => ids.len(),
            Encoded::Counts(counts) => counts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> VectorizeMode {
        match self {
            Encoded::Ids(_) => VectorizeMode::Sequence,
            Encoded::Counts(_) => VectorizeMode::BagOfWords,
        }
    }
}

/// A stack of vectorized records, one row per record.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    Ids(Array2<usize>),
    Counts(Array2<f32>),
}

impl BatchInput {
    /// Stacks records of the same mode and width into a batch.
    ///
    /// # Errors
    /// `ValidationError` on an empty slice, mixed modes or mixed widths.
    pub fn stack(records: &[&Encoded]) -> Result<Self, ClassifierError> {
        let first = records
            .first()
            .ok_or_else(|| ClassifierError::ValidationError("Cannot stack an empty batch".into()))?;
        let width = first.len();
        if records.iter().any(|r| r.mode() != first.mode() || r.len() != width) {
            return Err(ClassifierError::ValidationError(
                "All records in a batch must share mode and width".into(),
            ));
        }

        match first.mode() {
            VectorizeMode::Sequence => {
                let data = records
                    .iter()
                    .flat_map(|r| match r {
                        Encoded::Ids(ids) => ids.to_vec(),
                        Encoded::Counts(_) => Vec::new(),
                    })
                    .collect();
                Ok(BatchInput::Ids(Array2::from_shape_vec((records.len(), width), data)?))
            }
            VectorizeMode::BagOfWords => {
                let data = records
                    .iter()
                    .flat_map(|r| match r {
                        Encoded::Counts(counts) => counts.to_vec(),
                        Encoded::Ids(_) => Vec::new(),
                    })
                    .collect();
                Ok(BatchInput::Counts(Array2::from_shape_vec((records.len(), width), data)?))
            }
        }
    }

    /// Number of records in the batch.
    pub fn rows(&self) -> usize {
        match self {
            BatchInput::Ids(ids) => ids.nrows(),
            BatchInput::Counts(counts) => counts.nrows(),
        }
    }

    /// Width of each record.
    pub fn width(&self) -> usize {
        match self {
            BatchInput::Ids(ids) => ids.ncols(),
            BatchInput::Counts(counts) => counts.ncols(),
        }
    }

    pub fn mode(&self) -> VectorizeMode {
        match self {
            BatchInput::Ids(_) => VectorizeMode::Sequence,
            BatchInput::Counts(_) => VectorizeMode::BagOfWords,
        }
    }
}

impl From<Encoded> for BatchInput {
    /// A batch holding a single record.
    fn from(record: Encoded) -> Self {
        match record {
            Encoded::Ids(ids) => BatchInput::Ids(ids.insert_axis(Axis(0))),
            Encoded::Counts(counts) => BatchInput::Counts(counts.insert_axis(Axis(0))),
        }
    }
}

/// Turns text into fixed-length numeric records.
///
/// ```
/// use std::sync::Arc;
/// use charcls::{Vocabulary, Vectorizer, VectorizeMode};
///
/// let vocab = Arc::new(Vocabulary::build(["播放音乐"]));
/// let vectorizer = Vectorizer::new(vocab, 3, VectorizeMode::Sequence).unwrap();
/// assert_eq!(vectorizer.ids("播放音乐").to_vec(), vec![1, 2, 3]);
/// assert_eq!(vectorizer.ids("放").to_vec(), vec![2, 0, 0]);
/// ```
#[derive(Debug, Clone)]
pub struct Vectorizer {
    vocab: Arc<Vocabulary>,
    max_len: usize,
    mode: VectorizeMode,
}

impl Vectorizer {
    /// # Errors
    /// `ValidationError` when `max_len` is zero.
    pub fn new(vocab: Arc<Vocabulary>, max_len: usize, mode: VectorizeMode) -> Result<Self, ClassifierError> {
        if max_len == 0 {
            return Err(ClassifierError::ValidationError("max_len must be greater than zero".into()));
        }
        Ok(Self { vocab, max_len, mode })
    }

    pub fn vocab(&self) -> &Arc<Vocabulary> {
        &self.vocab
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn mode(&self) -> VectorizeMode {
        self.mode
    }

    /// Length of every record this vectorizer produces.
    pub fn width(&self) -> usize {
        match self.mode {
            VectorizeMode::Sequence => self.max_len,
            VectorizeMode::BagOfWords => self.vocab.len(),
        }
    }

    /// Ids of the first `max_len` characters, right-padded with [`PAD_ID`].
    pub fn ids(&self, text: &str) -> Array1<usize> {
        let mut ids: Vec<usize> = text.chars().take(self.max_len).map(|ch| self.vocab.id(ch)).collect();
        ids.resize(self.max_len, PAD_ID);
        Array1::from(ids)
    }

    /// Count vector over the vocabulary. Position [`PAD_ID`] is never counted.
    pub fn bag_of_words(&self, text: &str) -> Array1<f32> {
        let mut counts = Array1::zeros(self.vocab.len());
        for id in self.ids(text).iter().copied().filter(|&id| id != PAD_ID) {
            counts[id] += 1.0;
        }
        counts
    }

    /// Vectorizes `text` according to the configured mode.
    pub fn encode(&self, text: &str) -> Encoded {
        match self.mode {
            VectorizeMode::Sequence => Encoded::Ids(self.ids(text)),
            VectorizeMode::BagOfWords => Encoded::Counts(self.bag_of_words(text)),
        }
    }
}

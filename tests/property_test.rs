use std::collections::HashSet;
use std::sync::Arc;

use charcls::{BatchOrder, LabeledDataset, VectorizeMode, Vectorizer, Vocabulary, PAD_ID};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Short texts over a small CJK alphabet so characters repeat across records
fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('\u{4e00}', '\u{4e1f}'), 0..16).prop_map(|chars| chars.into_iter().collect())
}

fn arb_corpus() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_text(), 0..12)
}

proptest! {
    #[test]
    fn vocabulary_is_deterministic(texts in arb_corpus()) {
        let a = Vocabulary::build(&texts);
        let b = Vocabulary::build(&texts);
        prop_assert_eq!(&a, &b);

        let distinct: HashSet<char> = texts.iter().flat_map(|t| t.chars()).collect();
        prop_assert_eq!(a.len(), distinct.len() + 1);
        for ch in distinct {
            let id = a.id(ch);
            prop_assert!(id != PAD_ID && id < a.len());
            prop_assert_eq!(a.token(id), Some(ch));
        }
        prop_assert_eq!(a.token(PAD_ID), None);
    }

    #[test]
    fn vectorized_length_is_fixed(texts in arb_corpus(), text in arb_text(), max_len in 1usize..20) {
        let vocab = Arc::new(Vocabulary::build(&texts));
        let sequence = Vectorizer::new(Arc::clone(&vocab), max_len, VectorizeMode::Sequence).unwrap();
        let bag = Vectorizer::new(Arc::clone(&vocab), max_len, VectorizeMode::BagOfWords).unwrap();
        prop_assert_eq!(sequence.encode(&text).len(), max_len);
        prop_assert_eq!(bag.encode(&text).len(), vocab.len());
    }

    #[test]
    fn truncation_keeps_leading_characters(text in arb_text(), max_len in 1usize..20) {
        let vocab = Arc::new(Vocabulary::build([&text]));
        let vectorizer = Vectorizer::new(Arc::clone(&vocab), max_len, VectorizeMode::Sequence).unwrap();
        let ids = vectorizer.ids(&text);
        let chars: Vec<char> = text.chars().collect();
        for (i, &id) in ids.iter().enumerate() {
            match chars.get(i) {
                Some(&ch) => prop_assert_eq!(id, vocab.id(ch)),
                None => prop_assert_eq!(id, PAD_ID),
            }
        }
    }

    #[test]
    fn bag_of_words_ignores_characters_past_max_len(texts in arb_corpus(), text in arb_text(), max_len in 1usize..20) {
        let vocab = Arc::new(Vocabulary::build(&texts));
        let vectorizer = Vectorizer::new(vocab, max_len, VectorizeMode::BagOfWords).unwrap();
        let prefix: String = text.chars().take(max_len).collect();
        prop_assert_eq!(vectorizer.bag_of_words(&text), vectorizer.bag_of_words(&prefix));
    }

    #[test]
    fn bag_of_words_never_counts_padding(texts in arb_corpus(), text in arb_text(), max_len in 1usize..20) {
        let vocab = Arc::new(Vocabulary::build(&texts));
        let vectorizer = Vectorizer::new(Arc::clone(&vocab), max_len, VectorizeMode::BagOfWords).unwrap();
        let counts = vectorizer.bag_of_words(&text);
        prop_assert_eq!(counts[PAD_ID], 0.0);

        let known = text.chars().take(max_len).filter(|&ch| vocab.contains(ch)).count();
        prop_assert_eq!(counts.sum() as usize, known);
    }

    #[test]
    fn batches_cover_every_record_once(n in 1usize..60, batch_size in 1usize..17, seed in any::<u64>()) {
        let texts: Vec<String> = (0..n).map(|i| format!("记录{}", i)).collect();
        let labels = vec![0; n];
        let vocab = Arc::new(Vocabulary::build(&texts));
        let vectorizer = Vectorizer::new(vocab, 6, VectorizeMode::Sequence).unwrap();
        let dataset = LabeledDataset::new(texts, labels, vectorizer).unwrap();

        let mut rng = StdRng::seed_from_u64(seed);
        let batches: Vec<_> = dataset
            .batches(batch_size, BatchOrder::Shuffled(&mut rng))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(batches.len(), n.div_ceil(batch_size));
        let expected_last = if n % batch_size == 0 { batch_size } else { n % batch_size };
        prop_assert_eq!(batches.last().unwrap().len(), expected_last);

        let mut seen: Vec<usize> = batches.iter().flat_map(|b| b.indices.iter().copied()).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }
}

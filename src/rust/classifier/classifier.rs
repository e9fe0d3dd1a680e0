use std::collections::HashMap;
use std::sync::Arc;

use super::builder::ClassifierBuilder;
use super::error::ClassifierError;
use super::{Architecture, ClassifierInfo, TextClassifier};
use crate::inference::Predictor;
use crate::train::TrainingHistory;
use crate::vocab::{LabelIndex, Vocabulary};

/// A classifier trained on a corpus, bundled with everything needed to
/// classify new text.
///
/// # Thread Safety
///
/// `TrainedClassifier` is `Send + Sync`: the vocabulary and label index are
/// behind `Arc`, and every [`TextClassifier`] is `Send + Sync`. Prediction
/// only takes `&self`, so one instance can be shared across threads with
/// `Arc`.
pub struct TrainedClassifier {
    pub(super) architecture: Architecture,
    pub(super) vocab: Arc<Vocabulary>,
    pub(super) labels: Arc<LabelIndex>,
    pub(super) model: Box<dyn TextClassifier>,
    pub(super) predictor: Predictor,
    pub(super) history: TrainingHistory,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    #[allow(dead_code)]
    fn verify_thread_safety() {
        assert_send_sync::<TrainedClassifier>();
    }
};

impl std::fmt::Debug for TrainedClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedClassifier")
            .field("architecture", &self.architecture)
            .field("vocab_size", &self.vocab.len())
            .field("labels", &self.labels.labels())
            .field("final_loss", &self.history.final_loss())
            .finish()
    }
}

impl TrainedClassifier {
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            architecture: self.architecture.clone(),
            input_mode: self.predictor.vectorizer().mode(),
            vocab_size: self.vocab.len(),
            max_len: self.predictor.vectorizer().max_len(),
            num_classes: self.labels.len(),
            class_labels: self.labels.labels().to_vec(),
            num_parameters: self.model.num_parameters(),
        }
    }

    /// Most likely label for `text`. Empty and unseen text is accepted.
    pub fn predict(&self, text: &str) -> Result<String, ClassifierError> {
        self.predictor.predict(self.model.as_ref(), text)
    }

    /// Most likely label plus the raw score of every label.
    pub fn predict_with_scores(&self, text: &str) -> Result<(String, HashMap<String, f32>), ClassifierError> {
        self.predictor.predict_with_scores(self.model.as_ref(), text)
    }

    /// Softmax probability of every label.
    pub fn probabilities(&self, text: &str) -> Result<HashMap<String, f32>, ClassifierError> {
        self.predictor.probabilities(self.model.as_ref(), text)
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn vocab(&self) -> &Arc<Vocabulary> {
        &self.vocab
    }

    pub fn labels(&self) -> &Arc<LabelIndex> {
        &self.labels
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn model(&self) -> &dyn TextClassifier {
        self.model.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::corpus::Corpus;
    use crate::vectorizer::VectorizeMode;

    fn trained(architecture: Architecture) -> TrainedClassifier {
        let corpus = Corpus::from_pairs([
            ("帮我导航到北京", "Navigation"),
            ("导航去公司", "Navigation"),
            ("播放音乐", "Music-Play"),
            ("放一首音乐", "Music-Play"),
        ]);
        TrainedClassifier::builder()
            .with_architecture(architecture)
            .with_max_len(8)
            .with_training_config(TrainingConfig::default().with_epochs(2).with_batch_size(2))
            .with_seed(42)
            .build(&corpus)
            .unwrap()
    }

    #[test]
    fn test_class_info() {
        let classifier = trained(Architecture::feed_forward([16]));
        let info = classifier.info();
        assert_eq!(info.num_classes, 2);
        assert_eq!(info.class_labels, vec!["Music-Play", "Navigation"]);
        assert_eq!(info.max_len, 8);
        assert_eq!(info.input_mode, VectorizeMode::BagOfWords);
        assert_eq!(info.vocab_size, classifier.vocab().len());
        assert_eq!(info.num_parameters, classifier.model().num_parameters());
    }

    #[test]
    fn test_predict_returns_training_label() {
        let classifier = trained(Architecture::gru(8, 8));
        let (label, scores) = classifier.predict_with_scores("播放音乐").unwrap();
        assert!(classifier.labels().index_of(&label).is_some());
        assert_eq!(scores.len(), 2);
        assert_eq!(classifier.predict("播放音乐").unwrap(), label);
    }

    #[test]
    fn test_shared_across_threads() {
        let classifier = Arc::new(trained(Architecture::feed_forward([8])));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let classifier = Arc::clone(&classifier);
                std::thread::spawn(move || classifier.predict("导航").unwrap())
            })
            .collect();
        for handle in handles {
            assert!(classifier.labels().index_of(&handle.join().unwrap()).is_some());
        }
    }
}

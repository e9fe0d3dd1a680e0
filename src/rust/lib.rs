//! Character-level text classification: vocabulary, fixed-length
//! vectorization, a labeled dataset with shuffled batches, trainable
//! feed-forward and GRU classifiers, a fixed-epoch training loop and
//! text-to-label inference.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use charcls::{Architecture, Corpus, TrainedClassifier, TrainingConfig};
//!
//! let corpus = Corpus::from_pairs([
//!     ("帮我导航到北京", "Navigation"),
//!     ("播放音乐", "Music-Play"),
//! ]);
//!
//! let classifier = TrainedClassifier::builder()
//!     .with_architecture(Architecture::feed_forward([32]))
//!     .with_max_len(5)
//!     .with_training_config(TrainingConfig::default().with_epochs(3))
//!     .with_seed(7)
//!     .build(&corpus)?;
//!
//! let (label, scores) = classifier.predict_with_scores("导航到北京")?;
//! println!("Predicted class: {} ({} scores)", label, scores.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Lower-level pieces
//!
//! Every stage is usable on its own: build a [`Vocabulary`] and
//! [`LabelIndex`], wrap them in a [`Vectorizer`] and [`LabeledDataset`],
//! instantiate a [`TextClassifier`] from an [`Architecture`], and drive it
//! with a [`Trainer`] and an [`Optimizer`]. A [`Predictor`] maps raw text
//! back to a label.

pub mod classifier;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod inference;
pub mod loss;
pub mod optim;
pub mod train;
pub mod vectorizer;
pub mod vocab;

pub use classifier::{
    Architecture, ClassifierBuilder, ClassifierError, ClassifierInfo, FeedForwardClassifier, GruClassifier,
    TextClassifier, TrainedClassifier, DEFAULT_MAX_LEN,
};
pub use config::{OptimizerConfig, TrainingConfig};
pub use corpus::{Corpus, Record};
pub use dataset::{Batch, BatchOrder, LabeledDataset, Storage};
pub use inference::Predictor;
pub use loss::cross_entropy;
pub use optim::{Adam, Optimizer, Sgd};
pub use train::{
    compare_architectures, train_architectures, EpochReport, LogObserver, LossComparison, Trainer, TrainingHistory,
    TrainingObserver,
};
pub use vectorizer::{BatchInput, Encoded, VectorizeMode, Vectorizer};
pub use vocab::{LabelIndex, Vocabulary, PAD_ID, PAD_TOKEN};

pub fn init_logger() {
    env_logger::init();
}

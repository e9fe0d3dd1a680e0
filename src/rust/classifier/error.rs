use std::io;

/// Represents the different types of errors that can occur while building,
/// training or querying a text classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The training corpus could not be parsed
    #[error("Corpus error: {0}")]
    CorpusError(String),
    /// Reading the corpus from disk failed
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    /// A dataset record was requested outside `[0, len)`
    #[error("Index {index} out of range for dataset of {len} records")]
    IndexOutOfRange { index: usize, len: usize },
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Error occurred inside a model's forward or backward pass
    #[error("Model error: {0}")]
    ModelError(String),
    /// Tensor shapes did not line up
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    BuildError(String),
    /// Error occurred while running the training loop
    #[error("Training error: {0}")]
    TrainingError(String),
    /// Error occurred while making predictions
    #[error("Prediction error: {0}")]
    PredictionError(String),
}

use ndarray::{Array, Array2, ArrayViewD, ArrayViewMutD, Dimension};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

mod error;
mod embedding;
mod feedforward;
mod layers;
mod recurrent;
pub mod builder;
#[allow(clippy::module_inception)]
mod classifier;
pub(crate) mod utils;

pub use error::ClassifierError;
pub use embedding::Embedding;
pub use feedforward::FeedForwardClassifier;
pub use layers::Linear;
pub use recurrent::{GruClassifier, GruLayer};
pub use builder::{ClassifierBuilder, DEFAULT_MAX_LEN};
pub use classifier::TrainedClassifier;

use crate::vectorizer::{BatchInput, VectorizeMode};

/// Most hidden layers a feed-forward classifier may stack.
pub const MAX_HIDDEN_LAYERS: usize = 3;

/// A learnable tensor and its accumulated gradient.
#[derive(Debug, Clone)]
pub struct Param<D: Dimension> {
    pub value: Array<f32, D>,
    pub grad: Array<f32, D>,
}

impl<D: Dimension> Param<D> {
    pub fn new(value: Array<f32, D>) -> Self {
        let grad = Array::zeros(value.raw_dim());
        Self { value, grad }
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Shape-erased view handed to optimizers.
    pub fn view(&mut self) -> ParamView<'_> {
        ParamView {
            value: self.value.view_mut().into_dyn(),
            grad: self.grad.view().into_dyn(),
        }
    }
}

/// Mutable parameter values paired with read-only gradients.
pub struct ParamView<'a> {
    pub value: ArrayViewMutD<'a, f32>,
    pub grad: ArrayViewD<'a, f32>,
}

/// Capability shared by every trainable text classifier.
///
/// A classifier accepts a batch of vectorized records and returns raw,
/// unnormalized class scores `[batch, num_classes]`. Training goes through
/// `forward_train` (which caches activations), `backward` (which accumulates
/// parameter gradients) and an optimizer acting on `parameters`.
pub trait TextClassifier: Send + Sync {
    /// Vectorization this classifier consumes.
    fn input_mode(&self) -> VectorizeMode;

    fn num_classes(&self) -> usize;

    /// Short human-readable summary, e.g. `feed-forward [128, 32]`.
    fn describe(&self) -> String;

    /// Scores without caching anything for a backward pass.
    fn forward(&self, inputs: &BatchInput) -> Result<Array2<f32>, ClassifierError>;

    /// Scores, caching the activations `backward` needs.
    fn forward_train(&mut self, inputs: &BatchInput) -> Result<Array2<f32>, ClassifierError>;

    /// Back-propagates `grad_scores` through the last `forward_train` call and
    /// adds the result to every parameter gradient.
    ///
    /// # Errors
    /// `ModelError` if no forward pass has been cached.
    fn backward(&mut self, grad_scores: &Array2<f32>) -> Result<(), ClassifierError>;

    fn zero_grad(&mut self);

    /// Every learnable tensor, always in the same order.
    fn parameters(&mut self) -> Vec<ParamView<'_>>;

    fn num_parameters(&self) -> usize;
}

/// Description of a classifier variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Architecture {
    /// Bag-of-words input, 1 to 3 ReLU hidden layers, affine output
    FeedForward { hidden: Vec<usize> },
    /// Id-sequence input, embedding table, single-layer GRU, affine output
    Gru { embedding_dim: usize, hidden_dim: usize },
}

impl Architecture {
    pub fn feed_forward(hidden: impl Into<Vec<usize>>) -> Self {
        Architecture::FeedForward { hidden: hidden.into() }
    }

    pub fn gru(embedding_dim: usize, hidden_dim: usize) -> Self {
        Architecture::Gru { embedding_dim, hidden_dim }
    }

    /// The variants compared when studying depth and width: six feed-forward
    /// shapes and one GRU.
    pub fn comparison_suite() -> Vec<Self> {
        vec![
            Self::feed_forward([32]),
            Self::feed_forward([128]),
            Self::feed_forward([512]),
            Self::feed_forward([128, 32]),
            Self::feed_forward([512, 32]),
            Self::feed_forward([512, 128, 32]),
            Self::gru(64, 128),
        ]
    }

    pub fn input_mode(&self) -> VectorizeMode {
        match self {
            Architecture::FeedForward { .. } => VectorizeMode::BagOfWords,
            Architecture::Gru { .. } => VectorizeMode::Sequence,
        }
    }

    /// # Errors
    /// `ValidationError` for 0 or more than [`MAX_HIDDEN_LAYERS`] hidden
    /// layers, or any zero-sized dimension.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        match self {
            Architecture::FeedForward { hidden } => {
                if hidden.is_empty() || hidden.len() > MAX_HIDDEN_LAYERS {
                    return Err(ClassifierError::ValidationError(format!(
                        "Feed-forward classifier needs 1 to {} hidden layers, got {}",
                        MAX_HIDDEN_LAYERS,
                        hidden.len()
                    )));
                }
                if let Some(pos) = hidden.iter().position(|&w| w == 0) {
                    return Err(ClassifierError::ValidationError(format!(
                        "Hidden layer {} cannot have zero units",
                        pos + 1
                    )));
                }
            }
            Architecture::Gru { embedding_dim, hidden_dim } => {
                if *embedding_dim == 0 || *hidden_dim == 0 {
                    return Err(ClassifierError::ValidationError(
                        "GRU embedding and hidden dimensions must be greater than zero".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Creates a freshly initialized classifier.
    ///
    /// `input_size` is the vocabulary size for both variants: the width of a
    /// bag-of-words vector, or the number of embedding rows.
    pub fn instantiate(
        &self,
        input_size: usize,
        num_classes: usize,
        seed: u64,
    ) -> Result<Box<dyn TextClassifier>, ClassifierError> {
        self.validate()?;
        if input_size == 0 || num_classes == 0 {
            return Err(ClassifierError::ValidationError(
                "Input size and number of classes must be greater than zero".into(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(match self {
            Architecture::FeedForward { hidden } => {
                Box::new(FeedForwardClassifier::new(input_size, hidden, num_classes, &mut rng))
            }
            Architecture::Gru { embedding_dim, hidden_dim } => Box::new(GruClassifier::new(
                input_size,
                *embedding_dim,
                *hidden_dim,
                num_classes,
                &mut rng,
            )),
        })
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::FeedForward { hidden } => write!(f, "feed-forward {:?}", hidden),
            Architecture::Gru { embedding_dim, hidden_dim } => {
                write!(f, "gru (embedding {}, hidden {})", embedding_dim, hidden_dim)
            }
        }
    }
}

/// Information about a trained classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierInfo {
    /// Variant that was trained
    pub architecture: Architecture,
    /// Vectorization used for training and inference
    pub input_mode: VectorizeMode,
    /// Vocabulary size, including the padding sentinel
    pub vocab_size: usize,
    /// Characters kept from each text
    pub max_len: usize,
    /// Number of classes the classifier is trained on
    pub num_classes: usize,
    /// Labels of the classes, in output order
    pub class_labels: Vec<String>,
    /// Total learnable scalars
    pub num_parameters: usize,
}

use std::sync::Arc;

use log::{error, info};

use super::classifier::TrainedClassifier;
use super::error::ClassifierError;
use super::Architecture;
use crate::config::{OptimizerConfig, TrainingConfig};
use crate::corpus::Corpus;
use crate::dataset::{LabeledDataset, Storage};
use crate::inference::Predictor;
use crate::train::{LogObserver, Trainer, TrainingObserver};
use crate::vectorizer::Vectorizer;
use crate::vocab::{LabelIndex, Vocabulary};

/// Characters kept from each text unless configured otherwise.
pub const DEFAULT_MAX_LEN: usize = 40;

/// Fluent configuration for training a classifier on a corpus.
///
/// ```no_run
/// # fn main() -> Result<(), charcls::ClassifierError> {
/// use charcls::{Architecture, Corpus, TrainedClassifier, TrainingConfig};
///
/// let corpus = Corpus::from_path("train.tsv")?;
/// let classifier = TrainedClassifier::builder()
///     .with_architecture(Architecture::gru(64, 128))
///     .with_training_config(TrainingConfig::default().with_epochs(4))
///     .build(&corpus)?;
/// println!("{}", classifier.predict("帮我导航到北京")?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClassifierBuilder {
    architecture: Architecture,
    max_len: usize,
    training: TrainingConfig,
    optimizer: Option<OptimizerConfig>,
    storage: Option<Storage>,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Feed-forward `[128]`, `max_len` 40, default training settings.
    pub fn new() -> Self {
        Self {
            architecture: Architecture::feed_forward([128]),
            max_len: DEFAULT_MAX_LEN,
            training: TrainingConfig::default(),
            optimizer: None,
            storage: None,
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_training_config(mut self, config: TrainingConfig) -> Self {
        self.training = config;
        self
    }

    /// Overrides the architecture's default optimizer (SGD 0.01 for
    /// feed-forward, Adam 0.001 for GRU).
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Seeds both weight initialization and shuffling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.training.seed = Some(seed);
        self
    }

    /// Overrides the storage policy picked from the vectorization mode.
    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn optimizer(&self) -> OptimizerConfig {
        self.optimizer
            .unwrap_or_else(|| OptimizerConfig::default_for(&self.architecture))
    }

    fn validate(&self, corpus: &Corpus) -> Result<(), ClassifierError> {
        if self.max_len == 0 {
            return Err(ClassifierError::ValidationError("max_len must be greater than zero".into()));
        }
        self.architecture.validate()?;
        self.training.validate()?;
        self.optimizer().validate()?;
        if corpus.is_empty() {
            return Err(ClassifierError::BuildError("Corpus must contain at least one record".into()));
        }
        if let Some(pos) = corpus.labels().position(str::is_empty) {
            return Err(ClassifierError::ValidationError(format!(
                "Record {} has an empty label",
                pos + 1
            )));
        }
        Ok(())
    }

    /// Trains a classifier on `corpus`, logging the loss after every pass.
    pub fn build(self, corpus: &Corpus) -> Result<TrainedClassifier, ClassifierError> {
        let mut observer = LogObserver::new(self.architecture.to_string());
        self.build_with_observer(corpus, &mut observer)
    }

    /// Trains a classifier on `corpus`, reporting every pass to `observer`.
    ///
    /// # Errors
    /// - `ValidationError` / `BuildError` for invalid settings or an empty corpus
    /// - `TrainingError` if the loss diverges
    pub fn build_with_observer(
        self,
        corpus: &Corpus,
        observer: &mut dyn TrainingObserver,
    ) -> Result<TrainedClassifier, ClassifierError> {
        self.validate(corpus)?;

        let vocab = Arc::new(Vocabulary::build(corpus.texts()));
        let labels = Arc::new(LabelIndex::build(corpus.labels())?);
        info!(
            "Built vocabulary of {} characters and {} classes from {} records",
            vocab.len(),
            labels.len(),
            corpus.len()
        );

        let vectorizer = Vectorizer::new(Arc::clone(&vocab), self.max_len, self.architecture.input_mode())?;
        let targets = labels.encode(corpus.labels())?;
        let mut dataset = LabeledDataset::new(corpus.texts().map(str::to_owned).collect(), targets, vectorizer.clone())?;
        if let Some(storage) = self.storage {
            dataset = dataset.with_storage(storage);
        }

        let init_seed = self.training.seed.unwrap_or_else(rand::random);
        let mut model = self.architecture.instantiate(vocab.len(), labels.len(), init_seed)?;
        info!(
            "Initialized {} with {} parameters",
            model.describe(),
            model.num_parameters()
        );

        let mut optimizer = self.optimizer().build();
        let history = Trainer::new(self.training.clone())
            .fit(&dataset, model.as_mut(), optimizer.as_mut(), observer)
            .map_err(|e| {
                error!("Training {} failed: {}", self.architecture, e);
                e
            })?;
        if let Some(loss) = history.final_loss() {
            info!("Finished training {}: final loss {:.4}", self.architecture, loss);
        }

        Ok(TrainedClassifier {
            architecture: self.architecture,
            vocab,
            predictor: Predictor::new(vectorizer, Arc::clone(&labels)),
            labels,
            model,
            history,
        })
    }
}

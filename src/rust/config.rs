use serde::{Deserialize, Serialize};

use crate::classifier::{Architecture, ClassifierError};
use crate::optim::{Adam, Optimizer, Sgd};

/// Settings for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Full passes over the dataset
    pub epochs: usize,
    /// Records per optimizer step
    pub batch_size: usize,
    /// Reshuffle record order before every pass
    pub shuffle: bool,
    /// Seed for weight initialization and shuffling; `None` draws from the OS
    pub seed: Option<u64>,
    /// Log the running batch loss every this many batches (0 disables)
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            shuffle: true,
            seed: None,
            log_every: 50,
        }
    }
}

impl TrainingConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    /// Whether the 0-based batch `index` gets a loss line: the first batch of
    /// a pass, then every `log_every`-th one after it.
    pub fn logs_batch(&self, index: usize) -> bool {
        self.log_every > 0 && index % self.log_every == 0
    }

    /// # Errors
    /// `ValidationError` for a zero batch size.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.batch_size == 0 {
            return Err(ClassifierError::ValidationError("Batch size must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Which update rule to train with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OptimizerConfig {
    Sgd { learning_rate: f32, momentum: f32 },
    Adam { learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32 },
}

impl OptimizerConfig {
    /// Plain SGD, no momentum.
    pub fn sgd(learning_rate: f32) -> Self {
        OptimizerConfig::Sgd { learning_rate, momentum: 0.0 }
    }

    /// Adam with `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`.
    pub fn adam(learning_rate: f32) -> Self {
        OptimizerConfig::Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// SGD at 0.01 for feed-forward classifiers, Adam at 0.001 for GRUs.
    pub fn default_for(architecture: &Architecture) -> Self {
        match architecture {
            Architecture::FeedForward { .. } => Self::sgd(0.01),
            Architecture::Gru { .. } => Self::adam(0.001),
        }
    }

    pub fn learning_rate(&self) -> f32 {
        match *self {
            OptimizerConfig::Sgd { learning_rate, .. } | OptimizerConfig::Adam { learning_rate, .. } => learning_rate,
        }
    }

    /// Same rule with a different learning rate.
    pub fn with_learning_rate(self, lr: f32) -> Self {
        match self {
            OptimizerConfig::Sgd { momentum, .. } => OptimizerConfig::Sgd { learning_rate: lr, momentum },
            OptimizerConfig::Adam { beta1, beta2, epsilon, .. } => OptimizerConfig::Adam {
                learning_rate: lr,
                beta1,
                beta2,
                epsilon,
            },
        }
    }

    /// # Errors
    /// `ValidationError` for a non-positive or non-finite learning rate.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let lr = self.learning_rate();
        if !(lr.is_finite() && lr > 0.0) {
            return Err(ClassifierError::ValidationError(format!(
                "Learning rate must be a positive number, got {}",
                lr
            )));
        }
        Ok(())
    }

    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerConfig::Sgd { learning_rate, momentum } => Box::new(Sgd::with_momentum(learning_rate, momentum)),
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                Box::new(Adam::with_betas(learning_rate, beta1, beta2, epsilon))
            }
        }
    }
}

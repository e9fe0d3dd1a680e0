//! Fixed-epoch training loop and loss reporting.

use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::classifier::{Architecture, ClassifierBuilder, ClassifierError, TextClassifier, TrainedClassifier};
use crate::config::{OptimizerConfig, TrainingConfig};
use crate::corpus::Corpus;
use crate::dataset::{BatchOrder, LabeledDataset};
use crate::loss::cross_entropy;
use crate::optim::Optimizer;

/// Loss summary of one completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochReport {
    /// 1-based pass number
    pub epoch: usize,
    /// Total passes in the run
    pub epochs: usize,
    /// Mean of the per-batch mean losses
    pub mean_loss: f32,
}

/// Receives a report after every pass.
pub trait TrainingObserver {
    fn on_epoch_end(&mut self, report: &EpochReport);
}

impl TrainingObserver for () {
    fn on_epoch_end(&mut self, _report: &EpochReport) {}
}

impl<F: FnMut(&EpochReport)> TrainingObserver for F {
    fn on_epoch_end(&mut self, report: &EpochReport) {
        self(report)
    }
}

/// Logs every pass at `info` level.
#[derive(Debug, Clone)]
pub struct LogObserver {
    label: String,
}

impl LogObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl TrainingObserver for LogObserver {
    fn on_epoch_end(&mut self, report: &EpochReport) {
        info!(
            "[{}] epoch {}/{}: loss {:.4}",
            self.label, report.epoch, report.epochs, report.mean_loss
        );
    }
}

/// Per-pass mean losses of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    /// Description of the trained classifier
    pub label: String,
    /// Trainable scalars in the classifier
    pub num_parameters: usize,
    pub losses: Vec<f32>,
}

impl TrainingHistory {
    pub fn new(label: impl Into<String>, num_parameters: usize) -> Self {
        Self {
            label: label.into(),
            num_parameters,
            losses: Vec::new(),
        }
    }

    pub fn epochs(&self) -> usize {
        self.losses.len()
    }

    pub fn final_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }
}

/// Runs mini-batch gradient descent for a fixed number of passes.
///
/// Every batch goes through `zero_grad`, `forward_train`, cross-entropy,
/// `backward` and one optimizer step. There is no validation split and no
/// early stopping.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains `model` in place and returns its loss history.
    ///
    /// # Errors
    /// - `ValidationError` if the dataset is empty, the batch size is zero or
    ///   the dataset's vectorization does not match the classifier's input
    /// - `TrainingError` if a batch loss is not finite
    /// - anything the classifier or optimizer reports
    pub fn fit(
        &self,
        dataset: &LabeledDataset,
        model: &mut dyn TextClassifier,
        optimizer: &mut dyn Optimizer,
        observer: &mut dyn TrainingObserver,
    ) -> Result<TrainingHistory, ClassifierError> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(ClassifierError::ValidationError("Cannot train on an empty dataset".into()));
        }
        let mode = dataset.vectorizer().mode();
        if mode != model.input_mode() {
            return Err(ClassifierError::ValidationError(format!(
                "Dataset is vectorized as {:?} but {} expects {:?}",
                mode,
                model.describe(),
                model.input_mode()
            )));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut history = TrainingHistory::new(model.describe(), model.num_parameters());
        let num_batches = dataset.num_batches(self.config.batch_size);
        info!(
            "Training {} on {} records, {} batches per epoch, lr {}",
            model.describe(),
            dataset.len(),
            num_batches,
            optimizer.learning_rate()
        );

        for epoch in 1..=self.config.epochs {
            let order = if self.config.shuffle {
                BatchOrder::Shuffled(&mut rng)
            } else {
                BatchOrder::Sequential
            };

            let mut total = 0.0f32;
            let mut seen = 0usize;
            for (i, batch) in dataset.batches(self.config.batch_size, order)?.enumerate() {
                let batch = batch?;
                model.zero_grad();
                let scores = model.forward_train(&batch.inputs)?;
                let (loss, grad) = cross_entropy(&scores, &batch.labels)?;
                if !loss.is_finite() {
                    return Err(ClassifierError::TrainingError(format!(
                        "Loss diverged to {} at epoch {}, batch {}",
                        loss,
                        epoch,
                        i + 1
                    )));
                }
                model.backward(&grad)?;
                optimizer.step(&mut model.parameters())?;

                total += loss;
                seen += 1;
                if self.config.logs_batch(i) {
                    debug!("epoch {} batch {}/{}: loss {:.4}", epoch, i + 1, num_batches, loss);
                }
            }

            let report = EpochReport {
                epoch,
                epochs: self.config.epochs,
                mean_loss: total / seen as f32,
            };
            history.losses.push(report.mean_loss);
            observer.on_epoch_end(&report);
        }

        Ok(history)
    }
}

/// Loss histories of several classifiers trained on the same corpus.
#[derive(Debug, Clone, Serialize)]
pub struct LossComparison {
    pub max_len: usize,
    pub training: TrainingConfig,
    pub runs: Vec<TrainingHistory>,
}

impl LossComparison {
    /// Collects the histories of classifiers trained with the same settings.
    pub fn from_classifiers(max_len: usize, training: &TrainingConfig, classifiers: &[TrainedClassifier]) -> Self {
        Self {
            max_len,
            training: training.clone(),
            runs: classifiers.iter().map(|c| c.history().clone()).collect(),
        }
    }

    /// Run with the lowest final loss.
    pub fn best(&self) -> Option<&TrainingHistory> {
        self.runs
            .iter()
            .filter_map(|run| run.final_loss().map(|loss| (run, loss)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(run, _)| run)
    }
}

impl fmt::Display for LossComparison {
    /// One row per classifier: parameter count, then one column per epoch.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.runs.iter().map(|r| r.label.chars().count()).max().unwrap_or(0).max(10);
        let epochs = self.runs.iter().map(TrainingHistory::epochs).max().unwrap_or(0);

        write!(f, "{:<width$} {:>10}", "classifier", "params", width = width)?;
        for epoch in 1..=epochs {
            write!(f, " {:>8}", format!("ep{}", epoch))?;
        }
        writeln!(f)?;
        for run in &self.runs {
            write!(f, "{:<width$} {:>10}", run.label, run.num_parameters, width = width)?;
            for loss in &run.losses {
                write!(f, " {:>8.4}", loss)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Trains every architecture on `corpus` with identical data settings and
/// keeps the trained classifiers, in `architectures` order.
///
/// Each run uses its architecture's default optimizer unless `optimizer` is
/// given.
pub fn train_architectures(
    corpus: &Corpus,
    architectures: &[Architecture],
    max_len: usize,
    training: &TrainingConfig,
    optimizer: Option<OptimizerConfig>,
) -> Result<Vec<TrainedClassifier>, ClassifierError> {
    let mut classifiers = Vec::with_capacity(architectures.len());
    for architecture in architectures {
        let mut builder = ClassifierBuilder::new()
            .with_architecture(architecture.clone())
            .with_max_len(max_len)
            .with_training_config(training.clone());
        if let Some(optimizer) = optimizer {
            builder = builder.with_optimizer(optimizer);
        }
        classifiers.push(builder.build(corpus)?);
    }
    Ok(classifiers)
}

/// Like [`train_architectures`], keeping only the loss histories.
pub fn compare_architectures(
    corpus: &Corpus,
    architectures: &[Architecture],
    max_len: usize,
    training: &TrainingConfig,
    optimizer: Option<OptimizerConfig>,
) -> Result<LossComparison, ClassifierError> {
    let classifiers = train_architectures(corpus, architectures, max_len, training, optimizer)?;
    Ok(LossComparison::from_classifiers(max_len, training, &classifiers))
}

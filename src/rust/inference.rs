//! Mapping raw text to a label with a trained classifier.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{Array1, Axis};

use crate::classifier::utils::{argmax, softmax};
use crate::classifier::{ClassifierError, TextClassifier};
use crate::vectorizer::{BatchInput, Vectorizer};
use crate::vocab::LabelIndex;

/// Vectorizes text exactly as during training and decodes classifier scores.
///
/// The predictor does not check that the classifier was trained with the same
/// vocabulary and `max_len`; pairing it with a different classifier silently
/// produces meaningless labels.
#[derive(Debug, Clone)]
pub struct Predictor {
    vectorizer: Vectorizer,
    labels: Arc<LabelIndex>,
}

impl Predictor {
    pub fn new(vectorizer: Vectorizer, labels: Arc<LabelIndex>) -> Self {
        Self { vectorizer, labels }
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    /// Raw class scores for one text, in label-index order.
    pub fn raw_scores(&self, model: &dyn TextClassifier, text: &str) -> Result<Array1<f32>, ClassifierError> {
        if model.input_mode() != self.vectorizer.mode() {
            return Err(ClassifierError::ValidationError(format!(
                "{} expects {:?} input but the predictor produces {:?}",
                model.describe(),
                model.input_mode(),
                self.vectorizer.mode()
            )));
        }
        let inputs = BatchInput::from(self.vectorizer.encode(text));
        let scores = model.forward(&inputs)?;
        Ok(scores.index_axis_move(Axis(0), 0))
    }

    /// Label with the highest score. On ties the earliest label wins.
    ///
    /// # Errors
    /// `PredictionError` if the winning position has no label.
    pub fn predict(&self, model: &dyn TextClassifier, text: &str) -> Result<String, ClassifierError> {
        let scores = self.raw_scores(model, text)?;
        self.decode(&scores)
    }

    /// Raw score per label.
    pub fn scores(&self, model: &dyn TextClassifier, text: &str) -> Result<HashMap<String, f32>, ClassifierError> {
        let scores = self.raw_scores(model, text)?;
        Ok(self.by_label(&scores))
    }

    /// Softmax-normalized score per label.
    pub fn probabilities(
        &self,
        model: &dyn TextClassifier,
        text: &str,
    ) -> Result<HashMap<String, f32>, ClassifierError> {
        let scores = self.raw_scores(model, text)?;
        Ok(self.by_label(&softmax(scores.view())))
    }

    /// Winning label together with every raw score.
    pub fn predict_with_scores(
        &self,
        model: &dyn TextClassifier,
        text: &str,
    ) -> Result<(String, HashMap<String, f32>), ClassifierError> {
        let scores = self.raw_scores(model, text)?;
        Ok((self.decode(&scores)?, self.by_label(&scores)))
    }

    fn decode(&self, scores: &Array1<f32>) -> Result<String, ClassifierError> {
        let best = argmax(scores.view())
            .ok_or_else(|| ClassifierError::PredictionError("Classifier returned no usable scores".into()))?;
        self.labels.label(best).map(str::to_owned).ok_or_else(|| {
            ClassifierError::PredictionError(format!(
                "Class position {} has no label ({} labels known)",
                best,
                self.labels.len()
            ))
        })
    }

    fn by_label(&self, scores: &Array1<f32>) -> HashMap<String, f32> {
        self.labels
            .labels()
            .iter()
            .zip(scores.iter())
            .map(|(label, &score)| (label.clone(), score))
            .collect()
    }
}

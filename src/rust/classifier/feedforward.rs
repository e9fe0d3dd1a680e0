//! Bag-of-words feed-forward classifier.
//!
//! ```text
//! counts [batch, vocab] -> (Linear -> ReLU) x 1..=3 -> Linear -> scores [batch, classes]
//! ```

use ndarray::Array2;
use rand::Rng;

use super::error::ClassifierError;
use super::layers::{relu, relu_backward, Linear};
use super::{ParamView, TextClassifier};
use crate::vectorizer::{BatchInput, VectorizeMode};

/// Activations kept from `forward_train` for the backward pass.
#[derive(Debug, Clone)]
struct ForwardCache {
    /// Input of every layer, hidden and output
    inputs: Vec<Array2<f32>>,
    /// Pre-activation of every hidden layer
    pre_activations: Vec<Array2<f32>>,
}

/// Multi-layer perceptron over bag-of-words count vectors.
#[derive(Debug, Clone)]
pub struct FeedForwardClassifier {
    hidden: Vec<Linear>,
    output: Linear,
    cache: Option<ForwardCache>,
}

impl FeedForwardClassifier {
    pub fn new<R: Rng + ?Sized>(input_dim: usize, hidden_sizes: &[usize], num_classes: usize, rng: &mut R) -> Self {
        let mut hidden = Vec::with_capacity(hidden_sizes.len());
        let mut width = input_dim;
        for &size in hidden_sizes {
            hidden.push(Linear::new(width, size, rng));
            width = size;
        }
        Self {
            hidden,
            output: Linear::new(width, num_classes, rng),
            cache: None,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.hidden
            .first()
            .map_or_else(|| self.output.in_features(), Linear::in_features)
    }

    pub fn hidden_sizes(&self) -> Vec<usize> {
        self.hidden.iter().map(Linear::out_features).collect()
    }

    fn counts<'a>(&self, inputs: &'a BatchInput) -> Result<&'a Array2<f32>, ClassifierError> {
        match inputs {
            BatchInput::Counts(counts) if counts.ncols() == self.input_dim() => Ok(counts),
            BatchInput::Counts(counts) => Err(ClassifierError::ValidationError(format!(
                "Expected bag-of-words vectors of width {}, got {}",
                self.input_dim(),
                counts.ncols()
            ))),
            BatchInput::Ids(_) => Err(ClassifierError::ValidationError(
                "Feed-forward classifier expects bag-of-words input".into(),
            )),
        }
    }
}

impl TextClassifier for FeedForwardClassifier {
    fn input_mode(&self) -> VectorizeMode {
        VectorizeMode::BagOfWords
    }

    fn num_classes(&self) -> usize {
        self.output.out_features()
    }

    fn describe(&self) -> String {
        format!("feed-forward {:?}", self.hidden_sizes())
    }

    fn forward(&self, inputs: &BatchInput) -> Result<Array2<f32>, ClassifierError> {
        let mut x = self.counts(inputs)?.clone();
        for layer in &self.hidden {
            x = relu(&layer.forward(&x));
        }
        Ok(self.output.forward(&x))
    }

    fn forward_train(&mut self, inputs: &BatchInput) -> Result<Array2<f32>, ClassifierError> {
        let mut x = self.counts(inputs)?.clone();
        let mut layer_inputs = Vec::with_capacity(self.hidden.len() + 1);
        let mut pre_activations = Vec::with_capacity(self.hidden.len());
        for layer in &self.hidden {
            let z = layer.forward(&x);
            layer_inputs.push(x);
            x = relu(&z);
            pre_activations.push(z);
        }
        let scores = self.output.forward(&x);
        layer_inputs.push(x);
        self.cache = Some(ForwardCache {
            inputs: layer_inputs,
            pre_activations,
        });
        Ok(scores)
    }

    fn backward(&mut self, grad_scores: &Array2<f32>) -> Result<(), ClassifierError> {
        let cache = self
            .cache
            .take()
            .ok_or_else(|| ClassifierError::ModelError("backward called before forward_train".into()))?;

        let last_input = cache
            .inputs
            .last()
            .ok_or_else(|| ClassifierError::ModelError("Empty forward cache".into()))?;
        let mut grad = self.output.backward(last_input, grad_scores);
        for (i, layer) in self.hidden.iter_mut().enumerate().rev() {
            let grad_z = relu_backward(&cache.pre_activations[i], &grad);
            grad = layer.backward(&cache.inputs[i], &grad_z);
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        for layer in &mut self.hidden {
            layer.zero_grad();
        }
        self.output.zero_grad();
    }

    fn parameters(&mut self) -> Vec<ParamView<'_>> {
        let mut params: Vec<ParamView<'_>> = self.hidden.iter_mut().flat_map(Linear::parameters).collect();
        params.extend(self.output.parameters());
        params
    }

    fn num_parameters(&self) -> usize {
        self.hidden.iter().map(Linear::num_parameters).sum::<usize>() + self.output.num_parameters()
    }
}

//! Embedding + GRU sequence classifier.
//!
//! Gate equations for one time step, with `x` the embedded token and `h` the
//! previous hidden state (zero at t = 0):
//!
//! ```text
//! r  = sigmoid(x W_ir + b_ir + h W_hr + b_hr)
//! z  = sigmoid(x W_iz + b_iz + h W_hz + b_hz)
//! n  = tanh(x W_in + b_in + r * (h W_hn + b_hn))
//! h' = (1 - z) * n + z * h
//! ```
//!
//! The three gates share one `[in, 3H]` input matrix and one `[H, 3H]` hidden
//! matrix, column blocks ordered r, z, n. The final hidden state after the
//! last position feeds an affine output layer.

use ndarray::{concatenate, s, Array2, Array3, Axis, Ix1, Ix2};
use rand::Rng;

use super::embedding::{time_step, Embedding};
use super::error::ClassifierError;
use super::layers::{uniform_init, Linear};
use super::utils::sigmoid;
use super::{Param, ParamView, TextClassifier};
use crate::vectorizer::{BatchInput, VectorizeMode};

/// Values from one time step needed to back-propagate through it.
#[derive(Debug, Clone)]
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    r: Array2<f32>,
    z: Array2<f32>,
    n: Array2<f32>,
    gh_n: Array2<f32>,
}

/// Single-layer gated recurrent unit.
#[derive(Debug, Clone)]
pub struct GruLayer {
    pub weight_ih: Param<Ix2>,
    pub weight_hh: Param<Ix2>,
    pub bias_ih: Param<Ix1>,
    pub bias_hh: Param<Ix1>,
}

impl GruLayer {
    /// All weights drawn from `U(-1/sqrt(H), 1/sqrt(H))`.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, hidden_dim: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden_dim.max(1) as f32).sqrt();
        let gates = 3 * hidden_dim;
        Self {
            weight_ih: Param::new(uniform_init(rng, (input_dim, gates), bound)),
            weight_hh: Param::new(uniform_init(rng, (hidden_dim, gates), bound)),
            bias_ih: Param::new(uniform_init(rng, (1, gates), bound).remove_axis(Axis(0))),
            bias_hh: Param::new(uniform_init(rng, (1, gates), bound).remove_axis(Axis(0))),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weight_ih.value.nrows()
    }

    pub fn hidden_dim(&self) -> usize {
        self.weight_hh.value.nrows()
    }

    fn step(&self, x: Array2<f32>, h_prev: &Array2<f32>) -> (Array2<f32>, StepCache) {
        let hs = self.hidden_dim();
        let gi = x.dot(&self.weight_ih.value) + &self.bias_ih.value;
        let gh = h_prev.dot(&self.weight_hh.value) + &self.bias_hh.value;

        let r = (&gi.slice(s![.., ..hs]) + &gh.slice(s![.., ..hs])).mapv(sigmoid);
        let z = (&gi.slice(s![.., hs..2 * hs]) + &gh.slice(s![.., hs..2 * hs])).mapv(sigmoid);
        let gh_n = gh.slice(s![.., 2 * hs..]).to_owned();
        let n = (&gi.slice(s![.., 2 * hs..]) + &(&r * &gh_n)).mapv(f32::tanh);
        let h = &n + &(&z * &(h_prev - &n));

        let cache = StepCache {
            x,
            h_prev: h_prev.clone(),
            r,
            z,
            n,
            gh_n,
        };
        (h, cache)
    }

    fn run(&self, x: &Array3<f32>, keep: bool) -> (Array2<f32>, Vec<StepCache>) {
        let (batch, seq_len, _) = x.dim();
        let mut h = Array2::zeros((batch, self.hidden_dim()));
        let mut caches = Vec::with_capacity(if keep { seq_len } else { 0 });
        for t in 0..seq_len {
            let (next, cache) = self.step(time_step(x, t), &h);
            if keep {
                caches.push(cache);
            }
            h = next;
        }
        (h, caches)
    }

    /// Final hidden state `[batch, H]` for `x` `[batch, seq_len, in]`.
    pub fn forward(&self, x: &Array3<f32>) -> Array2<f32> {
        self.run(x, false).0
    }

    /// Back-propagation through time from the gradient of the final hidden
    /// state. Returns the gradient w.r.t. the input sequence.
    fn backward(&mut self, caches: &[StepCache], grad_h: Array2<f32>) -> Result<Array3<f32>, ClassifierError> {
        let batch = grad_h.nrows();
        let mut grad_x = Array3::zeros((batch, caches.len(), self.input_dim()));
        let mut dh = grad_h;

        for (t, c) in caches.iter().enumerate().rev() {
            let dn = &dh * &c.z.mapv(|v| 1.0 - v);
            let dz = &dh * &(&c.h_prev - &c.n);
            let mut dh_prev = &dh * &c.z;

            let da_n = &dn * &c.n.mapv(|v| 1.0 - v * v);
            let dgh_n = &da_n * &c.r;
            let da_r = &(&da_n * &c.gh_n) * &c.r.mapv(|v| v * (1.0 - v));
            let da_z = &dz * &c.z.mapv(|v| v * (1.0 - v));

            let dgi = concatenate(Axis(1), &[da_r.view(), da_z.view(), da_n.view()])?;
            let dgh = concatenate(Axis(1), &[da_r.view(), da_z.view(), dgh_n.view()])?;

            self.weight_ih.grad += &c.x.t().dot(&dgi);
            self.bias_ih.grad += &dgi.sum_axis(Axis(0));
            self.weight_hh.grad += &c.h_prev.t().dot(&dgh);
            self.bias_hh.grad += &dgh.sum_axis(Axis(0));

            grad_x
                .index_axis_mut(Axis(1), t)
                .assign(&dgi.dot(&self.weight_ih.value.t()));
            dh_prev += &dgh.dot(&self.weight_hh.value.t());
            dh = dh_prev;
        }
        Ok(grad_x)
    }

    fn zero_grad(&mut self) {
        self.weight_ih.zero_grad();
        self.weight_hh.zero_grad();
        self.bias_ih.zero_grad();
        self.bias_hh.zero_grad();
    }

    fn parameters(&mut self) -> Vec<ParamView<'_>> {
        vec![
            self.weight_ih.view(),
            self.weight_hh.view(),
            self.bias_ih.view(),
            self.bias_hh.view(),
        ]
    }

    fn num_parameters(&self) -> usize {
        self.weight_ih.value.len() + self.weight_hh.value.len() + self.bias_ih.value.len() + self.bias_hh.value.len()
    }
}

#[derive(Debug, Clone)]
struct SequenceCache {
    ids: Array2<usize>,
    steps: Vec<StepCache>,
    final_hidden: Array2<f32>,
}

/// Classifier over character id sequences: embedding, GRU, affine output.
#[derive(Debug, Clone)]
pub struct GruClassifier {
    embedding: Embedding,
    gru: GruLayer,
    output: Linear,
    cache: Option<SequenceCache>,
}

impl GruClassifier {
    pub fn new<R: Rng + ?Sized>(
        vocab_size: usize,
        embedding_dim: usize,
        hidden_dim: usize,
        num_classes: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            embedding: Embedding::new(vocab_size, embedding_dim, rng),
            gru: GruLayer::new(embedding_dim, hidden_dim, rng),
            output: Linear::new(hidden_dim, num_classes, rng),
            cache: None,
        }
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn gru(&self) -> &GruLayer {
        &self.gru
    }

    fn ids<'a>(inputs: &'a BatchInput) -> Result<&'a Array2<usize>, ClassifierError> {
        match inputs {
            BatchInput::Ids(ids) => Ok(ids),
            BatchInput::Counts(_) => Err(ClassifierError::ValidationError(
                "GRU classifier expects id sequence input".into(),
            )),
        }
    }
}

impl TextClassifier for GruClassifier {
    fn input_mode(&self) -> VectorizeMode {
        VectorizeMode::Sequence
    }

    fn num_classes(&self) -> usize {
        self.output.out_features()
    }

    fn describe(&self) -> String {
        format!(
            "gru (embedding {}, hidden {})",
            self.embedding.dim(),
            self.gru.hidden_dim()
        )
    }

    fn forward(&self, inputs: &BatchInput) -> Result<Array2<f32>, ClassifierError> {
        let embedded = self.embedding.forward(Self::ids(inputs)?.view())?;
        let hidden = self.gru.forward(&embedded);
        Ok(self.output.forward(&hidden))
    }

    fn forward_train(&mut self, inputs: &BatchInput) -> Result<Array2<f32>, ClassifierError> {
        let ids = Self::ids(inputs)?;
        let embedded = self.embedding.forward(ids.view())?;
        let (final_hidden, steps) = self.gru.run(&embedded, true);
        let scores = self.output.forward(&final_hidden);
        self.cache = Some(SequenceCache {
            ids: ids.clone(),
            steps,
            final_hidden,
        });
        Ok(scores)
    }

    fn backward(&mut self, grad_scores: &Array2<f32>) -> Result<(), ClassifierError> {
        let cache = self
            .cache
            .take()
            .ok_or_else(|| ClassifierError::ModelError("backward called before forward_train".into()))?;
        let grad_h = self.output.backward(&cache.final_hidden, grad_scores);
        let grad_x = self.gru.backward(&cache.steps, grad_h)?;
        self.embedding.backward(cache.ids.view(), &grad_x);
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.embedding.zero_grad();
        self.gru.zero_grad();
        self.output.zero_grad();
    }

    fn parameters(&mut self) -> Vec<ParamView<'_>> {
        let mut params = self.embedding.parameters();
        params.extend(self.gru.parameters());
        params.extend(self.output.parameters());
        params
    }

    fn num_parameters(&self) -> usize {
        self.embedding.table.value.len() + self.gru.num_parameters() + self.output.num_parameters()
    }
}

//! Affine layer and activations.
//!
//! ```text
//! Forward:  y = x @ W + b           x [batch, in], W [in, out], b [out]
//! Backward: grad_W += x^T @ grad_y
//!           grad_b += sum(grad_y, axis=0)
//!           grad_x  = grad_y @ W^T
//! ```

use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use super::{Param, ParamView};

/// Uniform samples in `[-bound, bound)`.
pub(crate) fn uniform_init<R: Rng + ?Sized>(rng: &mut R, shape: (usize, usize), bound: f32) -> Array2<f32> {
    Array2::from_shape_simple_fn(shape, || rng.gen_range(-bound..bound))
}

/// Fully connected layer.
#[derive(Debug, Clone)]
pub struct Linear {
    pub weight: Param<ndarray::Ix2>,
    pub bias: Param<ndarray::Ix1>,
}

impl Linear {
    /// Weights and biases drawn from `U(-1/sqrt(in), 1/sqrt(in))`.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = uniform_init(rng, (in_features, out_features), bound);
        let bias = Array1::from_shape_simple_fn(out_features, || rng.gen_range(-bound..bound));
        Self {
            weight: Param::new(weight),
            bias: Param::new(bias),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.value.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.value.ncols()
    }

    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight.value) + &self.bias.value
    }

    /// Accumulates parameter gradients and returns the gradient w.r.t. `x`.
    pub fn backward(&mut self, x: &Array2<f32>, grad_out: &Array2<f32>) -> Array2<f32> {
        self.weight.grad += &x.t().dot(grad_out);
        self.bias.grad += &grad_out.sum_axis(Axis(0));
        grad_out.dot(&self.weight.value.t())
    }

    pub fn zero_grad(&mut self) {
        self.weight.zero_grad();
        self.bias.zero_grad();
    }

    pub fn parameters(&mut self) -> Vec<ParamView<'_>> {
        vec![self.weight.view(), self.bias.view()]
    }

    pub fn num_parameters(&self) -> usize {
        self.weight.value.len() + self.bias.value.len()
    }
}

pub(crate) fn relu(x: &Array2<f32>) -> Array2<f32> {
    x.mapv(|v| v.max(0.0))
}

/// Passes the gradient through where the pre-activation was positive.
pub(crate) fn relu_backward(pre_activation: &Array2<f32>, grad_out: &Array2<f32>) -> Array2<f32> {
    let mut grad = grad_out.clone();
    grad.zip_mut_with(pre_activation, |g, &z| {
        if z <= 0.0 {
            *g = 0.0;
        }
    });
    grad
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_forward_shape_and_bias() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = Linear::new(3, 2, &mut rng);
        layer.weight.value.fill(0.0);
        layer.bias.value = array![1.0, -1.0];
        let y = layer.forward(&array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]);
        assert_eq!(y, array![[1.0, -1.0], [1.0, -1.0]]);
    }

    #[test]
    fn test_backward_gradients() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut layer = Linear::new(2, 1, &mut rng);
        layer.weight.value = array![[2.0], [3.0]];
        let x = array![[1.0, 4.0]];
        let grad_x = layer.backward(&x, &array![[1.0]]);
        assert_eq!(layer.weight.grad, array![[1.0], [4.0]]);
        assert_eq!(layer.bias.grad, array![1.0]);
        assert_eq!(grad_x, array![[2.0, 3.0]]);

        // gradients accumulate until zeroed
        layer.backward(&x, &array![[1.0]]);
        assert_abs_diff_eq!(layer.weight.grad[[1, 0]], 8.0);
        layer.zero_grad();
        assert_eq!(layer.bias.grad, array![0.0]);
    }

    #[test]
    fn test_relu_backward_masks() {
        let z = array![[-1.0, 0.5], [2.0, 0.0]];
        assert_eq!(relu(&z), array![[0.0, 0.5], [2.0, 0.0]]);
        let g = relu_backward(&z, &array![[1.0, 1.0], [1.0, 1.0]]);
        assert_eq!(g, array![[0.0, 1.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_init_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Linear::new(16, 8, &mut rng);
        assert!(layer.weight.value.iter().all(|w| w.abs() <= 0.25));
        assert_eq!(layer.num_parameters(), 16 * 8 + 8);
    }
}

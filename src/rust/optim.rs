//! Gradient-descent optimizers.
//!
//! Optimizers receive a classifier's parameters as an ordered slice of
//! [`ParamView`]s. Stateful optimizers keep one state tensor per position,
//! so the same classifier must be passed on every step.
//!
//! ```text
//! SGD:   v = momentum * v - lr * g;  theta += v        (momentum = 0: theta -= lr * g)
//! Adam:  m = b1 * m + (1 - b1) * g
//!        v = b2 * v + (1 - b2) * g^2
//!        theta -= lr * (m / (1 - b1^t)) / (sqrt(v / (1 - b2^t)) + eps)
//! ```

use ndarray::{ArrayD, Zip};

use crate::classifier::{ClassifierError, ParamView};

/// An update rule bound to one classifier's parameter list.
pub trait Optimizer {
    /// Applies one update using the gradients currently stored in `params`.
    ///
    /// # Errors
    /// `TrainingError` if the parameter list does not match the one seen on
    /// earlier steps.
    fn step(&mut self, params: &mut [ParamView<'_>]) -> Result<(), ClassifierError>;

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, lr: f32);
}

/// Lazily allocates per-parameter state and checks it still lines up.
fn ensure_state(
    state: &mut Vec<ArrayD<f32>>,
    params: &[ParamView<'_>],
) -> Result<(), ClassifierError> {
    if state.is_empty() {
        *state = params.iter().map(|p| ArrayD::zeros(p.value.raw_dim())).collect();
        return Ok(());
    }
    let matches = state.len() == params.len()
        && state.iter().zip(params).all(|(s, p)| s.shape() == p.value.shape());
    if matches {
        Ok(())
    } else {
        Err(ClassifierError::TrainingError(
            "Optimizer state does not match the parameter list".into(),
        ))
    }
}

/// Stochastic gradient descent with optional momentum.
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f32,
    momentum: f32,
    velocities: Vec<ArrayD<f32>>,
}

impl Sgd {
    pub fn new(lr: f32) -> Self {
        Self::with_momentum(lr, 0.0)
    }

    pub fn with_momentum(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [ParamView<'_>]) -> Result<(), ClassifierError> {
        let lr = self.lr;
        if self.momentum == 0.0 {
            for p in params.iter_mut() {
                p.value.scaled_add(-lr, &p.grad);
            }
            return Ok(());
        }

        ensure_state(&mut self.velocities, params)?;
        let momentum = self.momentum;
        for (p, v) in params.iter_mut().zip(self.velocities.iter_mut()) {
            Zip::from(&mut p.value).and(v).and(&p.grad).for_each(|theta, v, &g| {
                *v = momentum * *v - lr * g;
                *theta += *v;
            });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.lr = lr;
    }
}

/// Adam with bias correction.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
}

impl Adam {
    /// Adam with the usual defaults: `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`.
    pub fn new(lr: f32) -> Self {
        Self::with_betas(lr, 0.9, 0.999, 1e-8)
    }

    pub fn with_betas(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            step: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.step
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [ParamView<'_>]) -> Result<(), ClassifierError> {
        ensure_state(&mut self.m, params)?;
        ensure_state(&mut self.v, params)?;
        self.step += 1;

        let (lr, beta1, beta2, eps) = (self.lr, self.beta1, self.beta2, self.epsilon);
        let bias1 = 1.0 - beta1.powi(self.step);
        let bias2 = 1.0 - beta2.powi(self.step);

        for ((p, m), v) in params.iter_mut().zip(self.m.iter_mut()).zip(self.v.iter_mut()) {
            Zip::from(&mut p.value)
                .and(m)
                .and(v)
                .and(&p.grad)
                .for_each(|theta, m, v, &g| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *theta -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.lr = lr;
    }
}

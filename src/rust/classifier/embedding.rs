use ndarray::{Array2, Array3, ArrayView2, Axis, Ix2};
use rand::Rng;

use super::error::ClassifierError;
use super::layers::uniform_init;
use super::{Param, ParamView};

/// Learned lookup table mapping vocabulary ids to dense vectors.
///
/// Every id owns one row of the `[vocab_size, dim]` table. The padding id is
/// an ordinary row and is trained like any other.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub table: Param<Ix2>,
}

impl Embedding {
    /// Rows drawn from `U(-1, 1)`.
    pub fn new<R: Rng + ?Sized>(vocab_size: usize, dim: usize, rng: &mut R) -> Self {
        Self {
            table: Param::new(uniform_init(rng, (vocab_size, dim), 1.0)),
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.table.value.nrows()
    }

    pub fn dim(&self) -> usize {
        self.table.value.ncols()
    }

    /// Looks up `ids` `[batch, seq_len]`, returning `[batch, seq_len, dim]`.
    ///
    /// # Errors
    /// `ValidationError` if an id falls outside the table.
    pub fn forward(&self, ids: ArrayView2<usize>) -> Result<Array3<f32>, ClassifierError> {
        let vocab_size = self.vocab_size();
        if let Some(&bad) = ids.iter().find(|&&id| id >= vocab_size) {
            return Err(ClassifierError::ValidationError(format!(
                "Token id {} outside embedding table of {} rows",
                bad, vocab_size
            )));
        }
        let (batch, seq_len) = ids.dim();
        let mut out = Array3::zeros((batch, seq_len, self.dim()));
        for ((b, t), &id) in ids.indexed_iter() {
            out.slice_mut(ndarray::s![b, t, ..]).assign(&self.table.value.row(id));
        }
        Ok(out)
    }

    /// Scatters `grad` `[batch, seq_len, dim]` back onto the rows that were looked up.
    pub fn backward(&mut self, ids: ArrayView2<usize>, grad: &Array3<f32>) {
        for ((b, t), &id) in ids.indexed_iter() {
            let mut row = self.table.grad.row_mut(id);
            row += &grad.index_axis(Axis(0), b).row(t);
        }
    }

    pub fn zero_grad(&mut self) {
        self.table.zero_grad();
    }

    pub fn parameters(&mut self) -> Vec<ParamView<'_>> {
        vec![self.table.view()]
    }
}

/// Slice of a `[batch, seq_len, dim]` tensor at time step `t`.
pub(crate) fn time_step(x: &Array3<f32>, t: usize) -> Array2<f32> {
    x.index_axis(Axis(1), t).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lookup_and_scatter() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut emb = Embedding::new(3, 2, &mut rng);
        emb.table.value = array![[0.0, 0.0], [1.0, 2.0], [3.0, 4.0]];

        let ids = array![[1usize, 2, 1]];
        let out = emb.forward(ids.view()).unwrap();
        assert_eq!(out.dim(), (1, 3, 2));
        assert_eq!(time_step(&out, 1), array![[3.0, 4.0]]);

        emb.backward(ids.view(), &Array3::ones((1, 3, 2)));
        assert_eq!(emb.table.grad, array![[0.0, 0.0], [2.0, 2.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_out_of_range_id() {
        let mut rng = StdRng::seed_from_u64(5);
        let emb = Embedding::new(3, 2, &mut rng);
        let ids = array![[0usize, 3]];
        assert!(matches!(emb.forward(ids.view()), Err(ClassifierError::ValidationError(_))));
    }
}

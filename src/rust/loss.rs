//! Softmax cross-entropy over raw class scores.

use ndarray::{Array2, Axis};

use crate::classifier::utils::softmax_rows;
use crate::classifier::ClassifierError;

/// Mean cross-entropy of `scores` `[batch, classes]` against integer labels,
/// together with its gradient w.r.t. the scores.
///
/// ```text
/// loss   = mean_b( logsumexp(s_b) - s_b[y_b] )
/// d loss = (softmax(s) - onehot(y)) / batch
/// ```
///
/// # Errors
/// `ValidationError` for an empty batch, a row/label count mismatch or a
/// label outside `[0, classes)`.
pub fn cross_entropy(scores: &Array2<f32>, labels: &[usize]) -> Result<(f32, Array2<f32>), ClassifierError> {
    let (batch, classes) = scores.dim();
    if batch == 0 {
        return Err(ClassifierError::ValidationError("Cannot compute loss of an empty batch".into()));
    }
    if batch != labels.len() {
        return Err(ClassifierError::ValidationError(format!(
            "Got {} score rows but {} labels",
            batch,
            labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&y| y >= classes) {
        return Err(ClassifierError::ValidationError(format!(
            "Label {} outside {} classes",
            bad, classes
        )));
    }

    let mut total = 0.0f32;
    for (row, &y) in scores.axis_iter(Axis(0)).zip(labels) {
        let max = row.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
        let log_sum_exp = max + row.mapv(|x| (x - max).exp()).sum().ln();
        total += log_sum_exp - row[y];
    }

    let mut grad = softmax_rows(scores);
    for (mut row, &y) in grad.axis_iter_mut(Axis(0)).zip(labels) {
        row[y] -= 1.0;
    }
    grad /= batch as f32;

    Ok((total / batch as f32, grad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_uniform_scores() {
        let (loss, grad) = cross_entropy(&Array2::zeros((2, 4)), &[0, 3]).unwrap();
        assert_abs_diff_eq!(loss, 4.0f32.ln(), epsilon = 1e-6);
        assert_abs_diff_eq!(grad[[0, 0]], (0.25 - 1.0) / 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grad[[0, 1]], 0.25 / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_confident_prediction_has_small_loss() {
        let (loss, _) = cross_entropy(&array![[10.0, -10.0]], &[0]).unwrap();
        assert!(loss < 1e-6);
        let (loss, _) = cross_entropy(&array![[10.0, -10.0]], &[1]).unwrap();
        assert_abs_diff_eq!(loss, 20.0, epsilon = 1e-3);
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        let (_, grad) = cross_entropy(&array![[1.0, 2.0, 3.0], [0.5, -1.0, 0.0]], &[2, 1]).unwrap();
        for row in grad.rows() {
            assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_invalid_labels() {
        let scores = Array2::zeros((1, 2));
        assert!(cross_entropy(&scores, &[2]).is_err());
        assert!(cross_entropy(&scores, &[0, 1]).is_err());
        assert!(cross_entropy(&Array2::zeros((0, 2)), &[]).is_err());
    }
}

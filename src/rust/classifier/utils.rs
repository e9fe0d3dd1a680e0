use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Numerically stable softmax over a single score vector.
pub(crate) fn softmax(scores: ArrayView1<f32>) -> Array1<f32> {
    let max = scores.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exps = scores.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Row-wise softmax of a `[batch, classes]` score matrix.
pub(crate) fn softmax_rows(scores: &Array2<f32>) -> Array2<f32> {
    let mut out = scores.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let probs = softmax(row.view());
        row.assign(&probs);
    }
    out
}

/// Index of the largest score. The first maximum wins on ties; NaN never wins.
pub(crate) fn argmax(scores: ArrayView1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &x) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if x <= b || x.is_nan() => {}
            _ if x.is_nan() => {}
            _ => best = Some((i, x)),
        }
    }
    best.map(|(i, _)| i)
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

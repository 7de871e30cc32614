// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Linear support vector machine, one-vs-rest, trained with Pegasos
//!
//! The bias is learned as the weight of a constant feature, so it is
//! regularized together with the other weights.

use super::argmax;
use crate::error::{EvalError, Result};
use crate::features::{FeatureMatrix, SparseVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Rescale the lazy weight vector once its scale drops below this
const MIN_SCALE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct LinearSvm {
    /// One weight vector per class, the last entry is the bias
    weights: Vec<Vec<f64>>,
}

impl LinearSvm {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        c: f64,
        epochs: usize,
        seed: u64,
    ) -> Result<Self> {
        if c <= 0.0 || epochs == 0 {
            return Err(EvalError::invalid_config("linear SVM needs c > 0 and at least one epoch"));
        }

        let n = x.n_rows();
        let lambda = 1.0 / (c * n as f64);
        let steps = epochs * n;

        let weights = (0..n_classes)
            .map(|class| {
                // Same seed per class keeps classes independent of each other
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                train_binary(x, y, class, lambda, steps, &mut rng)
            })
            .collect();

        Ok(Self { weights })
    }

    fn decision(&self, class: usize, row: &SparseVector) -> f64 {
        let w = &self.weights[class];
        let bias = w[w.len() - 1];
        row.dot(w) + bias
    }

    pub fn decision_function(&self, row: &SparseVector) -> Vec<f64> {
        (0..self.weights.len()).map(|k| self.decision(k, row)).collect()
    }

    pub fn predict_one(&self, row: &SparseVector) -> usize {
        argmax(&self.decision_function(row))
    }
}

/// Pegasos for one class against the rest; returns weights with bias appended
fn train_binary(
    x: &FeatureMatrix,
    y: &[usize],
    class: usize,
    lambda: f64,
    steps: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    let bias_idx = x.n_features;
    // w = scale * v
    let mut v = vec![0.0; x.n_features + 1];
    let mut scale = 1.0;

    for t in 1..=steps {
        let i = rng.gen_range(0..x.n_rows());
        let row = x.row(i);
        let target = if y[i] == class { 1.0 } else { -1.0 };
        let eta = 1.0 / (lambda * t as f64);

        let margin = target * scale * (row.dot(&v) + v[bias_idx]);

        let shrink = 1.0 - eta * lambda;
        if shrink <= 0.0 {
            v.fill(0.0);
            scale = 1.0;
        } else {
            scale *= shrink;
        }

        if margin < 1.0 {
            let step = eta * target / scale;
            for (f, value) in row.iter() {
                v[f] += step * value;
            }
            v[bias_idx] += step;
        }

        if scale < MIN_SCALE {
            v.iter_mut().for_each(|w| *w *= scale);
            scale = 1.0;
        }
    }

    v.iter().map(|w| w * scale).collect()
}

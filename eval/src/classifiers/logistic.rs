// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Multinomial logistic regression trained by full-batch gradient descent

use super::{argmax, softmax};
use crate::error::{EvalError, Result};
use crate::features::{FeatureMatrix, SparseVector};

const TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// `n_classes` rows of `n_features` weights
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    iterations: usize,
}

impl LogisticRegression {
    /// Minimize mean cross-entropy plus `||W||^2 / (2 * c * n)`
    pub fn fit(
        x: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        c: f64,
        max_iter: usize,
        learning_rate: f64,
    ) -> Result<Self> {
        if c <= 0.0 || learning_rate <= 0.0 {
            return Err(EvalError::invalid_config("logistic regression needs c > 0 and learning_rate > 0"));
        }

        let n = x.n_rows() as f64;
        let n_features = x.n_features;
        let l2 = 1.0 / (c * n);

        let mut model = Self {
            weights: vec![vec![0.0; n_features]; n_classes],
            bias: vec![0.0; n_classes],
            iterations: 0,
        };

        let mut grad_w = vec![vec![0.0; n_features]; n_classes];
        let mut grad_b = vec![0.0; n_classes];
        let mut probs = vec![0.0; n_classes];

        for iter in 0..max_iter {
            grad_w.iter_mut().for_each(|g| g.fill(0.0));
            grad_b.fill(0.0);

            for (row, &label) in x.rows.iter().zip(y) {
                model.scores_into(row, &mut probs);
                softmax(&mut probs);
                for k in 0..n_classes {
                    let err = probs[k] - if k == label { 1.0 } else { 0.0 };
                    grad_b[k] += err / n;
                    for (f, v) in row.iter() {
                        grad_w[k][f] += err * v / n;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for k in 0..n_classes {
                for f in 0..n_features {
                    let g = grad_w[k][f] + l2 * model.weights[k][f];
                    model.weights[k][f] -= learning_rate * g;
                    max_grad = max_grad.max(g.abs());
                }
                model.bias[k] -= learning_rate * grad_b[k];
                max_grad = max_grad.max(grad_b[k].abs());
            }

            model.iterations = iter + 1;
            if max_grad < TOLERANCE {
                break;
            }
        }

        tracing::debug!("Logistic regression stopped after {} iterations", model.iterations);
        Ok(model)
    }

    fn scores_into(&self, row: &SparseVector, out: &mut [f64]) {
        for (k, score) in out.iter_mut().enumerate() {
            *score = row.dot(&self.weights[k]) + self.bias[k];
        }
    }

    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let mut scores = vec![0.0; self.bias.len()];
        self.scores_into(row, &mut scores);
        softmax(&mut scores);
        scores
    }

    pub fn predict_one(&self, row: &SparseVector) -> usize {
        let mut scores = vec![0.0; self.bias.len()];
        self.scores_into(row, &mut scores);
        argmax(&scores)
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::separable;
    use super::*;

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable();
        let model = LogisticRegression::fit(&x, &y, 3, 1.0, 200, 1.0).expect("fit");

        for row in &x.rows {
            let p = model.predict_proba(row);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!(model.iterations() <= 200);
    }

    #[test]
    fn test_unseen_class_is_not_predicted() {
        let (x, y) = separable();
        // four classes encoded, only three present in training
        let model = LogisticRegression::fit(&x, &y, 4, 1.0, 300, 1.0).expect("fit");
        assert!(x.rows.iter().all(|row| model.predict_one(row) < 3));
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let (x, y) = separable();
        assert!(LogisticRegression::fit(&x, &y, 3, 0.0, 10, 1.0).is_err());
        assert!(LogisticRegression::fit(&x, &y, 3, 1.0, 10, -1.0).is_err());
    }
}

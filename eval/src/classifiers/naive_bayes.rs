// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Multinomial naive Bayes over non-negative term weights

use super::argmax;
use crate::error::{EvalError, Result};
use crate::features::{FeatureMatrix, SparseVector};

/// Smallest smoothing applied when `alpha` is zero
const MIN_ALPHA: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct MultinomialNaiveBayes {
    /// `ln P(class)`; `-inf` for classes absent from training
    class_log_prior: Vec<f64>,
    /// `ln P(feature | class)`
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNaiveBayes {
    pub fn fit(x: &FeatureMatrix, y: &[usize], n_classes: usize, alpha: f64) -> Result<Self> {
        if alpha < 0.0 || alpha.is_nan() {
            return Err(EvalError::invalid_config("naive Bayes alpha must be non-negative"));
        }
        if x.rows.iter().any(|r| r.values.iter().any(|v| *v < 0.0)) {
            return Err(EvalError::invalid_config("naive Bayes needs non-negative features"));
        }
        let alpha = alpha.max(MIN_ALPHA);

        let mut class_count = vec![0usize; n_classes];
        let mut feature_count = vec![vec![0.0; x.n_features]; n_classes];
        for (row, &label) in x.rows.iter().zip(y) {
            class_count[label] += 1;
            for (f, v) in row.iter() {
                feature_count[label][f] += v;
            }
        }

        let n = y.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&count| if count == 0 { f64::NEG_INFINITY } else { (count as f64 / n).ln() })
            .collect();

        let smoothing = alpha * x.n_features as f64;
        let feature_log_prob = feature_count
            .iter()
            .map(|counts| {
                let total = counts.iter().sum::<f64>() + smoothing;
                counts.iter().map(|c| ((c + alpha) / total).ln()).collect()
            })
            .collect();

        Ok(Self {
            class_log_prior,
            feature_log_prob,
        })
    }

    /// Joint log likelihood per class
    pub fn joint_log_likelihood(&self, row: &SparseVector) -> Vec<f64> {
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, log_prob)| prior + row.dot(log_prob))
            .collect()
    }

    pub fn predict_one(&self, row: &SparseVector) -> usize {
        argmax(&self.joint_log_likelihood(row))
    }
}

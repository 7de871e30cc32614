// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Tree ensembles: multiclass gradient boosting and random forests

use super::tree::{DecisionTree, Target, TreeParams};
use super::{argmax, softmax};
use crate::error::{EvalError, Result};
use crate::features::{FeatureMatrix, SparseVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Floor for class priors so unseen classes get a finite initial score
const MIN_PRIOR: f64 = 1e-8;

/// Softmax gradient boosting with one regression tree per class per stage
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    initial: Vec<f64>,
    /// `stages[m][k]` is the tree for class `k` at stage `m`
    stages: Vec<Vec<DecisionTree>>,
    learning_rate: f64,
}

impl GradientBoosting {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        min_samples_split: usize,
    ) -> Result<Self> {
        if n_estimators == 0 || learning_rate <= 0.0 {
            return Err(EvalError::invalid_config(
                "gradient boosting needs n_estimators > 0 and learning_rate > 0",
            ));
        }

        let n = y.len();
        let k_f = n_classes as f64;
        let params = TreeParams {
            max_depth,
            min_samples_split,
            max_features: None,
        };
        // Unused: no feature subsampling
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut priors = vec![0.0; n_classes];
        for &label in y {
            priors[label] += 1.0 / n as f64;
        }
        let initial: Vec<f64> = priors.iter().map(|p| p.max(MIN_PRIOR).ln()).collect();

        let mut raw: Vec<Vec<f64>> = vec![initial.clone(); n];
        let samples: Vec<usize> = (0..n).collect();
        let mut stages = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            let probs: Vec<Vec<f64>> = raw
                .iter()
                .map(|scores| {
                    let mut p = scores.clone();
                    softmax(&mut p);
                    p
                })
                .collect();

            let mut stage = Vec::with_capacity(n_classes);
            for k in 0..n_classes {
                let residuals: Vec<f64> = (0..n)
                    .map(|i| {
                        let truth = if y[i] == k { 1.0 } else { 0.0 };
                        truth - probs[i][k]
                    })
                    .collect();

                let mut tree = DecisionTree::fit(x, &samples, &Target::Values(&residuals), params, &mut rng);

                // Newton step per leaf for the multinomial deviance
                let leaves: Vec<usize> = (0..n).map(|i| tree.leaf_index(x.row(i))).collect();
                let mut sums: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
                for (&leaf, &r) in leaves.iter().zip(&residuals) {
                    let entry = sums.entry(leaf).or_insert((0.0, 0.0));
                    entry.0 += r;
                    entry.1 += r.abs() * (1.0 - r.abs());
                }

                let gammas: BTreeMap<usize, f64> = sums
                    .into_iter()
                    .map(|(leaf, (sum, denom))| {
                        let gamma = if denom.abs() < 1e-150 {
                            0.0
                        } else {
                            (k_f - 1.0) / k_f * sum / denom
                        };
                        (leaf, gamma)
                    })
                    .collect();

                for (&leaf, &gamma) in &gammas {
                    tree.set_leaf_value(leaf, vec![gamma]);
                }
                for (scores, leaf) in raw.iter_mut().zip(&leaves) {
                    scores[k] += learning_rate * gammas.get(leaf).copied().unwrap_or(0.0);
                }
                stage.push(tree);
            }
            stages.push(stage);
        }

        tracing::debug!("Gradient boosting fitted {} stages x {} classes", stages.len(), n_classes);
        Ok(Self {
            initial,
            stages,
            learning_rate,
        })
    }

    pub fn decision_function(&self, row: &SparseVector) -> Vec<f64> {
        let mut scores = self.initial.clone();
        for stage in &self.stages {
            for (k, tree) in stage.iter().enumerate() {
                scores[k] += self.learning_rate * tree.predict(row).first().copied().unwrap_or(0.0);
            }
        }
        scores
    }

    pub fn predict_one(&self, row: &SparseVector) -> usize {
        argmax(&self.decision_function(row))
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

/// Bagged Gini trees with sqrt(F) features examined per split
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[usize],
        n_classes: usize,
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        seed: u64,
    ) -> Result<Self> {
        if n_estimators == 0 {
            return Err(EvalError::invalid_config("random forest needs n_estimators > 0"));
        }

        let n = y.len();
        let params = TreeParams {
            max_depth: max_depth.unwrap_or(usize::MAX),
            min_samples_split,
            max_features: Some(((x.n_features as f64).sqrt() as usize).max(1)),
        };
        let target = Target::Classes { labels: y, n_classes };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let trees = (0..n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, &bootstrap, &target, params, &mut rng)
            })
            .collect();

        Ok(Self { trees, n_classes })
    }

    /// Mean of the per-tree class distributions
    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let mut total = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in total.iter_mut().zip(tree.predict(row)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        total.iter_mut().for_each(|p| *p /= n);
        total
    }

    pub fn predict_one(&self, row: &SparseVector) -> usize {
        argmax(&self.predict_proba(row))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

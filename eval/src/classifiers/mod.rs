// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Classifier variants behind one fit/predict contract
//!
//! Variants form a closed set selected by configuration. Each configuration
//! value carries its own hyperparameters and fitting produces an owned
//! [`FittedClassifier`], so no state is shared between models.

mod ensemble;
mod logistic;
mod naive_bayes;
mod svm;
mod tree;

pub use ensemble::{GradientBoosting, RandomForest};
pub use logistic::LogisticRegression;
pub use naive_bayes::MultinomialNaiveBayes;
pub use svm::LinearSvm;

use crate::error::{EvalError, Result};
use crate::features::{FeatureMatrix, SparseVector};
use serde::{Deserialize, Serialize};

/// Hyperparameters for each supported classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierConfig {
    LogisticRegression {
        /// Inverse L2 regularization strength
        c: f64,
        max_iter: usize,
        learning_rate: f64,
    },
    LinearSvm {
        c: f64,
        epochs: usize,
        seed: u64,
    },
    MultinomialNaiveBayes {
        alpha: f64,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        min_samples_split: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        seed: u64,
    },
}

impl ClassifierConfig {
    pub fn logistic_regression() -> Self {
        ClassifierConfig::LogisticRegression {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 1.0,
        }
    }

    pub fn linear_svm(seed: u64) -> Self {
        ClassifierConfig::LinearSvm {
            c: 1.0,
            epochs: 20,
            seed,
        }
    }

    pub fn naive_bayes() -> Self {
        ClassifierConfig::MultinomialNaiveBayes { alpha: 1.0 }
    }

    pub fn gradient_boosting() -> Self {
        ClassifierConfig::GradientBoosting {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
        }
    }

    pub fn random_forest(seed: u64) -> Self {
        ClassifierConfig::RandomForest {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierConfig::LogisticRegression { .. } => "logistic_regression",
            ClassifierConfig::LinearSvm { .. } => "linear_svm",
            ClassifierConfig::MultinomialNaiveBayes { .. } => "multinomial_naive_bayes",
            ClassifierConfig::GradientBoosting { .. } => "gradient_boosting",
            ClassifierConfig::RandomForest { .. } => "random_forest",
        }
    }

    /// Fit a fresh classifier on `x` with class indices `y` in `0..n_classes`
    pub fn fit(&self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> Result<FittedClassifier> {
        check_training_data(x, y, n_classes)?;

        let fitted = match *self {
            ClassifierConfig::LogisticRegression { c, max_iter, learning_rate } => {
                FittedClassifier::LogisticRegression(LogisticRegression::fit(x, y, n_classes, c, max_iter, learning_rate)?)
            }
            ClassifierConfig::LinearSvm { c, epochs, seed } => {
                FittedClassifier::LinearSvm(LinearSvm::fit(x, y, n_classes, c, epochs, seed)?)
            }
            ClassifierConfig::MultinomialNaiveBayes { alpha } => {
                FittedClassifier::NaiveBayes(MultinomialNaiveBayes::fit(x, y, n_classes, alpha)?)
            }
            ClassifierConfig::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
                min_samples_split,
            } => FittedClassifier::GradientBoosting(GradientBoosting::fit(
                x,
                y,
                n_classes,
                n_estimators,
                learning_rate,
                max_depth,
                min_samples_split,
            )?),
            ClassifierConfig::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
                seed,
            } => FittedClassifier::RandomForest(RandomForest::fit(
                x,
                y,
                n_classes,
                n_estimators,
                max_depth,
                min_samples_split,
                seed,
            )?),
        };

        Ok(fitted)
    }
}

/// A trained classifier
#[derive(Debug, Clone)]
pub enum FittedClassifier {
    LogisticRegression(LogisticRegression),
    LinearSvm(LinearSvm),
    NaiveBayes(MultinomialNaiveBayes),
    GradientBoosting(GradientBoosting),
    RandomForest(RandomForest),
}

impl FittedClassifier {
    pub fn predict_one(&self, row: &SparseVector) -> usize {
        match self {
            FittedClassifier::LogisticRegression(m) => m.predict_one(row),
            FittedClassifier::LinearSvm(m) => m.predict_one(row),
            FittedClassifier::NaiveBayes(m) => m.predict_one(row),
            FittedClassifier::GradientBoosting(m) => m.predict_one(row),
            FittedClassifier::RandomForest(m) => m.predict_one(row),
        }
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<usize> {
        x.rows.iter().map(|row| self.predict_one(row)).collect()
    }
}

fn check_training_data(x: &FeatureMatrix, y: &[usize], n_classes: usize) -> Result<()> {
    if x.n_rows() == 0 {
        return Err(EvalError::empty_selection("empty training set"));
    }
    if x.n_rows() != y.len() {
        return Err(EvalError::invalid_config(format!(
            "{} feature rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    if n_classes == 0 {
        return Err(EvalError::invalid_config("label encoding has no classes"));
    }
    if let Some(bad) = y.iter().find(|&&label| label >= n_classes) {
        return Err(EvalError::invalid_config(format!(
            "label {} outside 0..{}",
            bad, n_classes
        )));
    }
    Ok(())
}

/// Index of the largest score; ties go to the lowest index
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

/// Numerically stable softmax, in place
pub(crate) fn softmax(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        total += *s;
    }
    if total > 0.0 {
        scores.iter_mut().for_each(|s| *s /= total);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::separable;
    use super::*;

    fn all_configs() -> Vec<ClassifierConfig> {
        vec![
            ClassifierConfig::logistic_regression(),
            ClassifierConfig::linear_svm(42),
            ClassifierConfig::naive_bayes(),
            ClassifierConfig::gradient_boosting(),
            ClassifierConfig::random_forest(42),
        ]
    }

    #[test]
    fn test_every_variant_learns_separable_data() {
        let (x, y) = separable();
        for config in all_configs() {
            let model = config.fit(&x, &y, 3).expect("fit");
            assert_eq!(model.predict(&x), y, "{} failed to fit training data", config.kind());
        }
    }

    #[test]
    fn test_empty_training_set_fails() {
        let empty = FeatureMatrix {
            rows: vec![],
            n_features: 3,
        };
        for config in all_configs() {
            assert!(config.fit(&empty, &[], 3).is_err(), "{}", config.kind());
        }
    }

    #[test]
    fn test_out_of_range_labels_fail() {
        let (x, mut y) = separable();
        y[0] = 7;
        for config in all_configs() {
            assert!(config.fit(&x, &y, 3).is_err(), "{}", config.kind());
        }
    }

    #[test]
    fn test_config_serde_tagged() {
        let json = serde_json::to_string(&ClassifierConfig::naive_bayes()).expect("serialize");
        assert_eq!(json, r#"{"kind":"multinomial_naive_bayes","alpha":1.0}"#);
        let back: ClassifierConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ClassifierConfig::naive_bayes());
    }

    #[test]
    fn test_argmax_and_softmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
        let mut s = [1.0, 2.0, 3.0];
        softmax(&mut s);
        assert!((s.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(s[2] > s[1] && s[1] > s[0]);
    }
}

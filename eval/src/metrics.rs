// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for multi-class event categorization
//!
//! Implements the per-category report used in the model comparison:
//! - K×K confusion matrix over the encoder's classes
//! - Precision, Recall, F1-Score and support per category
//! - Accuracy, macro and weighted averages
//!
//! Every ratio with a zero denominator is defined as 0.0.

use crate::categorizer::Category;
use crate::encoding::LabelEncoder;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confusion matrix; rows are actual classes, columns are predicted classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Create from predicted and true class indices
    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize], n_classes: usize) -> Result<Self> {
        if predictions.len() != ground_truth.len() {
            return Err(EvalError::invalid_config(format!(
                "{} predictions for {} labels",
                predictions.len(),
                ground_truth.len()
            )));
        }

        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&pred, &truth) in predictions.iter().zip(ground_truth) {
            if pred >= n_classes || truth >= n_classes {
                return Err(EvalError::invalid_config(format!(
                    "class index out of range for {} classes",
                    n_classes
                )));
            }
            matrix[truth][pred] += 1;
        }

        Ok(Self { matrix })
    }

    pub fn n_classes(&self) -> usize {
        self.matrix.len()
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.n_classes()).map(|k| self.matrix[k][k]).sum()
    }

    /// Number of samples whose true class is `class`
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Number of samples predicted as `class`
    pub fn predicted(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    /// Accuracy: correct / total
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.matrix[class][class], self.predicted(class))
    }

    /// Recall: TP / (TP + FN)
    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.matrix[class][class], self.support(class))
    }

    /// F1 Score: 2 * (Precision * Recall) / (Precision + Recall)
    pub fn f1_score(&self, class: usize) -> f64 {
        let precision = self.precision(class);
        let recall = self.recall(class);
        let denom = precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / denom
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Full classification report for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Metrics for every encoder class, in canonical category order
    pub per_class: BTreeMap<Category, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion_matrix: ConfusionMatrix,
    pub support: usize,
}

impl ClassificationReport {
    /// Generate report from predicted and true class indices of `encoder`
    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize], encoder: &LabelEncoder) -> Result<Self> {
        let cm = ConfusionMatrix::from_predictions(predictions, ground_truth, encoder.len())?;
        Ok(Self::from_confusion_matrix(cm, encoder))
    }

    pub fn from_confusion_matrix(cm: ConfusionMatrix, encoder: &LabelEncoder) -> Self {
        let per_class: BTreeMap<Category, ClassMetrics> = encoder
            .classes()
            .iter()
            .enumerate()
            .map(|(k, &category)| {
                let metrics = ClassMetrics {
                    precision: cm.precision(k),
                    recall: cm.recall(k),
                    f1_score: cm.f1_score(k),
                    support: cm.support(k),
                };
                (category, metrics)
            })
            .collect();

        let support = cm.total();
        let k = per_class.len().max(1) as f64;
        let mut macro_avg = ClassMetrics {
            support,
            ..Default::default()
        };
        let mut weighted_avg = macro_avg;

        for m in per_class.values() {
            macro_avg.precision += m.precision / k;
            macro_avg.recall += m.recall / k;
            macro_avg.f1_score += m.f1_score / k;

            let w = ratio(m.support, support);
            weighted_avg.precision += m.precision * w;
            weighted_avg.recall += m.recall * w;
            weighted_avg.f1_score += m.f1_score * w;
        }

        Self {
            per_class,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
            support,
            confusion_matrix: cm,
        }
    }

    /// F1 for `category`; 0.0 when the category is not part of the report
    pub fn f1(&self, category: Category) -> f64 {
        self.per_class.get(&category).map(|m| m.f1_score).unwrap_or(0.0)
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        let width = self
            .per_class
            .keys()
            .map(|c| c.as_str().len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        let mut output = String::from("Classification Report\n=====================\n");
        output.push_str(&format!(
            "{:<width$}  {:>9}  {:>9}  {:>9}  {:>7}\n",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        ));

        let mut line = |label: &str, m: &ClassMetrics| {
            output.push_str(&format!(
                "{:<width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>7}\n",
                label,
                m.precision,
                m.recall,
                m.f1_score,
                m.support,
                width = width
            ));
        };
        for (category, m) in &self.per_class {
            line(category.as_str(), m);
        }
        line("macro avg", &self.macro_avg);
        line("weighted avg", &self.weighted_avg);

        output.push_str(&format!(
            "\nAccuracy: {:.4} ({:.2}%) over {} samples\n",
            self.accuracy,
            self.accuracy * 100.0,
            self.support
        ));

        output.push_str("\nConfusion Matrix (rows actual, columns predicted):\n");
        for (category, row) in self.per_class.keys().zip(&self.confusion_matrix.matrix) {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>5}", c)).collect();
            output.push_str(&format!("{:<width$} {}\n", category.as_str(), cells.join(""), width = width));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> LabelEncoder {
        LabelEncoder::fit([Category::Kidnapping, Category::Bombing, Category::Other]).expect("encoder")
    }

    #[test]
    fn test_confusion_matrix_perfect() {
        let truth = vec![0, 1, 2, 2];
        let cm = ConfusionMatrix::from_predictions(&truth, &truth, 3).expect("cm");

        assert_eq!(cm.total(), 4);
        assert_eq!(cm.correct(), 4);
        assert!((cm.accuracy() - 1.0).abs() < 1e-12);
        for k in 0..3 {
            assert!((cm.f1_score(k) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let predictions = vec![0, 0, 1, 2, 1];
        let truth = vec![0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_predictions(&predictions, &truth, 3).expect("cm");

        assert_eq!(cm.matrix, vec![vec![1, 0, 0], vec![1, 1, 0], vec![0, 1, 1]]);
        assert!((cm.precision(0) - 0.5).abs() < 1e-12);
        assert!((cm.recall(1) - 0.5).abs() < 1e-12);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_matrix_rejects_bad_input() {
        assert!(ConfusionMatrix::from_predictions(&[0, 1], &[0], 2).is_err());
        assert!(ConfusionMatrix::from_predictions(&[3], &[0], 2).is_err());
    }

    #[test]
    fn test_absent_category_scores_zero() {
        let encoder = encoder();
        let other = encoder.encode(Category::Other).expect("other");
        let bombing = encoder.encode(Category::Bombing).expect("bombing");

        // Kidnapping never appears in truth or predictions
        let report = ClassificationReport::from_predictions(&[other, bombing], &[other, other], &encoder).expect("report");

        let kidnapping = report.per_class[&Category::Kidnapping];
        assert_eq!(kidnapping, ClassMetrics::default());
        assert_eq!(report.f1(Category::Kidnapping), 0.0);
        assert_eq!(report.f1(Category::TeacherOrSchool), 0.0);
        assert_eq!(report.per_class[&Category::Bombing].precision, 0.0);
    }

    #[test]
    fn test_metrics_within_unit_interval() {
        let encoder = encoder();
        let predictions = vec![0, 2, 1, 1, 0, 2, 2];
        let truth = vec![0, 1, 1, 2, 0, 2, 0];
        let report = ClassificationReport::from_predictions(&predictions, &truth, &encoder).expect("report");

        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        for m in report.per_class.values().chain([&report.macro_avg, &report.weighted_avg]) {
            assert!(in_range(m.precision) && in_range(m.recall) && in_range(m.f1_score));
        }
        assert!(in_range(report.accuracy));
        assert_eq!(report.support, 7);
    }

    #[test]
    fn test_averages() {
        let encoder = encoder();
        // class 0 perfect with 3 samples, class 1 and 2 swapped with 1 sample each
        let predictions = vec![0, 0, 0, 2, 1];
        let truth = vec![0, 0, 0, 1, 2];
        let report = ClassificationReport::from_predictions(&predictions, &truth, &encoder).expect("report");

        assert!((report.macro_avg.f1_score - 1.0 / 3.0).abs() < 1e-12);
        assert!((report.weighted_avg.f1_score - 0.6).abs() < 1e-12);
        assert!((report.accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_classification_report_format() {
        let encoder = encoder();
        let report = ClassificationReport::from_predictions(&[0, 1, 2], &[0, 1, 1], &encoder).expect("report");
        let formatted = report.format();

        assert!(formatted.contains("Classification Report"));
        assert!(formatted.contains("Bombing"));
        assert!(formatted.contains("macro avg"));
        assert!(formatted.contains("Confusion Matrix"));
    }

    #[test]
    fn test_report_serializes_category_keys() {
        let encoder = encoder();
        let report = ClassificationReport::from_predictions(&[0], &[0], &encoder).expect("report");
        let json = serde_json::to_string(&report).expect("json");
        assert!(json.contains("\"Kidnapping\""));

        let back: ClassificationReport = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, report);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Conflict event categorization and classifier evaluation
//!
//! This crate provides:
//! - Text normalization and ordered keyword categorization of event notes
//! - Year filtering, label encoding and a seeded train/test split
//! - TF-IDF and count vectorizers over a capped vocabulary
//! - Five text classifiers (logistic regression, linear SVM, naive Bayes,
//!   gradient boosting, random forest) behind one configuration enum
//! - Per-category precision/recall/F1 and a model comparison table
//! - Reproducible evaluation pipeline with JSON and markdown output

pub mod baselines;
pub mod categorizer;
pub mod classifiers;
pub mod datasets;
pub mod encoding;
pub mod error;
pub mod features;
pub mod harness;
pub mod metrics;
pub mod pipeline;
pub mod text;

pub use baselines::{all_baselines, ModelPipeline, ModelSpec};
pub use categorizer::{Category, CategoryRule, CategoryRuleSet};
pub use classifiers::{ClassifierConfig, FittedClassifier};
pub use datasets::{ColumnSpec, Dataset, EventRecord, EventTable, RawEvent, TrainTestSplit};
pub use encoding::LabelEncoder;
pub use error::{EvalError, Result};
pub use features::{TextVectorizer, VectorizerConfig, Weighting};
pub use harness::{evaluate_models, Comparison, ComparisonTable, ModelEntry, ModelOutcome};
pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use pipeline::{EvaluationConfig, EvaluationPipeline, EvaluationResults};

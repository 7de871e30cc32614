// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible evaluation pipeline for conflict event categorization
//!
//! Orchestrates:
//! - Dataset loading (CSV or synthetic)
//! - Keyword categorization and year filtering
//! - Label encoding and the seeded train/test split
//! - Model training, evaluation and comparison
//! - Results serialization and reporting

use crate::baselines::{all_baselines, select_baselines, ModelPipeline, ModelSpec};
use crate::categorizer::CategoryRuleSet;
use crate::datasets::{
    assign_indices, categorize_events, category_counts, filter_by_year, train_test_split, CategoryDistribution,
    ColumnSpec, Dataset, EventRecord, TrainTestSplit,
};
use crate::encoding::LabelEncoder;
use crate::error::{EvalError, Result};
use crate::harness::{evaluate_models, Comparison, ModelOutcome};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Configuration for the evaluation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Random seed for the split and the seeded models
    pub seed: u64,
    /// Years kept by the filter
    pub years: BTreeSet<i32>,
    /// Ordered keyword rules
    pub rules: CategoryRuleSet,
    /// Vocabulary cap shared by all models
    pub max_features: usize,
    /// Fraction of records held out for testing
    pub test_ratio: f64,
    /// Standard models to run (empty = all)
    pub model_names: Vec<String>,
    /// Additional models with explicit hyperparameters
    pub custom_models: Vec<ModelSpec>,
    pub columns: ColumnSpec,
    /// CSV input; the synthetic corpus is used when unset
    pub dataset_path: Option<String>,
    pub synthetic_size: usize,
    /// Output directory for results
    pub output_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            years: [2010, 2011, 2013, 2014, 2015, 2016, 2018, 2019].into_iter().collect(),
            rules: CategoryRuleSet::default(),
            max_features: 5000,
            test_ratio: 0.2,
            model_names: vec![],
            custom_models: vec![],
            columns: ColumnSpec::default(),
            dataset_path: None,
            synthetic_size: 1000,
            output_dir: "eval/results".to_string(),
        }
    }
}

impl EvaluationConfig {
    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&raw).with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(EvalError::invalid_config(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.max_features == 0 {
            return Err(EvalError::invalid_config("max_features must be positive"));
        }
        if self.years.is_empty() {
            return Err(EvalError::invalid_config("no years selected"));
        }
        self.rules.validate()?;
        self.model_specs().map(|_| ())
    }

    /// Standard models matching `model_names`, then the custom models
    ///
    /// Model names key the comparison table, so two models whose names
    /// differ only by case are rejected.
    pub fn model_specs(&self) -> Result<Vec<ModelSpec>> {
        let mut specs = select_baselines(all_baselines(self.seed, self.max_features), &self.model_names)?;
        specs.extend(self.custom_models.iter().cloned());

        let mut seen = BTreeSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.to_lowercase()) {
                return Err(EvalError::invalid_config(format!(
                    "model name '{}' is used more than once",
                    spec.name
                )));
            }
        }
        Ok(specs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    pub total_events: usize,
    pub selected_events: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub distribution: CategoryDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub best_model: String,
    pub best_macro_f1: f64,
    pub best_accuracy: f64,
    pub failed_models: Vec<String>,
}

/// Complete evaluation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub config: EvaluationConfig,
    pub dataset_info: DatasetInfo,
    pub comparison: Comparison,
    pub summary: EvaluationSummary,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Categorized, filtered and split data ready for model fitting
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub records: Vec<EventRecord>,
    pub encoder: LabelEncoder,
    pub distribution: CategoryDistribution,
    pub split: TrainTestSplit,
}

/// Main evaluation pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
    dataset: Option<Dataset>,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config, dataset: None }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Load dataset based on configuration
    pub fn load_dataset(&mut self) -> anyhow::Result<()> {
        let dataset = match self.config.dataset_path {
            Some(ref path) => {
                tracing::info!("Loading events from {}", path);
                Dataset::load_csv(Path::new(path), &self.config.columns)?
            }
            None => {
                tracing::info!(
                    "No dataset path provided, generating {} synthetic events with seed {}",
                    self.config.synthetic_size,
                    self.config.seed
                );
                Dataset::synthetic(self.config.synthetic_size, self.config.seed)
            }
        };

        self.dataset = Some(dataset);
        Ok(())
    }

    /// Categorize, filter, encode and split a dataset
    pub fn prepare(&self, dataset: &Dataset) -> Result<PreparedData> {
        let categorized = categorize_events(&dataset.events, &self.config.rules);
        let mut records = filter_by_year(&categorized, &self.config.years);
        tracing::info!(
            "Selected {} of {} events for years {:?}",
            records.len(),
            categorized.len(),
            self.config.years
        );

        let distribution = category_counts(&records)?;
        let encoder = LabelEncoder::fit(records.iter().map(|r| r.category))?;
        assign_indices(&mut records, &encoder)?;
        let split = train_test_split(&records, self.config.test_ratio, self.config.seed)?;

        tracing::info!(
            "Split {} events into train={} test={} over {} categories",
            records.len(),
            split.train_texts.len(),
            split.test_texts.len(),
            encoder.len()
        );

        Ok(PreparedData {
            records,
            encoder,
            distribution,
            split,
        })
    }

    /// Run the evaluation on an already loaded dataset
    pub fn evaluate(&self, dataset: &Dataset) -> Result<EvaluationResults> {
        self.config.validate()?;
        let prepared = self.prepare(dataset)?;

        let mut pipelines: Vec<ModelPipeline> = self.config.model_specs()?.iter().map(ModelSpec::build).collect();
        let comparison = evaluate_models(&mut pipelines, &prepared.split, &prepared.encoder);

        let failed_models: Vec<String> = comparison.failed().map(|e| e.name.clone()).collect();
        let summary = match comparison.best_by_macro_f1() {
            Some((entry, report)) => EvaluationSummary {
                best_model: entry.name.clone(),
                best_macro_f1: report.macro_avg.f1_score,
                best_accuracy: report.accuracy,
                failed_models,
            },
            None => EvaluationSummary {
                best_model: "None".to_string(),
                best_macro_f1: 0.0,
                best_accuracy: 0.0,
                failed_models,
            },
        };

        let dataset_info = DatasetInfo {
            name: dataset.name.clone(),
            total_events: dataset.len(),
            selected_events: prepared.records.len(),
            train_samples: prepared.split.train_texts.len(),
            test_samples: prepared.split.test_texts.len(),
            distribution: prepared.distribution,
        };

        Ok(EvaluationResults {
            config: self.config.clone(),
            dataset_info,
            comparison,
            summary,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Run the full evaluation pipeline, loading the dataset if needed
    pub fn run(&mut self) -> anyhow::Result<EvaluationResults> {
        if self.dataset.is_none() {
            self.load_dataset()?;
        }
        let dataset = self.dataset.as_ref().context("Dataset not loaded")?;
        Ok(self.evaluate(dataset)?)
    }

    /// Save results to JSON file
    pub fn save_results(results: &EvaluationResults, output_path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))?;
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Generate a markdown report
    pub fn generate_report(results: &EvaluationResults) -> String {
        let mut report = String::new();
        let info = &results.dataset_info;

        report.push_str("# Conflict Event Categorization Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", results.version));

        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **Name:** {}\n", info.name));
        report.push_str(&format!("- **Total Events:** {}\n", info.total_events));
        report.push_str(&format!("- **Selected Events:** {}\n", info.selected_events));
        report.push_str(&format!("- **Years:** {:?}\n", results.config.years));
        report.push_str(&format!(
            "- **Split Sizes:** Train={}, Test={} (seed {})\n",
            info.train_samples, info.test_samples, results.config.seed
        ));
        report.push_str(&format!(
            "- **Boko Haram Mentions:** {}\n\n",
            info.distribution.boko_haram_mentions
        ));

        report.push_str("### Category Distribution\n\n");
        report.push_str("| Category | Events |\n|----------|--------|\n");
        for (category, count) in &info.distribution.counts {
            report.push_str(&format!("| {} | {} |\n", category.display_name(), count));
        }

        report.push_str("\n## Summary\n\n");
        report.push_str(&format!(
            "**Best Model:** {} (Macro F1={:.4}, Accuracy={:.4})\n\n",
            results.summary.best_model, results.summary.best_macro_f1, results.summary.best_accuracy
        ));
        if !results.summary.failed_models.is_empty() {
            report.push_str(&format!("**Failed Models:** {}\n\n", results.summary.failed_models.join(", ")));
        }

        report.push_str("### F1 Score by Category\n\n");
        report.push_str(&results.comparison.table.to_markdown());

        report.push_str("\n## Detailed Results\n\n");
        for entry in &results.comparison.entries {
            report.push_str(&format!("### {}\n\n", entry.name));
            report.push_str(&format!("*{}*\n\n", entry.description));
            report.push_str(&format!("- Training samples: {}\n", entry.train_samples));
            report.push_str(&format!("- Evaluation samples: {}\n\n", entry.test_samples));

            match entry.report() {
                Some(metrics) => report.push_str(&format!("```\n{}\n```\n\n", metrics.format())),
                None => {
                    if let ModelOutcome::Failed { reason } = &entry.outcome {
                        report.push_str(&format!("**Failed:** {}\n\n", reason));
                    }
                }
            }
        }

        report.push_str("## Configuration\n\n");
        report.push_str(&format!(
            "```json\n{}\n```\n",
            serde_json::to_string_pretty(&results.config).unwrap_or_default()
        ));

        report
    }

    /// Save the comparison table as CSV
    pub fn save_comparison_csv(results: &EvaluationResults, output_path: &Path) -> anyhow::Result<()> {
        results.comparison.table.write_csv(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::Category;
    use crate::classifiers::ClassifierConfig;
    use crate::datasets::RawEvent;
    use crate::features::{VectorizerConfig, Weighting};

    fn all_years() -> BTreeSet<i32> {
        (2009..=2020).collect()
    }

    fn small_config() -> EvaluationConfig {
        EvaluationConfig {
            years: all_years(),
            max_features: 200,
            synthetic_size: 120,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = EvaluationConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.years.len(), 8);
        assert!(!config.years.contains(&2012));
        assert!(!config.years.contains(&2017));
        assert_eq!(config.model_specs().expect("specs").len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad_ratio = EvaluationConfig {
            test_ratio: 1.0,
            ..Default::default()
        };
        assert!(matches!(bad_ratio.validate(), Err(EvalError::InvalidConfig(_))));

        let unknown_model = EvaluationConfig {
            model_names: vec!["Perceptron".to_string()],
            ..Default::default()
        };
        assert!(unknown_model.validate().is_err());
    }

    #[test]
    fn test_duplicate_model_names_rejected() {
        let custom = ModelSpec::new(
            "naive BAYES",
            VectorizerConfig {
                max_features: 100,
                weighting: Weighting::Counts,
            },
            ClassifierConfig::naive_bayes(),
        );
        let clashing = EvaluationConfig {
            custom_models: vec![custom.clone()],
            ..Default::default()
        };
        assert!(matches!(clashing.validate(), Err(EvalError::InvalidConfig(msg)) if msg.contains("naive BAYES")));

        // Accepted once the standard Naive Bayes is not selected
        let distinct = EvaluationConfig {
            model_names: vec!["Logistic Regression".to_string()],
            custom_models: vec![custom],
            ..Default::default()
        };
        let specs = distinct.model_specs().expect("specs");
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"seed": 7, "years": [2014, 2015], "model_names": ["Naive Bayes"]}"#).expect("write");

        let config = EvaluationConfig::from_json_file(&path).expect("load");
        assert_eq!(config.seed, 7);
        assert_eq!(config.years, BTreeSet::from([2014, 2015]));
        assert_eq!(config.max_features, 5000);
        assert_eq!(config.model_specs().expect("specs").len(), 1);
    }

    #[test]
    fn test_empty_selection_aborts() {
        let dataset = Dataset {
            name: "old".to_string(),
            events: vec![RawEvent::new("a", Some("bomb blast"), 2005)],
        };
        let pipeline = EvaluationPipeline::new(EvaluationConfig::default());
        assert!(matches!(pipeline.evaluate(&dataset), Err(EvalError::EmptySelection(_))));
    }

    #[test]
    fn test_pipeline_synthetic() {
        let mut pipeline = EvaluationPipeline::new(small_config());
        let results = pipeline.run().expect("Pipeline should succeed");

        assert_eq!(results.comparison.entries.len(), 5);
        assert_eq!(results.dataset_info.total_events, 120);
        assert_eq!(results.dataset_info.selected_events, 120);
        assert_eq!(results.dataset_info.test_samples, 24);
        assert!(results.summary.best_macro_f1 >= 0.0);
        assert!(results.summary.best_macro_f1 <= 1.0);
        assert_ne!(results.summary.best_model, "None");
    }

    #[test]
    fn test_split_and_table_are_reproducible() {
        let dataset = Dataset::synthetic(20, 42);
        let config = EvaluationConfig {
            years: all_years(),
            max_features: 100,
            ..Default::default()
        };
        let pipeline = EvaluationPipeline::new(config);

        let first = pipeline.prepare(&dataset).expect("prepare");
        let second = pipeline.prepare(&dataset).expect("prepare");
        assert_eq!(first.split, second.split);
        assert_eq!(first.split.train_texts.len(), 16);
        assert_eq!(first.split.test_texts.len(), 4);

        let a = pipeline.evaluate(&dataset).expect("evaluate");
        let b = pipeline.evaluate(&dataset).expect("evaluate");
        assert_eq!(a.comparison.table, b.comparison.table);
    }

    #[test]
    fn test_filter_by_year_in_prepare() {
        let dataset = Dataset {
            name: "mixed".to_string(),
            events: vec![
                RawEvent::new("a", Some("bomb exploded at the market"), 2014),
                RawEvent::new("b", Some("gunmen abducted traders"), 2012),
                RawEvent::new("c", Some("troops clashed with militants"), 2015),
                RawEvent::new("d", Some("protesters gathered"), 2016),
                RawEvent::new("e", Some("teachers fled the school"), 2017),
            ],
        };
        let pipeline = EvaluationPipeline::new(EvaluationConfig::default());
        let prepared = pipeline.prepare(&dataset).expect("prepare");

        assert_eq!(prepared.records.len(), 3);
        assert_eq!(prepared.distribution.count(Category::Kidnapping), 0);
        assert!(!prepared.encoder.classes().contains(&Category::TeacherOrSchool));
        assert_eq!(prepared.split.test_texts.len(), 1);
    }

    #[test]
    fn test_generate_and_save_outputs() {
        let mut pipeline = EvaluationPipeline::new(EvaluationConfig {
            model_names: vec!["Naive Bayes".to_string()],
            ..small_config()
        });
        let results = pipeline.run().expect("Pipeline should succeed");

        let report = EvaluationPipeline::generate_report(&results);
        assert!(report.contains("Conflict Event Categorization Report"));
        assert!(report.contains("F1 Score by Category"));
        assert!(report.contains("Best Model"));

        let dir = tempfile::tempdir().expect("tempdir");
        let json_path = dir.path().join("results.json");
        EvaluationPipeline::save_results(&results, &json_path).expect("save json");
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).expect("read")).expect("json");
        assert_eq!(parsed["summary"]["best_model"], "Naive Bayes");

        let csv_path = dir.path().join("comparison.csv");
        EvaluationPipeline::save_comparison_csv(&results, &csv_path).expect("save csv");
        assert!(std::fs::read_to_string(&csv_path).expect("read").starts_with("Model,"));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model comparison over a shared train/test split
//!
//! Every pipeline is fitted on the same training partition and scored on the
//! same test partition. A model that fails is recorded as failed and the
//! remaining models still run.

use crate::baselines::ModelPipeline;
use crate::categorizer::Category;
use crate::datasets::TrainTestSplit;
use crate::encoding::LabelEncoder;
use crate::error::{EvalError, Result};
use crate::metrics::ClassificationReport;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    Fitted { report: ClassificationReport },
    Failed { reason: String },
}

/// Result of evaluating one pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub description: String,
    pub train_samples: usize,
    pub test_samples: usize,
    pub outcome: ModelOutcome,
}

impl ModelEntry {
    pub fn report(&self) -> Option<&ClassificationReport> {
        match &self.outcome {
            ModelOutcome::Fitted { report } => Some(report),
            ModelOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ModelOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub model: String,
    /// F1 per category, aligned with [`ComparisonTable::categories`]
    pub f1_scores: Vec<f64>,
}

/// Per-category F1 for every successfully fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub categories: Vec<Category>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, model: &str, report: &ClassificationReport) {
        let f1_scores = self.categories.iter().map(|&c| report.f1(c)).collect();
        self.rows.push(ComparisonRow {
            model: model.to_string(),
            f1_scores,
        });
    }

    /// F1 of `model` on `category`, if both are in the table
    pub fn f1(&self, model: &str, category: Category) -> Option<f64> {
        let col = self.categories.iter().position(|&c| c == category)?;
        let row = self.rows.iter().find(|r| r.model == model)?;
        row.f1_scores.get(col).copied()
    }

    pub fn models(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|r| r.model.as_str())
    }

    /// Markdown table, one row per model
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("| Model |");
        for category in &self.categories {
            out.push_str(&format!(" {} |", category.display_name()));
        }
        out.push_str("\n|-------|");
        for _ in &self.categories {
            out.push_str("------|");
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("| {} |", row.model));
            for f1 in &row.f1_scores {
                out.push_str(&format!(" {:.4} |", f1));
            }
            out.push('\n');
        }
        out
    }

    /// Plain text table for terminal output
    pub fn format(&self) -> String {
        let name_width = self.models().map(str::len).chain([5]).max().unwrap_or(5);
        let mut out = format!("{:<width$}", "Model", width = name_width);
        for category in &self.categories {
            out.push_str(&format!("  {:>w$}", category.as_str(), w = category.as_str().len().max(6)));
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("{:<width$}", row.model, width = name_width));
            for (category, f1) in self.categories.iter().zip(&row.f1_scores) {
                out.push_str(&format!("  {:>w$.4}", f1, w = category.as_str().len().max(6)));
            }
            out.push('\n');
        }
        out
    }

    /// Write as CSV with a `Model` column followed by one column per category
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer =
            csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;

        let mut header = vec!["Model".to_string()];
        header.extend(self.categories.iter().map(|c| c.as_str().to_string()));
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.model.clone()];
            record.extend(row.f1_scores.iter().map(|f| format!("{:.6}", f)));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::info!("Comparison table saved to {}", path.display());
        Ok(())
    }
}

/// Outcome of a full model comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub entries: Vec<ModelEntry>,
    pub table: ComparisonTable,
}

impl Comparison {
    pub fn failed(&self) -> impl Iterator<Item = &ModelEntry> + '_ {
        self.entries.iter().filter(|e| e.is_failed())
    }

    /// Fitted model with the highest macro F1; the first one wins ties
    pub fn best_by_macro_f1(&self) -> Option<(&ModelEntry, &ClassificationReport)> {
        self.entries
            .iter()
            .filter_map(|e| e.report().map(|r| (e, r)))
            .fold(None, |best, (e, r)| match best {
                Some((_, b)) if b.macro_avg.f1_score >= r.macro_avg.f1_score => best,
                _ => Some((e, r)),
            })
    }
}

/// Fit each pipeline on the training partition and score it on the test partition
pub fn evaluate_models(pipelines: &mut [ModelPipeline], split: &TrainTestSplit, encoder: &LabelEncoder) -> Comparison {
    let mut entries = Vec::with_capacity(pipelines.len());
    let mut table = ComparisonTable::new(encoder.classes().to_vec());

    for pipeline in pipelines.iter_mut() {
        tracing::info!("Evaluating model: {}", pipeline.name());

        let outcome = match fit_and_score(pipeline, split, encoder) {
            Ok(report) => {
                tracing::info!(
                    "  {} - Accuracy: {:.4}, Macro F1: {:.4}, Weighted F1: {:.4}",
                    pipeline.name(),
                    report.accuracy,
                    report.macro_avg.f1_score,
                    report.weighted_avg.f1_score
                );
                table.push(pipeline.name(), &report);
                ModelOutcome::Fitted { report }
            }
            Err(e) => {
                tracing::warn!("{}", e);
                ModelOutcome::Failed { reason: e.to_string() }
            }
        };

        entries.push(ModelEntry {
            name: pipeline.name().to_string(),
            description: pipeline.description(),
            train_samples: split.train_texts.len(),
            test_samples: split.test_texts.len(),
            outcome,
        });
    }

    Comparison { entries, table }
}

fn fit_and_score(
    pipeline: &mut ModelPipeline,
    split: &TrainTestSplit,
    encoder: &LabelEncoder,
) -> Result<ClassificationReport> {
    pipeline.fit(&split.train_texts, &split.train_labels, encoder)?;
    let predictions = pipeline.predict(&split.test_texts)?;
    ClassificationReport::from_predictions(&predictions, &split.test_labels, encoder)
        .map_err(|e| EvalError::model_fit(pipeline.name(), e.to_string()))
}

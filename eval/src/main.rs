// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation pipeline CLI for conflict event categorization
//!
//! Usage:
//!   eval-pipeline --seed 42
//!   eval-pipeline --path ./data/conflict_events.csv --years 2014,2015

use anyhow::{Context, Result};
use clap::Parser;
use conflict_eval::baselines::all_baselines;
use conflict_eval::pipeline::{EvaluationConfig, EvaluationPipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eval-pipeline")]
#[command(about = "Compare text classifiers against keyword-derived event categories")]
#[command(version)]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV file of events (synthetic corpus when omitted)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Number of events in the synthetic corpus
    #[arg(long)]
    synthetic_size: Option<usize>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Years to keep (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    years: Vec<i32>,

    /// Fraction of events held out for testing
    #[arg(long)]
    test_ratio: Option<f64>,

    /// Vocabulary cap for the vectorizers
    #[arg(long)]
    max_features: Option<usize>,

    /// Specific models to run (comma-separated, empty = all)
    #[arg(short, long, value_delimiter = ',')]
    models: Vec<String>,

    /// Name of the notes column
    #[arg(long)]
    notes_column: Option<String>,

    /// Name of the year column
    #[arg(long)]
    year_column: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, markdown, both)
    #[arg(short, long, default_value = "both")]
    format: String,

    /// List available models
    #[arg(long)]
    list: bool,
}

impl Args {
    fn into_config(self) -> Result<EvaluationConfig> {
        let mut config = match self.config {
            Some(ref path) => EvaluationConfig::from_json_file(path)?,
            None => EvaluationConfig::default(),
        };

        if let Some(path) = self.path {
            config.dataset_path = Some(path.to_string_lossy().to_string());
        }
        if let Some(size) = self.synthetic_size {
            config.synthetic_size = size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if !self.years.is_empty() {
            config.years = self.years.into_iter().collect();
        }
        if let Some(ratio) = self.test_ratio {
            config.test_ratio = ratio;
        }
        if let Some(max_features) = self.max_features {
            config.max_features = max_features;
        }
        if !self.models.is_empty() {
            config.model_names = self.models.iter().map(|m| m.trim().to_string()).collect();
        }
        if let Some(notes) = self.notes_column {
            config.columns.notes = notes;
        }
        if let Some(year) = self.year_column {
            config.columns.year = year;
        }
        if let Some(output) = self.output {
            config.output_dir = output.to_string_lossy().to_string();
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list {
        println!("Available models:");
        println!("-----------------");
        for spec in all_baselines(42, 5000) {
            println!("  {}: {}", spec.name, spec.build().description());
        }
        return Ok(());
    }

    let format = args.format.clone();
    let config = args.into_config()?;

    tracing::info!("Conflict Event Evaluation Pipeline");
    tracing::info!("==================================");
    tracing::info!("Dataset: {}", config.dataset_path.as_deref().unwrap_or("synthetic"));
    tracing::info!("Seed: {}", config.seed);
    tracing::info!("Years: {:?}", config.years);

    let mut pipeline = EvaluationPipeline::new(config);
    let results = pipeline.run()?;
    let output = PathBuf::from(&pipeline.config().output_dir);

    // Print summary to console
    println!("\n{}", "=".repeat(70));
    println!("EVALUATION SUMMARY");
    println!("{}", "=".repeat(70));
    println!(
        "\nEvents: {} selected of {} (train={}, test={})",
        results.dataset_info.selected_events,
        results.dataset_info.total_events,
        results.dataset_info.train_samples,
        results.dataset_info.test_samples
    );
    println!(
        "Best Model: {} (Macro F1={:.4}, Accuracy={:.4})",
        results.summary.best_model, results.summary.best_macro_f1, results.summary.best_accuracy
    );
    println!("\nF1 Score by Category:");
    println!("{:-<70}", "");
    print!("{}", results.comparison.table.format());
    println!("{:-<70}", "");

    for entry in results.comparison.failed() {
        println!("FAILED {}", entry.name);
    }

    // Save outputs
    std::fs::create_dir_all(&output).with_context(|| format!("Failed to create {}", output.display()))?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let stem = format!("eval_{}_{}", results.dataset_info.name, timestamp);

    if format == "json" || format == "both" {
        let json_path = output.join(format!("{}.json", stem));
        EvaluationPipeline::save_results(&results, &json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if format == "markdown" || format == "both" {
        let report = EvaluationPipeline::generate_report(&results);
        let md_path = output.join(format!("{}.md", stem));
        std::fs::write(&md_path, report)?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    let csv_path = output.join(format!("{}_f1_scores.csv", stem));
    EvaluationPipeline::save_comparison_csv(&results, &csv_path)?;
    println!("F1 comparison saved to: {}", csv_path.display());

    println!("\nEvaluation complete!");

    Ok(())
}

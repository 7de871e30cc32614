// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Standalone keyword categorizer
//!
//! Categorizes event notes, filters by year and prints the category
//! distribution without training any model.

use anyhow::{Context, Result};
use clap::Parser;
use conflict_eval::categorizer::CategoryRuleSet;
use conflict_eval::datasets::{
    assign_indices, categorize_events, category_counts, filter_by_year, write_categorized_csv, ColumnSpec, Dataset,
};
use conflict_eval::encoding::LabelEncoder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "categorize-events")]
#[command(about = "Assign keyword categories to conflict event notes")]
#[command(version)]
struct Args {
    /// CSV file of events (synthetic corpus when omitted)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Years to keep (comma-separated)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values_t = [2010, 2011, 2013, 2014, 2015, 2016, 2018, 2019]
    )]
    years: Vec<i32>,

    /// JSON file with an ordered list of keyword rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Name of the notes column
    #[arg(long, default_value = "NOTES")]
    notes_column: String,

    /// Name of the year column
    #[arg(long, default_value = "YEAR")]
    year_column: String,

    /// Random seed for the synthetic corpus
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of events in the synthetic corpus
    #[arg(short, long, default_value_t = 1000)]
    num_samples: usize,

    /// Write categorized events to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_rules(path: &Path) -> Result<CategoryRuleSet> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    // Deserialization lowercases and validates the rules
    let rules: CategoryRuleSet =
        serde_json::from_str(&raw).with_context(|| format!("Invalid rules in {}", path.display()))?;
    Ok(rules)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rules = match args.rules {
        Some(ref path) => load_rules(path)?,
        None => CategoryRuleSet::default(),
    };
    for (position, rule) in rules.rules().iter().enumerate() {
        tracing::debug!("Rule {}: {} <- {:?}", position + 1, rule.category, rule.keywords);
    }
    let columns = ColumnSpec {
        notes: args.notes_column.clone(),
        year: args.year_column.clone(),
    };

    let dataset = match args.path {
        Some(ref path) => Dataset::load_csv(path, &columns)?,
        None => {
            tracing::info!("Generating synthetic corpus ({} events, seed={})", args.num_samples, args.seed);
            Dataset::synthetic(args.num_samples, args.seed)
        }
    };

    let years: BTreeSet<i32> = args.years.iter().copied().collect();
    let mut records = filter_by_year(&categorize_events(&dataset.events, &rules), &years);
    let distribution = category_counts(&records)?;
    let encoder = LabelEncoder::fit(records.iter().map(|r| r.category))?;
    assign_indices(&mut records, &encoder)?;

    println!("\nCategory distribution for years {:?}", years);
    println!("{:-<40}", "");
    for (category, count) in &distribution.counts {
        let share = *count as f64 / distribution.total as f64 * 100.0;
        println!("{:<22} {:>8} {:>6.1}%", category.display_name(), count, share);
    }
    println!("{:-<40}", "");
    println!("{:<22} {:>8}", "Total", distribution.total);
    println!("{:<22} {:>8}", "Boko Haram mentions", distribution.boko_haram_mentions);

    println!("\nLabel encoding:");
    for (index, category) in encoder.classes().iter().enumerate() {
        println!("  {} -> {}", index, category);
    }

    if let Some(ref output) = args.output {
        write_categorized_csv(&records, &rules, output)?;
        println!("\nCategorized events saved to: {}", output.display());
    }

    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Conflict event datasets: schema checks, categorization, year filtering
//! and the seeded train/test split

use crate::categorizer::{Category, CategoryRuleSet};
use crate::encoding::LabelEncoder;
use crate::error::{EvalError, Result};
use crate::text;
use anyhow::Context;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

/// Names of the columns the core needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub notes: String,
    pub year: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            notes: "NOTES".to_string(),
            year: "YEAR".to_string(),
        }
    }
}

/// Untyped tabular input: column names plus string cells
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl EventTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Read a CSV file with a header row
    pub fn read_csv(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open event file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let columns = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Self { columns, rows })
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Locate the note and year columns, failing if either is absent
    pub fn validate(&self, spec: &ColumnSpec) -> Result<(usize, usize)> {
        let missing: Vec<&str> = [spec.notes.as_str(), spec.year.as_str()]
            .into_iter()
            .filter(|name| self.column_index(name).is_none())
            .collect();

        match (self.column_index(&spec.notes), self.column_index(&spec.year)) {
            (Some(notes), Some(year)) => Ok((notes, year)),
            _ => Err(EvalError::schema(format!(
                "dataset must contain '{}' and '{}' columns; missing: {}",
                spec.notes,
                spec.year,
                missing.join(", ")
            ))),
        }
    }
}

/// One conflict event as read from the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub notes: Option<String>,
    pub year: i32,
}

impl RawEvent {
    pub fn new(id: impl Into<String>, notes: Option<&str>, year: i32) -> Self {
        Self {
            id: id.into(),
            notes: notes.map(str::to_string),
            year,
        }
    }
}

/// A categorized event with all derived fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub notes: Option<String>,
    pub year: i32,
    pub boko_haram: bool,
    pub normalized_text: String,
    pub category: Category,
    /// Set once the run's label encoding exists
    pub category_index: Option<usize>,
}

impl EventRecord {
    /// Derive normalized text, category and the Boko Haram flag
    pub fn from_raw(event: &RawEvent, rules: &CategoryRuleSet) -> Self {
        let notes = event.notes.as_deref();
        let normalized_text = text::normalize(notes);
        let category = rules.categorize(&normalized_text);

        Self {
            id: event.id.clone(),
            notes: event.notes.clone(),
            year: event.year,
            boko_haram: text::mentions_boko_haram(notes),
            normalized_text,
            category,
            category_index: None,
        }
    }
}

/// Anything carrying an event year
pub trait YearStamped {
    fn year(&self) -> i32;
}

impl YearStamped for RawEvent {
    fn year(&self) -> i32 {
        self.year
    }
}

impl YearStamped for EventRecord {
    fn year(&self) -> i32 {
        self.year
    }
}

/// Keep records whose year is allowed, in input order
pub fn filter_by_year<T: YearStamped + Clone>(records: &[T], allowed: &BTreeSet<i32>) -> Vec<T> {
    records
        .iter()
        .filter(|r| allowed.contains(&r.year()))
        .cloned()
        .collect()
}

/// Categorize every event
pub fn categorize_events(events: &[RawEvent], rules: &CategoryRuleSet) -> Vec<EventRecord> {
    events.iter().map(|e| EventRecord::from_raw(e, rules)).collect()
}

/// Fill `category_index` from the shared encoder
pub fn assign_indices(records: &mut [EventRecord], encoder: &LabelEncoder) -> Result<()> {
    for record in records.iter_mut() {
        let index = encoder.encode(record.category).ok_or_else(|| {
            EvalError::invalid_config(format!(
                "record '{}' has category '{}' missing from the label encoding",
                record.id, record.category
            ))
        })?;
        record.category_index = Some(index);
    }
    Ok(())
}

/// Write categorized events as CSV
///
/// Columns: id, year, notes, category, category_index, keyword,
/// boko_haram, normalized_text. `keyword` is the rule keyword that fired
/// under `rules`; it and `category_index` are blank when absent.
pub fn write_categorized_csv(records: &[EventRecord], rules: &CategoryRuleSet, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record([
        "id",
        "year",
        "notes",
        "category",
        "category_index",
        "keyword",
        "boko_haram",
        "normalized_text",
    ])?;

    for record in records {
        let (_, keyword) = rules.categorize_with_keyword(&record.normalized_text);
        let index = record.category_index.map(|i| i.to_string()).unwrap_or_default();
        writer.write_record([
            record.id.as_str(),
            record.year.to_string().as_str(),
            record.notes.as_deref().unwrap_or(""),
            record.category.as_str(),
            index.as_str(),
            keyword.unwrap_or(""),
            if record.boko_haram { "true" } else { "false" },
            record.normalized_text.as_str(),
        ])?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} categorized events to {}", records.len(), path.display());
    Ok(())
}

/// Category counts in canonical order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub counts: Vec<(Category, usize)>,
    pub boko_haram_mentions: usize,
    pub total: usize,
}

impl CategoryDistribution {
    pub fn count(&self, category: Category) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, n)| *n)
    }
}

/// Count records per category; an empty selection is an error
pub fn category_counts(records: &[EventRecord]) -> Result<CategoryDistribution> {
    if records.is_empty() {
        return Err(EvalError::empty_selection("no events found for the selected years"));
    }

    let counts = Category::ALL
        .into_iter()
        .map(|c| (c, records.iter().filter(|r| r.category == c).count()))
        .collect();

    Ok(CategoryDistribution {
        counts,
        boko_haram_mentions: records.iter().filter(|r| r.boko_haram).count(),
        total: records.len(),
    })
}

/// Disjoint train/test partitions of the encoded records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    /// Positions in the input record slice, in shuffled order
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub train_texts: Vec<String>,
    pub train_labels: Vec<usize>,
    pub test_texts: Vec<String>,
    pub test_labels: Vec<usize>,
}

impl TrainTestSplit {
    /// Build a split from explicit texts and labels (no shuffling)
    pub fn from_parts(
        train_texts: Vec<String>,
        train_labels: Vec<usize>,
        test_texts: Vec<String>,
        test_labels: Vec<usize>,
    ) -> Self {
        let n_train = train_texts.len();
        Self {
            train_indices: (0..n_train).collect(),
            test_indices: (n_train..n_train + test_texts.len()).collect(),
            train_texts,
            train_labels,
            test_texts,
            test_labels,
        }
    }
}

/// Seeded shuffle-and-split; the test partition gets `ceil(n * test_ratio)` records
pub fn train_test_split(records: &[EventRecord], test_ratio: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(EvalError::invalid_config(format!(
            "test ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }

    let labels: Vec<usize> = records
        .iter()
        .map(|r| {
            r.category_index.ok_or_else(|| {
                EvalError::invalid_config(format!("record '{}' has no category index", r.id))
            })
        })
        .collect::<Result<_>>()?;

    let n = records.len();
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(EvalError::empty_selection(format!(
            "{} records cannot be split with test ratio {}",
            n, test_ratio
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let (test_indices, train_indices) = order.split_at(n_test);
    let texts = |idx: &[usize]| -> Vec<String> { idx.iter().map(|&i| records[i].normalized_text.clone()).collect() };
    let targets = |idx: &[usize]| -> Vec<usize> { idx.iter().map(|&i| labels[i]).collect() };

    Ok(TrainTestSplit {
        train_texts: texts(train_indices),
        train_labels: targets(train_indices),
        test_texts: texts(test_indices),
        test_labels: targets(test_indices),
        train_indices: train_indices.to_vec(),
        test_indices: test_indices.to_vec(),
    })
}

/// A loaded set of raw events
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub events: Vec<RawEvent>,
}

impl Dataset {
    /// Convert a table into events after checking the schema
    ///
    /// Blank notes become `None`; rows with an unparseable year are skipped.
    pub fn from_table(name: &str, table: &EventTable, spec: &ColumnSpec) -> Result<Self> {
        let (notes_idx, year_idx) = table.validate(spec)?;
        let mut events = Vec::with_capacity(table.rows.len());

        for (idx, row) in table.rows.iter().enumerate() {
            let raw_year = row.get(year_idx).map(|s| s.trim()).unwrap_or("");
            let Some(year) = parse_year(raw_year) else {
                tracing::warn!("Skipping row {}: unparseable year {:?}", idx, raw_year);
                continue;
            };

            let notes = row
                .get(notes_idx)
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.to_string());

            events.push(RawEvent {
                id: format!("event_{}", idx),
                notes,
                year,
            });
        }

        Ok(Self {
            name: name.to_string(),
            events,
        })
    }

    /// Load events from a CSV file
    pub fn load_csv(path: &Path, spec: &ColumnSpec) -> anyhow::Result<Self> {
        let table = EventTable::read_csv(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "events".to_string());
        let dataset = Self::from_table(&name, &table, spec)?;
        tracing::info!("Loaded {} events from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Generate a reproducible synthetic corpus of conflict notes
    pub fn synthetic(size: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let templates: [&[&str]; 6] = [
            &[
                "Gunmen attacked a school and killed a teacher in {}",
                "Insurgents burned the education office in {}",
            ],
            &[
                "Children were wounded in crossfire near {}",
                "Students fled after gunfire erupted in {}",
            ],
            &[
                "Armed men abducted traders on the road to {}",
                "Villagers were taken hostage in {}",
            ],
            &[
                "A bomb exploded at the market in {}",
                "Landmine blast hit a vehicle near {}",
            ],
            &[
                "Troops clashed with militants in {}",
                "Air strike targeted a camp outside {}",
            ],
            &[
                "Protesters gathered peacefully in {}",
                "Looting reported at shops in {}",
            ],
        ];
        let towns = ["Maiduguri", "Damboa", "Gwoza", "Bama", "Konduga", "Monguno"];

        let events = (0..size)
            .map(|i| {
                let group = templates[rng.gen_range(0..templates.len())];
                let template = group[rng.gen_range(0..group.len())];
                let town = towns[rng.gen_range(0..towns.len())];
                let mut note = template.replace("{}", town);
                if rng.gen_bool(0.3) {
                    note = format!("Suspected Boko Haram members involved. {}", note);
                }

                RawEvent {
                    id: format!("synthetic_{}", i),
                    notes: Some(note),
                    year: rng.gen_range(2009..=2020),
                }
            })
            .collect();

        Self {
            name: "synthetic".to_string(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.parse::<i32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|y| y.fract() == 0.0 && y.abs() < i32::MAX as f64)
            .map(|y| y as i32)
    })
}

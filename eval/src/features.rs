// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Bag-of-words feature extraction with a capped vocabulary
//!
//! Tokens are runs of two or more word characters. The vocabulary keeps the
//! `max_features` most frequent terms over the training corpus (ties go to
//! the alphabetically smaller term) and indexes them alphabetically.

use crate::error::{EvalError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern"));

/// How term occurrences become feature values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Raw count times smoothed idf, rows L2-normalized
    TfIdf,
    /// Raw term counts
    Counts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub max_features: usize,
    pub weighting: Weighting,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            weighting: Weighting::TfIdf,
        }
    }
}

/// Sparse row with strictly increasing feature indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn get(&self, feature: usize) -> f64 {
        self.indices
            .binary_search(&feature)
            .map_or(0.0, |pos| self.values[pos])
    }

    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.iter().map(|(i, v)| v * dense[i]).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Row-major sparse document-term matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<SparseVector>,
    pub n_features: usize,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, i: usize) -> &SparseVector {
        &self.rows[i]
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN.find_iter(text).map(|m| m.as_str().to_lowercase())
}

/// Fitted text vectorizer
#[derive(Debug, Clone)]
pub struct TextVectorizer {
    config: VectorizerConfig,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TextVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    /// Learn vocabulary and document frequencies from training documents
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if self.config.max_features == 0 {
            return Err(EvalError::invalid_config("max_features must be positive"));
        }
        if documents.is_empty() {
            return Err(EvalError::empty_selection("cannot fit vectorizer on zero documents"));
        }

        let mut term_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut seen = HashSet::new();
            for token in tokenize(doc) {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.clone()) {
                    *doc_freq.entry(token).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(EvalError::empty_selection("empty vocabulary; documents contain no terms"));
        }

        // BTreeMap iteration is alphabetical, and the sort is stable
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.config.max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n_docs = documents.len() as f64;
        self.idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = kept.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        tracing::debug!("Vectorizer fitted: {} terms from {} documents", self.vocabulary.len(), documents.len());
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Map one document to a sparse row; unknown terms are ignored
    pub fn transform_one(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row = SparseVector {
            indices: counts.keys().copied().collect(),
            values: counts.values().copied().collect(),
        };

        if self.config.weighting == Weighting::TfIdf {
            for (idx, value) in row.indices.iter().zip(row.values.iter_mut()) {
                *value *= self.idf[*idx];
            }
            let norm = row.values.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.values.iter_mut().for_each(|v| *v /= norm);
            }
        }

        row
    }

    pub fn transform(&self, documents: &[String]) -> Result<FeatureMatrix> {
        if !self.is_fitted() {
            return Err(EvalError::invalid_config("vectorizer used before fit"));
        }
        Ok(FeatureMatrix {
            rows: documents.iter().map(|d| self.transform_one(d)).collect(),
            n_features: self.vocabulary.len(),
        })
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<FeatureMatrix> {
        self.fit(documents)?;
        self.transform(documents)
    }
}

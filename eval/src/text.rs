// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Text normalization for conflict event notes
//!
//! Normalization is a total function: missing notes become the empty string.
//! The pass order matters. Short words are dropped before punctuation, so
//! "don't" loses its "t" and then its apostrophe.

use regex::Regex;
use std::sync::LazyLock;

static SHORT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{1,2}\b").expect("short word pattern"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Literal marker for the Boko Haram mention flag
pub const BOKO_HARAM: &str = "Boko Haram";

/// Normalize a raw note into lowercase, punctuation-free, single-spaced text
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let lowered = text.to_lowercase();
    let without_short = SHORT_WORD.replace_all(&lowered, "");
    let without_punct = PUNCTUATION.replace_all(&without_short, "");
    let collapsed = WHITESPACE.replace_all(&without_punct, " ");
    collapsed.trim().to_string()
}

/// True iff the raw note contains "Boko Haram" exactly (case-sensitive)
pub fn mentions_boko_haram(text: Option<&str>) -> bool {
    text.is_some_and(|t| t.contains(BOKO_HARAM))
}

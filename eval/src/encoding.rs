// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Label encoding between categories and contiguous class indices
//!
//! One encoder is built per run from the filtered records and shared by
//! reference with every model, so class indices agree everywhere.

use crate::categorizer::Category;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};

/// Bijection between observed categories and `0..K-1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Observed categories in canonical order; position is the class index
    classes: Vec<Category>,
}

impl LabelEncoder {
    /// Build from the distinct categories in `categories`
    pub fn fit<I>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = Category>,
    {
        let mut classes: Vec<Category> = categories.into_iter().collect();
        classes.sort();
        classes.dedup();

        if classes.is_empty() {
            return Err(EvalError::empty_selection("cannot build label encoding from zero records"));
        }

        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class index for a category, if it was observed
    pub fn encode(&self, category: Category) -> Option<usize> {
        self.classes.binary_search(&category).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_canonically_and_dedups() {
        let encoder = LabelEncoder::fit(vec![
            Category::Other,
            Category::Bombing,
            Category::TeacherOrSchool,
            Category::Bombing,
        ])
        .expect("encoder");

        assert_eq!(
            encoder.classes(),
            &[Category::TeacherOrSchool, Category::Bombing, Category::Other]
        );
        assert_eq!(encoder.len(), 3);
    }

    #[test]
    fn test_encode_matches_class_position() {
        let encoder = LabelEncoder::fit(Category::ALL).expect("encoder");
        for (idx, category) in encoder.classes().iter().enumerate() {
            assert_eq!(encoder.encode(*category), Some(idx));
        }
        assert_eq!(encoder.encode(Category::Other), Some(encoder.len() - 1));
    }

    #[test]
    fn test_unobserved_category() {
        let encoder = LabelEncoder::fit(vec![Category::Kidnapping]).expect("encoder");
        assert_eq!(encoder.encode(Category::Bombing), None);
        assert_eq!(encoder.encode(Category::Kidnapping), Some(0));
    }

    #[test]
    fn test_empty_input() {
        let result = LabelEncoder::fit(Vec::new());
        assert!(matches!(result, Err(EvalError::EmptySelection(_))));
    }
}

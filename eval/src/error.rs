// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error types for the conflict event evaluation library
//!
//! Dataset-shape errors ([`EvalError::Schema`], [`EvalError::EmptySelection`])
//! abort a run before any model work begins. [`EvalError::ModelFit`] is local
//! to one model and is contained by the evaluation harness.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A required input column is missing
    #[error("Schema error: {0}")]
    Schema(String),

    /// The year filter (or another selection) left no records
    #[error("Empty selection: {0}")]
    EmptySelection(String),

    /// A single model failed to fit or predict
    #[error("Model '{model}' failed: {reason}")]
    ModelFit { model: String, reason: String },

    /// Caller-supplied configuration is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EvalError {
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        EvalError::Schema(msg.into())
    }

    pub fn empty_selection<S: Into<String>>(msg: S) -> Self {
        EvalError::EmptySelection(msg.into())
    }

    pub fn model_fit<M: Into<String>, R: Into<String>>(model: M, reason: R) -> Self {
        EvalError::ModelFit {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        EvalError::InvalidConfig(msg.into())
    }

    /// Whether the error is contained to a single model
    pub fn is_model_local(&self) -> bool {
        matches!(self, EvalError::ModelFit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::schema("missing column 'NOTES'");
        assert_eq!(err.to_string(), "Schema error: missing column 'NOTES'");

        let err = EvalError::model_fit("Naive Bayes", "empty training set");
        assert_eq!(err.to_string(), "Model 'Naive Bayes' failed: empty training set");
    }

    #[test]
    fn test_model_local() {
        assert!(EvalError::model_fit("x", "y").is_model_local());
        assert!(!EvalError::empty_selection("no rows").is_model_local());
        assert!(!EvalError::invalid_config("ratio").is_model_local());
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Text classification pipelines compared against the keyword labeling
//!
//! Each [`ModelPipeline`] pairs a vectorizer with one classifier and owns all
//! of its fitted state. The factory [`all_baselines`] builds the standard
//! comparison set:
//! - Logistic Regression (TF-IDF)
//! - Support Vector Machine (TF-IDF, linear)
//! - Naive Bayes (term counts)
//! - Gradient Boosting (TF-IDF)
//! - Random Forest (TF-IDF)

use crate::classifiers::{ClassifierConfig, FittedClassifier};
use crate::encoding::LabelEncoder;
use crate::error::{EvalError, Result};
use crate::features::{TextVectorizer, VectorizerConfig, Weighting};
use serde::{Deserialize, Serialize};

/// Serializable description of one pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub vectorizer: VectorizerConfig,
    pub classifier: ClassifierConfig,
}

impl ModelSpec {
    pub fn new(name: &str, vectorizer: VectorizerConfig, classifier: ClassifierConfig) -> Self {
        Self {
            name: name.to_string(),
            vectorizer,
            classifier,
        }
    }

    pub fn build(&self) -> ModelPipeline {
        ModelPipeline::new(&self.name, self.vectorizer.clone(), self.classifier.clone())
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    vectorizer: TextVectorizer,
    classifier: FittedClassifier,
    n_classes: usize,
}

/// A named vectorizer + classifier unit with a fit/predict contract
#[derive(Debug, Clone)]
pub struct ModelPipeline {
    name: String,
    vectorizer: VectorizerConfig,
    classifier: ClassifierConfig,
    fitted: Option<Fitted>,
}

impl ModelPipeline {
    pub fn new(name: &str, vectorizer: VectorizerConfig, classifier: ClassifierConfig) -> Self {
        Self {
            name: name.to_string(),
            vectorizer,
            classifier,
            fitted: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get model description
    pub fn description(&self) -> String {
        let features = match self.vectorizer.weighting {
            Weighting::TfIdf => "TF-IDF",
            Weighting::Counts => "term count",
        };
        format!(
            "{} over {} features (vocabulary cap {})",
            self.classifier.kind(),
            features,
            self.vectorizer.max_features
        )
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fit vectorizer and classifier; labels are class indices of `encoder`
    ///
    /// Any failure is reported as [`EvalError::ModelFit`] for this pipeline
    /// and leaves it unfitted.
    pub fn fit(&mut self, texts: &[String], labels: &[usize], encoder: &LabelEncoder) -> Result<()> {
        self.fitted = None;
        let fitted = self.try_fit(texts, labels, encoder).map_err(|e| self.wrap(e))?;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn try_fit(&self, texts: &[String], labels: &[usize], encoder: &LabelEncoder) -> Result<Fitted> {
        if texts.len() != labels.len() {
            return Err(EvalError::invalid_config(format!(
                "{} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }
        if texts.is_empty() {
            return Err(EvalError::empty_selection("empty training set"));
        }

        let mut vectorizer = TextVectorizer::new(self.vectorizer.clone());
        let x = vectorizer.fit_transform(texts)?;
        let classifier = self.classifier.fit(&x, labels, encoder.len())?;

        Ok(Fitted {
            vectorizer,
            classifier,
            n_classes: encoder.len(),
        })
    }

    /// Predict class indices for `texts`
    pub fn predict(&self, texts: &[String]) -> Result<Vec<usize>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| EvalError::model_fit(&self.name, "predict called before fit"))?;
        let x = fitted.vectorizer.transform(texts).map_err(|e| self.wrap(e))?;
        let predictions = fitted.classifier.predict(&x);
        debug_assert!(predictions.iter().all(|&p| p < fitted.n_classes));
        Ok(predictions)
    }

    fn wrap(&self, err: EvalError) -> EvalError {
        if err.is_model_local() {
            err
        } else {
            EvalError::model_fit(&self.name, err.to_string())
        }
    }
}

/// Standard comparison models with a shared vocabulary cap and seed
pub fn all_baselines(seed: u64, max_features: usize) -> Vec<ModelSpec> {
    let tfidf = VectorizerConfig {
        max_features,
        weighting: Weighting::TfIdf,
    };
    let counts = VectorizerConfig {
        max_features,
        weighting: Weighting::Counts,
    };

    vec![
        ModelSpec::new("Logistic Regression", tfidf.clone(), ClassifierConfig::logistic_regression()),
        ModelSpec::new("Support Vector Machine", tfidf.clone(), ClassifierConfig::linear_svm(seed)),
        ModelSpec::new("Naive Bayes", counts, ClassifierConfig::naive_bayes()),
        ModelSpec::new("Gradient Boosting", tfidf.clone(), ClassifierConfig::gradient_boosting()),
        ModelSpec::new("Random Forest", tfidf, ClassifierConfig::random_forest(seed)),
    ]
}

/// Select specs by name (case-insensitive); an empty list keeps all
pub fn select_baselines(specs: Vec<ModelSpec>, names: &[String]) -> Result<Vec<ModelSpec>> {
    if names.is_empty() {
        return Ok(specs);
    }

    let unknown: Vec<&String> = names
        .iter()
        .filter(|n| !specs.iter().any(|s| s.name.eq_ignore_ascii_case(n)))
        .collect();
    if !unknown.is_empty() {
        return Err(EvalError::invalid_config(format!("unknown models: {:?}", unknown)));
    }

    Ok(specs
        .into_iter()
        .filter(|s| names.iter().any(|n| s.name.eq_ignore_ascii_case(n)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::Category;

    fn corpus() -> (Vec<String>, Vec<usize>, LabelEncoder) {
        let encoder = LabelEncoder::fit([Category::Kidnapping, Category::Bombing, Category::Other]).expect("encoder");
        let kidnapping = encoder.encode(Category::Kidnapping).expect("kidnapping");
        let bombing = encoder.encode(Category::Bombing).expect("bombing");
        let other = encoder.encode(Category::Other).expect("other");

        let texts = [
            ("gunmen abducted traders road", kidnapping),
            ("villagers taken hostage overnight", kidnapping),
            ("armed men abducted farmers", kidnapping),
            ("bomb exploded crowded market", bombing),
            ("landmine blast destroyed vehicle", bombing),
            ("explosive device found market", bombing),
            ("protesters gathered peacefully", other),
            ("looting reported shops", other),
            ("curfew imposed town", other),
        ];
        (
            texts.iter().map(|(t, _)| t.to_string()).collect(),
            texts.iter().map(|(_, l)| *l).collect(),
            encoder,
        )
    }

    #[test]
    fn test_all_baselines() {
        let specs = all_baselines(42, 5000);
        assert_eq!(specs.len(), 5);

        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Logistic Regression",
                "Support Vector Machine",
                "Naive Bayes",
                "Gradient Boosting",
                "Random Forest"
            ]
        );
        assert_eq!(specs[2].vectorizer.weighting, Weighting::Counts);
        assert!(specs.iter().all(|s| s.vectorizer.max_features == 5000));
    }

    #[test]
    fn test_pipelines_fit_and_predict() {
        let (texts, labels, encoder) = corpus();
        for spec in all_baselines(42, 100) {
            let mut model = spec.build();
            model.fit(&texts, &labels, &encoder).expect("fit");
            assert!(model.is_fitted());

            let predictions = model.predict(&texts).expect("predict");
            assert_eq!(predictions.len(), texts.len());
            assert!(predictions.iter().all(|&p| p < encoder.len()));
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = all_baselines(1, 10)[0].build();
        let err = model.predict(&["bomb".to_string()]).unwrap_err();
        assert!(matches!(err, EvalError::ModelFit { .. }));
    }

    #[test]
    fn test_fit_failures_are_model_errors() {
        let (texts, labels, encoder) = corpus();
        let mut model = all_baselines(1, 10)[0].build();

        let err = model.fit(&[], &[], &encoder).unwrap_err();
        assert_eq!(
            err,
            EvalError::model_fit("Logistic Regression", "Empty selection: empty training set")
        );
        assert!(!model.is_fitted());

        let bad_labels: Vec<usize> = labels.iter().map(|l| l + 10).collect();
        assert!(matches!(model.fit(&texts, &bad_labels, &encoder), Err(EvalError::ModelFit { .. })));
    }

    #[test]
    fn test_pipelines_do_not_share_state() {
        let (texts, labels, encoder) = corpus();
        let spec = &all_baselines(42, 100)[2];

        let mut a = spec.build();
        let mut b = spec.build();
        a.fit(&texts, &labels, &encoder).expect("fit a");
        let before = a.predict(&texts).expect("predict");

        // Refit b on a disjoint vocabulary; a must be unaffected
        let other: Vec<String> = texts.iter().map(|t| format!("zz{}", t.replace(' ', " zz"))).collect();
        b.fit(&other, &labels, &encoder).expect("fit b");
        assert_eq!(a.predict(&texts).expect("predict"), before);
    }

    #[test]
    fn test_select_baselines() {
        let specs = all_baselines(1, 10);
        let picked = select_baselines(specs.clone(), &["naive bayes".to_string()]).expect("select");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "Naive Bayes");

        assert_eq!(select_baselines(specs.clone(), &[]).expect("all").len(), 5);
        assert!(select_baselines(specs, &["Perceptron".to_string()]).is_err());
    }
}

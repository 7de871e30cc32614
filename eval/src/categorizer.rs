// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Keyword rule-based event categorization
//!
//! Rules are evaluated in order and the first category with any keyword
//! occurring as a substring wins. Matching is plain substring search, so
//! "kid" also fires inside "kidney".

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Semantic category of a conflict event
///
/// Declaration order is the canonical order used for rule precedence,
/// label encoding and comparison table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Teacher_or_School")]
    TeacherOrSchool,
    #[serde(rename = "Children_and_Student")]
    ChildrenAndStudent,
    Kidnapping,
    Bombing,
    #[serde(rename = "Strike_and_Clash")]
    StrikeAndClash,
    Other,
}

impl Category {
    /// All categories in canonical order
    pub const ALL: [Category; 6] = [
        Category::TeacherOrSchool,
        Category::ChildrenAndStudent,
        Category::Kidnapping,
        Category::Bombing,
        Category::StrikeAndClash,
        Category::Other,
    ];

    /// Stable identifier, e.g. `Teacher_or_School`
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TeacherOrSchool => "Teacher_or_School",
            Category::ChildrenAndStudent => "Children_and_Student",
            Category::Kidnapping => "Kidnapping",
            Category::Bombing => "Bombing",
            Category::StrikeAndClash => "Strike_and_Clash",
            Category::Other => "Other",
        }
    }

    /// Human-readable name, e.g. `Teacher or School`
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::TeacherOrSchool => "Teacher or School",
            Category::ChildrenAndStudent => "Children and Student",
            Category::Kidnapping => "Kidnapping",
            Category::Bombing => "Bombing",
            Category::StrikeAndClash => "Strike and Clash",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EvalError;

    /// Accepts either the identifier or the display name, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| {
                c.as_str().eq_ignore_ascii_case(wanted) || c.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| EvalError::invalid_config(format!("unknown category '{}'", s)))
    }
}

/// One entry of the ordered rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Whether any keyword occurs in the (already lowercased) text
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|kw| text.contains(kw.as_str()))
    }
}

/// Ordered keyword rules; position in the sequence is precedence
///
/// Deserialization goes through [`CategoryRuleSet::new`], so rules read from
/// a config file are lowercased and validated like hand-built ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CategoryRule>", into = "Vec<CategoryRule>")]
pub struct CategoryRuleSet {
    rules: Vec<CategoryRule>,
}

impl TryFrom<Vec<CategoryRule>> for CategoryRuleSet {
    type Error = EvalError;

    fn try_from(rules: Vec<CategoryRule>) -> Result<Self> {
        Self::new(rules)
    }
}

impl From<CategoryRuleSet> for Vec<CategoryRule> {
    fn from(set: CategoryRuleSet) -> Self {
        set.rules
    }
}

impl Default for CategoryRuleSet {
    fn default() -> Self {
        Self {
            rules: vec![
                CategoryRule::new(Category::TeacherOrSchool, &["teacher", "school", "education", "academic"]),
                CategoryRule::new(Category::ChildrenAndStudent, &["children", "student", "kid", "pupil"]),
                CategoryRule::new(Category::Kidnapping, &["kidnapping", "abduct", "hostage"]),
                CategoryRule::new(Category::Bombing, &["bombing", "bomb", "explosive", "landmine", "ied"]),
                CategoryRule::new(Category::StrikeAndClash, &["strike", "clash", "conflict", "fight", "attack"]),
            ],
        }
    }
}

impl CategoryRuleSet {
    /// Build a rule set from an explicit ordered list
    ///
    /// `Other` is the fallback and cannot carry keywords; each category may
    /// appear at most once.
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self> {
        let set = Self {
            rules: rules
                .into_iter()
                .map(|r| CategoryRule {
                    category: r.category,
                    keywords: r.keywords.iter().map(|k| k.to_lowercase()).collect(),
                })
                .collect(),
        };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.category == Category::Other {
                return Err(EvalError::invalid_config(
                    "'Other' is the fallback category and cannot have rules",
                ));
            }
            if !seen.insert(rule.category) {
                return Err(EvalError::invalid_config(format!(
                    "category '{}' appears more than once in the rule set",
                    rule.category
                )));
            }
            if rule.keywords.iter().any(|k| k.is_empty()) {
                return Err(EvalError::invalid_config(format!(
                    "category '{}' has an empty keyword",
                    rule.category
                )));
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Assign exactly one category; first matching rule wins, else `Other`
    pub fn categorize(&self, text: &str) -> Category {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&text))
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }

    /// Like [`categorize`](Self::categorize), also reporting the keyword that fired
    pub fn categorize_with_keyword(&self, text: &str) -> (Category, Option<&str>) {
        let text = text.to_lowercase();
        for rule in &self.rules {
            if let Some(kw) = rule.keywords.iter().find(|kw| text.contains(kw.as_str())) {
                return (rule.category, Some(kw.as_str()));
            }
        }
        (Category::Other, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let rules = CategoryRuleSet::default();
        // "strike" also matches, but children-and-student precedes it
        assert_eq!(
            rules.categorize("children playing near strike zone"),
            Category::ChildrenAndStudent
        );
        assert_eq!(rules.categorize("school bombing"), Category::TeacherOrSchool);
        assert_eq!(rules.categorize("hostage taken after bomb blast"), Category::Kidnapping);
    }

    #[test]
    fn test_single_category_matches() {
        let rules = CategoryRuleSet::default();
        assert_eq!(rules.categorize("teacher shot dead"), Category::TeacherOrSchool);
        assert_eq!(rules.categorize("pupils fled the village"), Category::ChildrenAndStudent);
        assert_eq!(rules.categorize("gunmen abducted traders"), Category::Kidnapping);
        assert_eq!(rules.categorize("landmine exploded road"), Category::Bombing);
        assert_eq!(rules.categorize("armed clash between herders"), Category::StrikeAndClash);
    }

    #[test]
    fn test_no_match_is_other() {
        let rules = CategoryRuleSet::default();
        assert_eq!(rules.categorize("calm market day"), Category::Other);
        assert_eq!(rules.categorize(""), Category::Other);
    }

    #[test]
    fn test_substring_false_positive_preserved() {
        let rules = CategoryRuleSet::default();
        assert_eq!(rules.categorize("kidney clinic opened"), Category::ChildrenAndStudent);
        // "ied" inside "died"
        assert_eq!(rules.categorize("two died hospital"), Category::Bombing);
    }

    #[test]
    fn test_case_insensitive() {
        let rules = CategoryRuleSet::default();
        assert_eq!(rules.categorize("BOMB found"), Category::Bombing);
    }

    #[test]
    fn test_categorize_with_keyword() {
        let rules = CategoryRuleSet::default();
        assert_eq!(
            rules.categorize_with_keyword("troops repelled attack"),
            (Category::StrikeAndClash, Some("attack"))
        );
        assert_eq!(rules.categorize_with_keyword("quiet night"), (Category::Other, None));
    }

    #[test]
    fn test_custom_rule_order() {
        let rules = CategoryRuleSet::new(vec![
            CategoryRule::new(Category::StrikeAndClash, &["strike"]),
            CategoryRule::new(Category::ChildrenAndStudent, &["Children"]),
        ])
        .expect("valid rules");
        assert_eq!(
            rules.categorize("children playing near strike zone"),
            Category::StrikeAndClash
        );
    }

    #[test]
    fn test_invalid_rule_sets() {
        let other = CategoryRuleSet::new(vec![CategoryRule::new(Category::Other, &["x"])]);
        assert!(matches!(other, Err(EvalError::InvalidConfig(_))));

        let dup = CategoryRuleSet::new(vec![
            CategoryRule::new(Category::Bombing, &["bomb"]),
            CategoryRule::new(Category::Bombing, &["ied"]),
        ]);
        assert!(matches!(dup, Err(EvalError::InvalidConfig(_))));
    }

    #[test]
    fn test_category_parse_and_order() {
        assert_eq!("Teacher or School".parse::<Category>(), Ok(Category::TeacherOrSchool));
        assert_eq!("strike_and_clash".parse::<Category>(), Ok(Category::StrikeAndClash));
        assert!("Weather".parse::<Category>().is_err());

        let mut sorted = Category::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Category::ALL.to_vec());
    }

    #[test]
    fn test_rule_set_serde_keeps_order() {
        let rules = CategoryRuleSet::default();
        let json = serde_json::to_string(&rules).expect("serialize");
        assert!(json.starts_with("[{\"category\":\"Teacher_or_School\""));
        let back: CategoryRuleSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, rules);
    }

    #[test]
    fn test_deserialized_keywords_are_lowercased() {
        let rules: CategoryRuleSet =
            serde_json::from_str(r#"[{"category":"Bombing","keywords":["Bomb","IED"]}]"#).expect("deserialize");

        assert_eq!(rules.rules()[0].keywords, vec!["bomb".to_string(), "ied".to_string()]);
        assert_eq!(rules.categorize("bomb blast near market"), Category::Bombing);
        assert_eq!(rules.categorize("IED found"), Category::Bombing);
    }

    #[test]
    fn test_deserialization_validates_rules() {
        let other = serde_json::from_str::<CategoryRuleSet>(r#"[{"category":"Other","keywords":["x"]}]"#);
        assert!(other.is_err());

        let duplicate = serde_json::from_str::<CategoryRuleSet>(
            r#"[{"category":"Bombing","keywords":["bomb"]},{"category":"Bombing","keywords":["ied"]}]"#,
        );
        assert!(duplicate.is_err());

        let empty = serde_json::from_str::<CategoryRuleSet>(r#"[{"category":"Kidnapping","keywords":[""]}]"#);
        assert!(empty.is_err());
    }
}

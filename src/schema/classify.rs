use regex::Regex;
use std::collections::BTreeSet;

use super::SqlType;
use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};

/// Name-based column classification.
///
/// Exact names win over patterns, and Integer is always checked before Real.
/// Anything that matches nothing is Text.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    integer: BTreeSet<String>,
    real: BTreeSet<String>,
    integer_patterns: Vec<Regex>,
    real_patterns: Vec<Regex>,
}

impl Classifier {
    pub fn new(integer: BTreeSet<String>, real: BTreeSet<String>) -> Self {
        Self {
            integer,
            real,
            ..Self::default()
        }
    }

    pub fn from_config(cfg: &LoaderConfig) -> Result<Self> {
        Ok(Self {
            integer: cfg.integer_columns.clone(),
            real: cfg.real_columns.clone(),
            integer_patterns: compile_all(&cfg.integer_patterns)?,
            real_patterns: compile_all(&cfg.real_patterns)?,
        })
    }

    pub fn classify(&self, name: &str) -> SqlType {
        if self.integer.contains(name) {
            SqlType::Integer
        } else if self.real.contains(name) {
            SqlType::Real
        } else if self.integer_patterns.iter().any(|re| re.is_match(name)) {
            SqlType::Integer
        } else if self.real_patterns.iter().any(|re| re.is_match(name)) {
            SqlType::Real
        } else {
            SqlType::Text
        }
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| LoadError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_is_verbatim() {
        let c = Classifier::new(set(&["WHEN3_기간(일)"]), set(&["WHEN4_실행률(%)"]));
        assert_eq!(c.classify("WHEN3_기간(일)"), SqlType::Integer);
        assert_eq!(c.classify("WHEN4_실행률(%)"), SqlType::Real);
        // no normalisation of case, whitespace or punctuation
        assert_eq!(c.classify("WHEN3_기간(일) "), SqlType::Text);
        assert_eq!(c.classify("when4_실행률(%)"), SqlType::Text);
        assert_eq!(c.classify(""), SqlType::Text);
    }

    #[test]
    fn integer_set_wins_over_real_set() {
        let c = Classifier::new(set(&["x"]), set(&["x"]));
        assert_eq!(c.classify("x"), SqlType::Integer);
    }

    #[test]
    fn patterns_apply_after_exact_sets() {
        let cfg = LoaderConfig {
            integer_columns: BTreeSet::new(),
            real_columns: set(&["R7_재료비_금액"]),
            integer_patterns: vec![r"^R\d+_.*_금액$".into()],
            real_patterns: vec![r"\(%\)$".into()],
            ..LoaderConfig::default()
        };
        let c = Classifier::from_config(&cfg).unwrap();
        assert_eq!(c.classify("R7_재료비_금액"), SqlType::Real);
        assert_eq!(c.classify("R8_노무비_금액"), SqlType::Integer);
        assert_eq!(c.classify("공정률(%)"), SqlType::Real);
        assert_eq!(c.classify("HOW1_공사"), SqlType::Text);
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let cfg = LoaderConfig {
            real_patterns: vec!["(unclosed".into()],
            ..LoaderConfig::default()
        };
        assert!(matches!(
            Classifier::from_config(&cfg),
            Err(LoadError::InvalidPattern { .. })
        ));
    }
}

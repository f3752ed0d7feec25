//! Naming convention for free (fittable) symbols.

use nom::{bytes::complete::tag, character::complete::digit1, combinator::all_consuming, Parser};
use serde::{Deserialize, Serialize};

/// Predicate over symbol names: one of `prefixes` followed by one or more digits.
///
/// The default accepts `V` or `VV` followed by digits (`V12`, `VV0001`), i.e. the
/// pattern `^VV?[0-9]+$`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPattern {
    pub prefixes: Vec<String>,
}

impl Default for SymbolPattern {
    fn default() -> Self {
        Self {
            prefixes: vec!["VV".to_string(), "V".to_string()],
        }
    }
}

impl SymbolPattern {
    /// Pattern with custom prefixes
    pub fn with_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is a fittable symbol under this convention
    pub fn matches(&self, name: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            all_consuming((tag::<_, _, nom::error::Error<&str>>(prefix.as_str()), digit1))
                .parse(name)
                .is_ok()
        })
    }
}

//! Field-matching record filters.
//!
//! Rules select a value by dotted path (`participants.0.championId`) and keep
//! the record when that value matches any configured candidate.

use serde_json::Value;
use thiserror::Error;

use crate::domain::Record;
use crate::domain::ports::RecordFilter;

/// How a field value is compared with the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Value must equal a candidate (season-style matching).
    Exact,
    /// Value must contain a candidate (patch-style matching, `6.3` in `6.3.128`).
    Contains,
}

/// Keeps records whose field matches one of a set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatchFilter {
    path: Vec<String>,
    candidates: Vec<String>,
    mode: MatchMode,
}

/// Errors raised while parsing filter rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterRuleError {
    /// Rule lacks both `=` and `~`.
    #[error("filter rule `{rule}` must use field=a|b or field~a|b")]
    MissingOperator {
        /// Raw rule.
        rule: String,
    },
    /// Field path was blank or had an empty segment.
    #[error("filter rule `{rule}` has an empty field path")]
    EmptyField {
        /// Raw rule.
        rule: String,
    },
    /// No candidate values were given.
    #[error("filter rule `{rule}` lists no values")]
    NoValues {
        /// Raw rule.
        rule: String,
    },
}

impl FieldMatchFilter {
    /// Build a filter from a dotted path, candidates, and a match mode.
    pub fn new(
        path: &str,
        candidates: impl IntoIterator<Item = impl Into<String>>,
        mode: MatchMode,
    ) -> Self {
        Self {
            path: path.split('.').map(str::to_owned).collect(),
            candidates: candidates.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    /// Parse `field=a|b` (exact) or `field~a|b` (contains).
    ///
    /// # Examples
    /// ```
    /// use harvester::domain::{FieldMatchFilter, MatchMode};
    ///
    /// let filter = FieldMatchFilter::parse_rule("matchVersion~6.3|6.4").expect("valid rule");
    /// assert_eq!(filter.mode(), MatchMode::Contains);
    /// ```
    pub fn parse_rule(rule: &str) -> Result<Self, FilterRuleError> {
        let (field, values, mode) = match (rule.find('='), rule.find('~')) {
            (Some(eq), Some(tilde)) if tilde < eq => split_at(rule, tilde, MatchMode::Contains),
            (Some(eq), _) => split_at(rule, eq, MatchMode::Exact),
            (None, Some(tilde)) => split_at(rule, tilde, MatchMode::Contains),
            (None, None) => {
                return Err(FilterRuleError::MissingOperator {
                    rule: rule.to_owned(),
                });
            }
        };

        let field = field.trim();
        if field.is_empty() || field.split('.').any(str::is_empty) {
            return Err(FilterRuleError::EmptyField {
                rule: rule.to_owned(),
            });
        }
        let candidates: Vec<&str> = values
            .split('|')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect();
        if candidates.is_empty() {
            return Err(FilterRuleError::NoValues {
                rule: rule.to_owned(),
            });
        }
        Ok(Self::new(field, candidates, mode))
    }

    /// Comparison mode.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().any(|item| self.matches(item)),
            Value::Null | Value::Object(_) => false,
            scalar => {
                let text = scalar_text(scalar);
                self.candidates.iter().any(|candidate| match self.mode {
                    MatchMode::Exact => text == *candidate,
                    MatchMode::Contains => text.contains(candidate.as_str()),
                })
            }
        }
    }
}

fn split_at(rule: &str, index: usize, mode: MatchMode) -> (&str, &str, MatchMode) {
    let (field, rest) = rule.split_at(index);
    (field, rest.get(1..).unwrap_or_default(), mode)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Resolve a dotted path; numeric segments index into arrays.
pub(crate) fn lookup<'a>(record: &'a Record, path: &[String]) -> Option<&'a Value> {
    let (head, rest) = path.split_first()?;
    rest.iter().try_fold(record.get(head)?, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

impl RecordFilter for FieldMatchFilter {
    fn accepts(&self, record: &Record) -> bool {
        lookup(record, &self.path).is_some_and(|value| self.matches(value))
    }
}

#[cfg(test)]
mod tests {
    //! Rule parsing and matching behaviour.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    #[case("season=PRESEASON2016|SEASON2016", json!({"season": "SEASON2016"}), true)]
    #[case("season=SEASON2016", json!({"season": "SEASON2016X"}), false)]
    #[case("matchVersion~6.3", json!({"matchVersion": "6.3.128.1"}), true)]
    #[case("matchVersion~6.3", json!({"matchVersion": "6.4.1"}), false)]
    #[case("queueType=RANKED_SOLO_5x5", json!({"mode": "CLASSIC"}), false)]
    #[case("mapId=11", json!({"mapId": 11}), true)]
    #[case("participants.1.championId=99", json!({"participants": [{"championId": 1}, {"championId": 99}]}), true)]
    #[case("tags=ranked", json!({"tags": ["normal", "ranked"]}), true)]
    fn rules_match_records(#[case] rule: &str, #[case] value: Value, #[case] expected: bool) {
        let filter = FieldMatchFilter::parse_rule(rule).expect("valid rule");
        assert_eq!(filter.accepts(&record(value)), expected);
    }

    #[rstest]
    #[case("season", FilterRuleError::MissingOperator { rule: "season".to_owned() })]
    #[case("=a", FilterRuleError::EmptyField { rule: "=a".to_owned() })]
    #[case("a..b=c", FilterRuleError::EmptyField { rule: "a..b=c".to_owned() })]
    #[case("season=| ", FilterRuleError::NoValues { rule: "season=| ".to_owned() })]
    fn malformed_rules_are_rejected(#[case] rule: &str, #[case] expected: FilterRuleError) {
        assert_eq!(FieldMatchFilter::parse_rule(rule), Err(expected));
    }

    #[rstest]
    fn first_operator_wins() {
        let filter = FieldMatchFilter::parse_rule("version~a=b").expect("valid rule");
        assert_eq!(filter.mode(), MatchMode::Contains);
        assert!(filter.accepts(&record(json!({"version": "xa=by"}))));
    }
}

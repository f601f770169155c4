//! Endpoint identifiers, typed argument values, and fetched records.
//!
//! An [`ArgumentSet`] is the named parameter table for one request attempt.
//! Callers build one up front; once it is handed to a
//! [`Sequencer`](crate::domain::Sequencer) only the sequencer mutates its copy.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON object payload returned by a successful fetch.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifier selecting which URL template and parameter contract apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointId(String);

impl EndpointId {
    /// Build an identifier from user input, trimming surrounding whitespace.
    ///
    /// # Examples
    /// ```
    /// use harvester::domain::EndpointId;
    ///
    /// let id = EndpointId::new(" match ").expect("valid endpoint");
    /// assert_eq!(id.as_str(), "match");
    /// assert!(EndpointId::new("   ").is_err());
    /// ```
    pub fn new(value: impl AsRef<str>) -> Result<Self, EndpointIdError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EndpointIdError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for EndpointId {
    type Error = EndpointIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EndpointId> for String {
    fn from(value: EndpointId) -> Self {
        value.0
    }
}

/// Validation errors returned when constructing [`EndpointId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointIdError {
    /// Identifier is empty after trimming whitespace.
    #[error("endpoint identifier must not be empty")]
    Empty,
}

/// One typed request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    /// Numeric parameter; the only kind the incrementing progression steps.
    Integer(i64),
    /// Boolean parameter.
    Flag(bool),
    /// Free-form text parameter.
    Text(String),
}

impl ArgumentValue {
    /// Infer the type of a literal: integers first, then `true`/`false`,
    /// otherwise text.
    ///
    /// # Examples
    /// ```
    /// use harvester::domain::ArgumentValue;
    ///
    /// assert_eq!(ArgumentValue::parse("42"), ArgumentValue::Integer(42));
    /// assert_eq!(ArgumentValue::parse("true"), ArgumentValue::Flag(true));
    /// assert_eq!(
    ///     ArgumentValue::parse("RANKED_SOLO_5x5"),
    ///     ArgumentValue::Text("RANKED_SOLO_5x5".to_owned()),
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        if let Ok(number) = raw.parse::<i64>() {
            return Self::Integer(number);
        }
        match raw {
            "true" => Self::Flag(true),
            "false" => Self::Flag(false),
            other => Self::Text(other.to_owned()),
        }
    }

    /// Return the integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Flag(_) | Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Flag(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Named parameter values for one request attempt, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentSet(BTreeMap<String, ArgumentValue>);

impl ArgumentSet {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of `self` with `name` bound to `value`.
    ///
    /// # Examples
    /// ```
    /// use harvester::domain::{ArgumentSet, ArgumentValue};
    ///
    /// let args = ArgumentSet::new().with("matchId", 1_i64).with("region", "euw");
    /// assert_eq!(args.get("matchId"), Some(&ArgumentValue::Integer(1)));
    /// assert_eq!(args.len(), 2);
    /// ```
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgumentValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgumentValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a parameter value.
    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.0.get(name)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgumentValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameters are bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse one `name=value` assignment.
    ///
    /// # Examples
    /// ```
    /// use harvester::domain::{ArgumentSet, ArgumentValue};
    ///
    /// let (name, value) = ArgumentSet::parse_assignment("matchId=2000").expect("valid");
    /// assert_eq!(name, "matchId");
    /// assert_eq!(value, ArgumentValue::Integer(2000));
    /// ```
    pub fn parse_assignment(raw: &str) -> Result<(String, ArgumentValue), ArgumentParseError> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| ArgumentParseError::MissingSeparator {
                input: raw.to_owned(),
            })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ArgumentParseError::EmptyName {
                input: raw.to_owned(),
            });
        }
        Ok((name.to_owned(), ArgumentValue::parse(value.trim())))
    }

    /// Copy with every integer parameter increased by one.
    ///
    /// Returns `None` when any integer would overflow `i64`.
    pub(crate) fn incremented(&self) -> Option<Self> {
        let mut next = self.clone();
        for value in next.0.values_mut() {
            if let ArgumentValue::Integer(number) = value {
                *number = number.checked_add(1)?;
            }
        }
        Some(next)
    }
}

impl<K, V> FromIterator<(K, V)> for ArgumentSet
where
    K: Into<String>,
    V: Into<ArgumentValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl fmt::Display for ArgumentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors raised while parsing `name=value` assignments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentParseError {
    /// Input had no `=` separator.
    #[error("argument `{input}` must use the form name=value")]
    MissingSeparator {
        /// Raw input.
        input: String,
    },
    /// Parameter name was blank.
    #[error("argument `{input}` has an empty name")]
    EmptyName {
        /// Raw input.
        input: String,
    },
}

#[cfg(test)]
mod tests {
    //! Covers literal inference, assignment parsing, and numeric stepping.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", ArgumentValue::Integer(0))]
    #[case("-17", ArgumentValue::Integer(-17))]
    #[case("false", ArgumentValue::Flag(false))]
    #[case("True", ArgumentValue::Text("True".to_owned()))]
    #[case("7.5", ArgumentValue::Text("7.5".to_owned()))]
    #[case("", ArgumentValue::Text(String::new()))]
    fn parse_infers_literal_type(#[case] raw: &str, #[case] expected: ArgumentValue) {
        assert_eq!(ArgumentValue::parse(raw), expected);
    }

    #[rstest]
    #[case("noseparator", ArgumentParseError::MissingSeparator { input: "noseparator".to_owned() })]
    #[case(" =5", ArgumentParseError::EmptyName { input: " =5".to_owned() })]
    fn parse_assignment_rejects_malformed_input(
        #[case] raw: &str,
        #[case] expected: ArgumentParseError,
    ) {
        let err = ArgumentSet::parse_assignment(raw).expect_err("malformed assignment");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn parse_assignment_keeps_equals_in_value() {
        let (name, value) = ArgumentSet::parse_assignment("query=a=b").expect("valid");
        assert_eq!(name, "query");
        assert_eq!(value, ArgumentValue::Text("a=b".to_owned()));
    }

    #[rstest]
    fn incremented_only_touches_integers() {
        let args = ArgumentSet::new()
            .with("matchId", 10_i64)
            .with("ranked", true)
            .with("queue", "solo")
            .incremented()
            .expect("no overflow");
        assert_eq!(args.get("matchId"), Some(&ArgumentValue::Integer(11)));
        assert_eq!(args.get("ranked"), Some(&ArgumentValue::Flag(true)));
        assert_eq!(args.get("queue"), Some(&ArgumentValue::from("solo")));
    }

    #[rstest]
    fn incremented_reports_overflow() {
        let args = ArgumentSet::new().with("a", 1_i64).with("n", i64::MAX);
        assert_eq!(args.incremented(), None);
    }

    #[rstest]
    fn display_joins_pairs_in_name_order() {
        let args = ArgumentSet::new().with("b", 2_i64).with("a", "x");
        assert_eq!(args.to_string(), "a=x,b=2");
    }

    #[rstest]
    fn endpoint_id_rejects_blank() {
        assert_eq!(EndpointId::new(""), Err(EndpointIdError::Empty));
    }

    #[rstest]
    fn endpoint_id_round_trips_through_serde() {
        let id: EndpointId = serde_json::from_str("\"champion\"").expect("valid id");
        assert_eq!(id.as_str(), "champion");
        let err = serde_json::from_str::<EndpointId>("\"  \"");
        assert!(err.is_err());
    }
}

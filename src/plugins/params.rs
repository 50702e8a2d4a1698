//! Parameter bags passed to plugin operations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A single parameter value
///
/// Objects are not representable; structured input has to be flattened into
/// named parameters by the operation's call spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `true` / `false`
    Bool(bool),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Text
    String(String),
    /// Sequence of values
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Convert a JSON value, returning `None` for objects and `null`
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Number)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Convert back into JSON
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Number(n) => Value::from(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Borrow as text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a whole number
    ///
    /// Floats with no fractional part count, since JSON clients often send
    /// `3.0` for `3`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Some(*n as i64),
            _ => None,
        }
    }

    /// Read as a floating point number
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Read as a boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as a list
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<Self>> for ParamValue {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

/// Named parameters for one invocation
///
/// Accessors named `require_*` turn a missing or mistyped parameter into a
/// validation error, so plugin bodies can use `?` on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Create an empty parameter bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter (builder style)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a parameter
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Whether a parameter is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Text parameter, if present and a string
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// Whole-number parameter, if present and numeric
    #[must_use]
    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_i64)
    }

    /// Boolean parameter, falling back to `default`
    #[must_use]
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(ParamValue::as_bool).unwrap_or(default)
    }

    /// Required text parameter
    ///
    /// # Errors
    ///
    /// Returns a validation error if the parameter is missing or not a string
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| wrong_type(name, "a string"))
    }

    /// Required whole-number parameter
    ///
    /// # Errors
    ///
    /// Returns a validation error if the parameter is missing or not an integer
    pub fn require_i64(&self, name: &str) -> Result<i64> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| wrong_type(name, "an integer"))
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.get(name)
            .ok_or_else(|| Error::Validation(format!("missing required parameter: {name}")))
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn wrong_type(name: &str, expected: &str) -> Error {
    Error::Validation(format!("parameter `{name}` must be {expected}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn converts_json_scalars_and_lists() {
        assert_eq!(ParamValue::from_json(&json!(true)), Some(ParamValue::Bool(true)));
        assert_eq!(ParamValue::from_json(&json!(3)), Some(ParamValue::Integer(3)));
        assert_eq!(ParamValue::from_json(&json!(2.5)), Some(ParamValue::Number(2.5)));
        assert_eq!(
            ParamValue::from_json(&json!(["a", 1])),
            Some(ParamValue::List(vec!["a".into(), 1i64.into()]))
        );
    }

    #[test]
    fn rejects_objects_and_null() {
        assert_eq!(ParamValue::from_json(&json!({"a": 1})), None);
        assert_eq!(ParamValue::from_json(&json!(null)), None);
        assert_eq!(ParamValue::from_json(&json!([{"a": 1}])), None);
    }

    #[test]
    fn integral_floats_read_as_integers() {
        assert_eq!(ParamValue::Number(3.0).as_i64(), Some(3));
        assert_eq!(ParamValue::Number(3.5).as_i64(), None);
        assert_eq!(ParamValue::Integer(4).as_f64(), Some(4.0));
    }

    #[test]
    fn require_reports_missing_and_mistyped() {
        let params = Params::new().with("query", "rust").with("n", true);

        assert_eq!(params.require_str("query").unwrap(), "rust");

        let missing = params.require_str("url").unwrap_err();
        assert_eq!(missing.to_string(), "missing required parameter: url");

        let mistyped = params.require_i64("n").unwrap_err();
        assert!(mistyped.to_string().contains("must be an integer"));
    }

    #[test]
    fn bool_or_falls_back() {
        let params = Params::new().with("use_flux", true);
        assert!(params.bool_or("use_flux", false));
        assert!(!params.bool_or("other", false));
    }

    #[test]
    fn serializes_as_plain_object() {
        let params = Params::new().with("query", "x").with("results_num", 2i64);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, json!({"query": "x", "results_num": 2}));
    }
}

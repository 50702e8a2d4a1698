//! Call specs: the JSON-schema description of each plugin operation
//!
//! Specs are what the host hands to its function-calling model, and they are
//! also what the dispatcher validates incoming arguments against.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::params::{ParamValue, Params};
use crate::{Error, Result};

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Text
    String,
    /// Whole number
    Integer,
    /// Any number (integers accepted)
    Number,
    /// `true` / `false`
    Boolean,
    /// List of values
    Array,
}

impl ParamType {
    /// JSON-schema type name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    /// Whether `value` conforms to this type
    #[must_use]
    pub fn accepts(self, value: &ParamValue) -> bool {
        match self {
            Self::String => value.as_str().is_some(),
            Self::Integer => value.as_i64().is_some(),
            Self::Number => value.as_f64().is_some(),
            Self::Boolean => value.as_bool().is_some(),
            Self::Array => value.as_list().is_some(),
        }
    }
}

/// Declaration of one named parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Declared type
    pub kind: ParamType,
    /// Element type, for arrays
    pub items: Option<ParamType>,
    /// Description shown to the caller
    pub description: String,
    /// Whether the caller must supply it
    pub required: bool,
    /// Value used when the caller omits it
    pub default: Option<ParamValue>,
    /// Allowed values (empty means unrestricted)
    pub allowed: Vec<String>,
}

impl ParamSpec {
    fn new(kind: ParamType, description: &str) -> Self {
        Self {
            kind,
            items: None,
            description: description.to_string(),
            required: false,
            default: None,
            allowed: Vec::new(),
        }
    }

    /// Text parameter
    #[must_use]
    pub fn string(description: &str) -> Self {
        Self::new(ParamType::String, description)
    }

    /// Whole-number parameter
    #[must_use]
    pub fn integer(description: &str) -> Self {
        Self::new(ParamType::Integer, description)
    }

    /// Numeric parameter
    #[must_use]
    pub fn number(description: &str) -> Self {
        Self::new(ParamType::Number, description)
    }

    /// Boolean parameter
    #[must_use]
    pub fn boolean(description: &str) -> Self {
        Self::new(ParamType::Boolean, description)
    }

    /// List parameter whose elements are `items`
    #[must_use]
    pub fn array(items: ParamType, description: &str) -> Self {
        Self {
            items: Some(items),
            ..Self::new(ParamType::Array, description)
        }
    }

    /// Mark as required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the value used when the caller omits the parameter
    #[must_use]
    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict to a fixed set of string values
    #[must_use]
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = values.iter().map(ToString::to_string).collect();
        self
    }

    fn check(&self, name: &str, value: &ParamValue) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(Error::Validation(format!(
                "parameter `{name}` must be of type {}",
                self.kind.as_str()
            )));
        }

        if let (Some(items), Some(list)) = (self.items, value.as_list())
            && !list.iter().all(|item| items.accepts(item))
        {
            return Err(Error::Validation(format!(
                "parameter `{name}` must contain only {} values",
                items.as_str()
            )));
        }

        if !self.allowed.is_empty()
            && !value
                .as_str()
                .is_some_and(|s| self.allowed.iter().any(|a| a == s))
        {
            return Err(Error::Validation(format!(
                "parameter `{name}` must be one of: {}",
                self.allowed.join(", ")
            )));
        }

        Ok(())
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.kind.as_str()));
        schema.insert("description".to_string(), json!(self.description));
        if let Some(items) = self.items {
            schema.insert("items".to_string(), json!({ "type": items.as_str() }));
        }
        if !self.allowed.is_empty() {
            schema.insert("enum".to_string(), json!(self.allowed));
        }
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.to_json());
        }
        Value::Object(schema)
    }
}

/// Declaration of one operation a plugin exposes
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    /// Operation name, unique across all loaded plugins
    pub name: String,
    /// What the operation does, for the caller
    pub description: String,
    /// Parameters in declaration order
    pub parameters: Vec<(String, ParamSpec)>,
}

impl CallSpec {
    /// Operation with no parameters yet
    #[must_use]
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Declare a parameter (builder style)
    #[must_use]
    pub fn param(mut self, name: &str, spec: ParamSpec) -> Self {
        self.parameters.push((name.to_string(), spec));
        self
    }

    /// Look up a declared parameter
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    /// Names of required parameters, in declaration order
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// JSON-schema form: `{name, description, parameters: {type, properties, required}}`
    #[must_use]
    pub fn to_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, spec)| (name.clone(), spec.schema()))
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": self.required().collect::<Vec<_>>(),
            },
        })
    }

    /// Check caller arguments and build the parameter bag
    ///
    /// A required parameter that the caller omits but that has a default is
    /// filled from the default, as are omitted optional ones. `null` counts
    /// as omitted. Undeclared keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing required parameter, a type
    /// mismatch, a value outside the allowed set, or a nested object
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<Params> {
        let mut params = Params::new();

        for (name, spec) in &self.parameters {
            match arguments.get(name).filter(|v| !v.is_null()) {
                Some(raw) => {
                    let value = ParamValue::from_json(raw).ok_or_else(|| {
                        Error::Validation(format!(
                            "parameter `{name}` must be of type {}",
                            spec.kind.as_str()
                        ))
                    })?;
                    spec.check(name, &value)?;
                    params.insert(name.clone(), value);
                }
                None => match &spec.default {
                    Some(default) => params.insert(name.clone(), default.clone()),
                    None if spec.required => {
                        return Err(Error::Validation(format!(
                            "missing required parameter: {name}"
                        )));
                    }
                    None => {}
                },
            }
        }

        for key in arguments.keys().filter(|k| self.parameter(k).is_none()) {
            tracing::debug!(operation = %self.name, parameter = %key, "dropping undeclared parameter");
        }

        Ok(params)
    }
}

impl Serialize for CallSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_schema().serialize(serializer)
    }
}

//! Result envelope returned by every plugin operation
//!
//! On the wire an envelope is a single-key JSON object:
//!
//! ```json
//! {"result": <any>}
//! {"direct_result": {"kind": "photo", "format": "path", "value": "uploads/x.png"}}
//! {"error": "Query is required"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Message returned when no operation matches the requested name
pub const UNKNOWN_FUNCTION: &str = "Unknown function name";

/// Outcome of one plugin operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    /// Data for the caller to render or reason over
    Result(Value),
    /// Artifact(s) to be sent to the user as-is
    DirectResult(DirectResult),
    /// User-presentable failure message
    Error(String),
}

impl Envelope {
    /// Wrap arbitrary JSON data
    pub fn result(value: impl Into<Value>) -> Self {
        Self::Result(value.into())
    }

    /// Artifact envelope
    pub fn direct(kind: ArtifactKind, format: ArtifactFormat, value: impl Into<ArtifactValue>) -> Self {
        Self::DirectResult(DirectResult {
            kind,
            format,
            value: value.into(),
        })
    }

    /// Failure envelope
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Envelope for an operation name nobody registered
    #[must_use]
    pub fn unknown_function() -> Self {
        Self::Error(UNKNOWN_FUNCTION.to_string())
    }

    /// Whether this is the failure variant
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Failure message, if this is the failure variant
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Wire representation
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("failed to encode result: {e}") })
        })
    }

    /// Parse the wire representation
    ///
    /// # Errors
    ///
    /// Returns error if the text is not exactly one of the three shapes
    pub fn from_wire(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl From<Error> for Envelope {
    fn from(error: Error) -> Self {
        Self::Error(error.to_string())
    }
}

/// Artifact payload of a [`Envelope::DirectResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectResult {
    /// How the artifact is presented
    pub kind: ArtifactKind,
    /// How `value` is interpreted
    pub format: ArtifactFormat,
    /// One or more locations
    pub value: ArtifactValue,
}

/// Presentation of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Inline image
    Photo,
    /// Document attachment (uncompressed)
    Document,
    /// Generic file attachment
    File,
}

impl ArtifactKind {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::File => "file",
        }
    }
}

/// Location format of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Path on the local filesystem, owned by the receiver once returned
    Path,
    /// Remote URL
    Url,
}

/// One location or a list of locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactValue {
    /// Single location
    One(String),
    /// Several locations, delivered in order
    Many(Vec<String>),
}

impl ArtifactValue {
    /// Iterate locations in delivery order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        };
        items.iter().map(String::as_str)
    }

    /// Number of locations
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    /// Whether there are no locations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for ArtifactValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<&str> for ArtifactValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<String>> for ArtifactValue {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn result_wire_shape() {
        let envelope = Envelope::result(json!({"title": "Rust"}));
        assert_eq!(envelope.to_json(), json!({"result": {"title": "Rust"}}));
    }

    #[test]
    fn direct_result_wire_shape() {
        let envelope = Envelope::direct(
            ArtifactKind::Photo,
            ArtifactFormat::Path,
            "uploads/openai_images/abc.png",
        );
        assert_eq!(
            envelope.to_json(),
            json!({"direct_result": {
                "kind": "photo",
                "format": "path",
                "value": "uploads/openai_images/abc.png"
            }})
        );
    }

    #[test]
    fn direct_result_list_value() {
        let envelope = Envelope::direct(
            ArtifactKind::File,
            ArtifactFormat::Url,
            vec!["https://a/1.pdf".to_string(), "https://a/2.pdf".to_string()],
        );
        let json = envelope.to_json();
        assert_eq!(json["direct_result"]["value"], json!(["https://a/1.pdf", "https://a/2.pdf"]));
    }

    #[test]
    fn error_wire_shape() {
        assert_eq!(
            Envelope::unknown_function().to_json(),
            json!({"error": "Unknown function name"})
        );
    }

    #[test]
    fn parses_all_three_shapes() {
        let result = Envelope::from_wire(r#"{"result": "plain text"}"#).unwrap();
        assert_eq!(result, Envelope::result("plain text"));

        let direct = Envelope::from_wire(
            r#"{"direct_result": {"kind": "document", "format": "url", "value": ["u1", "u2"]}}"#,
        )
        .unwrap();
        let Envelope::DirectResult(direct) = direct else {
            panic!("expected direct result");
        };
        assert_eq!(direct.kind, ArtifactKind::Document);
        assert_eq!(direct.value.iter().collect::<Vec<_>>(), ["u1", "u2"]);

        let error = Envelope::from_wire(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(error.error_message(), Some("boom"));
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(Envelope::from_wire(r#"{"status": "ok"}"#).is_err());
        assert!(
            Envelope::from_wire(
                r#"{"direct_result": {"kind": "video", "format": "path", "value": "x"}}"#
            )
            .is_err()
        );
    }

    #[test]
    fn errors_become_error_envelopes() {
        let envelope = Envelope::from(Error::missing_setting("OPENAI_API_KEY"));
        assert_eq!(
            envelope.error_message(),
            Some("configuration error: OPENAI_API_KEY is not set")
        );
    }
}

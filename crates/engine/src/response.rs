//! The response envelope: data, structured errors, and the
//! coarse-grained success classification the transport reports.

use nonempty::NonEmpty;
use serde::Serialize;
use serde_json as json;

use storage_types::{DeadlineExceeded, Name};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Data, no errors.
    Full,
    /// Data and errors both present.
    Partial,
    /// Errors only.
    None,
    /// The deadline fired; no data is ever attached.
    Timeout,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Name>,
    pub message: String,
}

impl FieldError {
    pub fn for_field(field: impl Into<Name>, message: impl Into<String>) -> FieldError {
        FieldError {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<NonEmpty<FieldError>>,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Response {
    /// Folds the executed roots and their collected errors into the
    /// right classification.
    pub fn classify(
        data: Option<json::Value>,
        errors: Vec<FieldError>,
        warnings: Vec<String>,
    ) -> Response {
        let errors = NonEmpty::from_vec(errors);
        let classification = match (&data, &errors) {
            (Some(_), Option::None) => Classification::Full,
            (Some(_), Some(_)) => Classification::Partial,
            (Option::None, _) => Classification::None,
        };
        Response {
            data,
            errors,
            classification,
            warnings,
        }
    }

    /// The fixed-shape timeout body: no data, one error with the
    /// configured budget interpolated.
    pub fn timeout(budget_ms: u64) -> Response {
        Response {
            data: None,
            errors: Some(NonEmpty::new(FieldError {
                field: None,
                message: DeadlineExceeded { budget_ms }.to_string(),
            })),
            classification: Classification::Timeout,
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_data_and_errors() {
        let full = Response::classify(Some(json::json!({})), Vec::new(), Vec::new());
        assert_eq!(full.classification, Classification::Full);

        let partial = Response::classify(
            Some(json::json!({})),
            vec![FieldError::for_field("chats", "nope")],
            Vec::new(),
        );
        assert_eq!(partial.classification, Classification::Partial);

        let none = Response::classify(
            None,
            vec![FieldError::for_field("chats", "nope")],
            Vec::new(),
        );
        assert_eq!(none.classification, Classification::None);
    }

    #[test]
    fn timeout_body_carries_the_budget() {
        let response = Response::timeout(1500);
        assert_eq!(response.classification, Classification::Timeout);
        assert!(response.data.is_none());
        assert!(response.errors.unwrap().head.message.contains("1500"));
    }

    #[test]
    fn classification_serializes_uppercase() {
        let encoded = json::to_value(Classification::Partial).unwrap();
        assert_eq!(encoded, json::json!("PARTIAL"));
    }
}

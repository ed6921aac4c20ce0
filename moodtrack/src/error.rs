use crate::validation::ValidationError;
use reqwest::StatusCode;
use serde_json::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected locally, before any request was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Registration form problems, all reported together
    #[error("{}", join_messages(.0))]
    InvalidForm(Vec<ValidationError>),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Non-2xx response; `payload` is the server body as received
    #[error("API error ({status}): {}", describe_api_error(.status, .payload))]
    Api { status: StatusCode, payload: Value },

    #[error("unexpected response from API: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("session storage: {0:#}")]
    Storage(anyhow::Error),
}

impl Error {
    /// True for the 401 that ends the current session
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("; ")
}

fn describe_api_error(status: &StatusCode, payload: &Value) -> String {
    api_error_message(payload)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string())
}

/// Pulls a human readable message out of an error body.
///
/// The server answers with `{"detail": ..}` for auth failures, `{"error": ..}` for missing
/// records, and a map of field name to list of messages for rejected forms.
pub fn api_error_message(payload: &Value) -> Option<String> {
    for key in ["detail", "error", "message"] {
        if let Some(msg) = payload[key].as_str() {
            return Some(msg.to_string());
        }
    }
    match payload {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map.iter().find_map(|(field, v)| {
            let msg = match v {
                Value::Array(list) => list.first()?.as_str()?.to_string(),
                Value::String(s) => s.clone(),
                _ => return None,
            };
            if field == "non_field_errors" {
                Some(msg)
            } else {
                Some(format!("{field}: {msg}"))
            }
        }),
        _ => None,
    }
}

#[test]
fn test_api_error_message() {
    use serde_json::json;
    assert_eq!(
        api_error_message(&json!({"detail": "Given token not valid for any token type"})),
        Some("Given token not valid for any token type".to_string())
    );
    assert_eq!(
        api_error_message(&json!({"error": "Entry not found"})),
        Some("Entry not found".to_string())
    );
    assert_eq!(
        api_error_message(&json!({"username": ["A user with that username already exists."]})),
        Some("username: A user with that username already exists.".to_string())
    );
    assert_eq!(
        api_error_message(&json!({"non_field_errors": ["Invalid credentials"]})),
        Some("Invalid credentials".to_string())
    );
    assert_eq!(api_error_message(&json!(null)), None);
    assert_eq!(api_error_message(&json!({})), None);
}

#[test]
fn test_error_display() {
    use serde_json::json;
    let err = Error::Api {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        payload: json!({"error": "boom"}),
    };
    assert_eq!(err.to_string(), "API error (500 Internal Server Error): boom");
    assert!(!err.is_unauthorized());

    let err = Error::Api {
        status: StatusCode::UNAUTHORIZED,
        payload: Value::Null,
    };
    assert_eq!(
        err.to_string(),
        "API error (401 Unauthorized): Unauthorized"
    );
    assert!(err.is_unauthorized());
}

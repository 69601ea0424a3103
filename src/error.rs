//! # Error Handling
//!
//! This module defines the centralized error type for the `rbuild` library.
//! Every call that crosses into an external system (the management server,
//! the repository client, the filesystem) is converted into one of these
//! variants at the facade boundary, so no raw transport or library error
//! reaches calling code.
//!
//! ## Kinds
//!
//! - **`Precondition`**: the environment is unusable (e.g. `HOME` unset).
//! - **`TransportTimeout`**: a remote round-trip kept timing out after the
//!   retry bound was exhausted.
//! - **`Remote`**: the management server answered with its structured error
//!   envelope. The class name and detail are shown verbatim.
//! - **`Conflict`**: a naming conflict reported by the server, remapped to a
//!   clearer message.
//! - **`Validation`**: local input failed a syntax check before any network
//!   call was attempted.
//! - **`Rbuild`**: any other domain failure with a human-readable message.
//!
//! The remaining variants wrap lower-level errors (`std::io`, `url`,
//! `serde_json`, `dialoguer`) through `#[from]` conversions.

use serde_json::Value;
use thiserror::Error;

/// Main error type for rbuild operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required piece of the environment is missing or invalid.
    #[error("{message}")]
    Precondition { message: String },

    /// A remote call timed out on every attempt.
    #[error("rBuilder connection timed out after {attempts} {}", attempt_word(.attempts))]
    TransportTimeout { attempts: u32 },

    /// The management server reported an error through its response envelope.
    #[error("rBuilder error {class}: {}", render_detail(.detail))]
    Remote { class: String, detail: Value },

    /// The server refused to create something because it already exists.
    #[error("{message}")]
    Conflict { message: String },

    /// Local input was rejected before contacting any server.
    #[error("Invalid {field}: '{value}'")]
    Validation { field: String, value: String },

    /// A domain-level failure with a message suitable for direct display.
    #[error("{message}")]
    Rbuild { message: String },

    /// A transport failure outside of the server's response envelope.
    #[error("Error contacting '{url}': {message}")]
    Transport { url: String, message: String },

    /// The server answered with something that is not a response envelope.
    #[error("Malformed response from rBuilder: {message}")]
    Protocol { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A JSON (de)serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An interactive prompt failed, wrapped from `dialoguer::Error`.
    #[error("Prompt error: {0}")]
    Dialog(#[from] dialoguer::Error),
}

impl Error {
    /// Shorthand for a generic domain error.
    pub fn rbuild(message: impl Into<String>) -> Self {
        Error::Rbuild {
            message: message.into(),
        }
    }

    /// Shorthand for a validation error on `field`.
    pub fn validation(field: impl Into<String>, value: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this error is a socket-level timeout that may be retried.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::TransportTimeout { .. })
    }
}

/// Render a server-provided error detail the way the server's own tools
/// print it: strings single-quoted, everything else as JSON.
fn render_detail(detail: &Value) -> String {
    match detail {
        Value::String(s) => format!("'{}'", s),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn attempt_word(attempts: &u32) -> &'static str {
    if *attempts == 1 {
        "attempt"
    } else {
        "attempts"
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display_remote_string_detail() {
        let error = Error::Remote {
            class: "BarError".to_string(),
            detail: json!(""),
        };
        assert_eq!(error.to_string(), "rBuilder error BarError: ''");
    }

    #[test]
    fn test_error_display_remote_numeric_detail() {
        let error = Error::Remote {
            class: "BazError".to_string(),
            detail: json!(1337),
        };
        assert_eq!(error.to_string(), "rBuilder error BazError: 1337");
    }

    #[test]
    fn test_error_display_transport_timeout() {
        let error = Error::TransportTimeout { attempts: 3 };
        assert_eq!(
            error.to_string(),
            "rBuilder connection timed out after 3 attempts"
        );
        assert!(error.is_timeout());

        let single = Error::TransportTimeout { attempts: 1 };
        assert_eq!(
            single.to_string(),
            "rBuilder connection timed out after 1 attempt"
        );
    }

    #[test]
    fn test_error_display_validation() {
        let error = Error::validation("branch name", "-1");
        let display = format!("{}", error);
        assert!(display.contains("branch name"));
        assert!(display.contains("'-1'"));
    }

    #[test]
    fn test_error_display_conflict() {
        let error = Error::Conflict {
            message: "Branch named 'b' already exists".to_string(),
        };
        assert_eq!(error.to_string(), "Branch named 'b' already exists");
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_url_error() {
        let url_error = url::Url::parse("not a url").unwrap_err();
        let error: Error = url_error.into();
        assert!(error.to_string().contains("URL parsing error"));
    }
}

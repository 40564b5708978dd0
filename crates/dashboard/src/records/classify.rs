//! Turning Action Bridge failures into messages a user may see.
//!
//! Connector failures arrive wrapped in the platform's own error body, so the
//! useful text sits several levels deep. Known locations are listed in
//! [`MESSAGE_POINTERS`]; add a pointer there to support another shape.

use serde::Serialize;

use crate::bridge::BridgeError;

/// Shown when no specific message can be extracted.
pub const GENERIC_MESSAGE: &str = "An error occurred, please try again later.";

/// JSON pointers, tried in order, into [`PlatformError::to_document`].
///
/// [`PlatformError::to_document`]: crate::bridge::PlatformError::to_document
pub const MESSAGE_POINTERS: &[&str] = &["/data/data/response/data/message"];

/// Broad category of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The platform reported a failure with a recognizable message.
    Platform,
    /// Anything else: transport errors, unexpected bodies.
    Unknown,
}

/// A failure reduced to something safe to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    /// An unknown failure with the generic message.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            kind: ErrorKind::Unknown,
            message: GENERIC_MESSAGE.to_string(),
        }
    }
}

/// Classify a bridge failure.
///
/// Only platform errors carrying a non-blank message at a known location are
/// [`ErrorKind::Platform`]; their message is passed through verbatim.
/// Everything else gets [`GENERIC_MESSAGE`] so raw internals never reach the
/// user.
#[must_use]
pub fn classify(error: &BridgeError) -> ClassifiedError {
    let BridgeError::Platform(platform) = error else {
        return ClassifiedError::unknown();
    };

    let document = platform.to_document();
    MESSAGE_POINTERS
        .iter()
        .filter_map(|pointer| document.pointer(pointer))
        .filter_map(serde_json::Value::as_str)
        .find(|message| !message.trim().is_empty())
        .map_or_else(ClassifiedError::unknown, |message| ClassifiedError {
            kind: ErrorKind::Platform,
            message: message.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::bridge::PlatformError;

    fn platform(status: u16, data: serde_json::Value) -> BridgeError {
        BridgeError::Platform(PlatformError::new(status, data))
    }

    #[test]
    fn test_nested_message_is_extracted() {
        let err = platform(
            400,
            json!({ "data": { "response": { "data": { "message": "Contact already exists" } } } }),
        );

        assert_eq!(
            classify(&err),
            ClassifiedError {
                kind: ErrorKind::Platform,
                message: "Contact already exists".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_path_falls_back_to_generic() {
        let err = platform(500, json!({ "message": "Internal error" }));
        let classified = classify(&err);

        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert_eq!(classified.message, GENERIC_MESSAGE);
    }

    #[test]
    fn test_blank_or_non_string_message_falls_back() {
        let blank = platform(
            400,
            json!({ "data": { "response": { "data": { "message": "   " } } } }),
        );
        let numeric = platform(
            400,
            json!({ "data": { "response": { "data": { "message": 42 } } } }),
        );

        assert_eq!(classify(&blank), ClassifiedError::unknown());
        assert_eq!(classify(&numeric), ClassifiedError::unknown());
    }

    #[test]
    fn test_unstructured_errors_never_leak_details() {
        let transport = BridgeError::Transport("connection refused at 10.0.0.3:443".to_string());
        let decode = BridgeError::UnexpectedResponse("HTTP 502 Bad Gateway".to_string());

        for err in [transport, decode] {
            let classified = classify(&err);
            assert_eq!(classified.kind, ErrorKind::Unknown);
            assert_eq!(classified.message, GENERIC_MESSAGE);
        }
    }

    #[test]
    fn test_serializes_lowercase_kind() {
        let value = serde_json::to_value(ClassifiedError::unknown()).unwrap_or_default();
        assert_eq!(value["kind"], "unknown");
    }
}

//! Error types for the Polanji API client.

use thiserror::Error;

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while building requests or reading responses.
///
/// Transport failures are not represented here: they travel inside
/// [`HttpResponse`](crate::transport::HttpResponse) as a status of `0` and an
/// error code, so a failed call still yields a response to assert against.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("Response body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown operation name: {0}")]
    UnknownOperation(String),

    #[error("Failed to build HTTP client: {0}")]
    Http(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::InvalidJson(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for ClientError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        ClientError::Encode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_invalid_json() {
        let err: ClientError = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err().into();
        assert!(matches!(err, ClientError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Response body is not valid JSON"));
    }

    #[test]
    fn test_form_error_maps_to_encode() {
        // nested maps cannot be form encoded
        let nested = serde_json::json!({ "user": { "id": 1 } });
        let err: ClientError = serde_urlencoded::to_string(&nested).unwrap_err().into();
        assert!(matches!(err, ClientError::Encode(_)));
    }
}

//! The uniform response envelope returned to callers.
//!
//! Every successful call resolves to an [`ApiResponse`]: the backend's
//! `{code, message, data}` wrapper with `data` decoded into the caller's
//! type. Decoding happens in two steps — raw bytes into an
//! `ApiResponse<Value>` inside the retried attempt, and `Value` into `T`
//! once, after the shared outcome settles.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::transport::RawResponse;

/// The `{code, message, data}` envelope every endpoint responds with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Application-level status code from the backend (0 = success by
    /// convention; passed through untouched).
    pub code: i64,
    /// Human-oriented message from the backend.
    #[serde(default)]
    pub message: String,
    /// The payload of the response.
    pub data: T,
}

impl ApiResponse<Value> {
    /// Decodes a raw transport response into an untyped envelope.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Transport`] if the HTTP status is outside 2xx — the body
    ///   is not inspected in that case.
    /// - [`ApiError::Decode`] if the body is not a valid
    ///   `{code, message, data}` JSON document.
    pub fn from_raw(raw: &RawResponse) -> Result<Self, ApiError> {
        if !(200..300).contains(&raw.status) {
            return Err(ApiError::status(
                raw.status,
                format!("server responded with status {}", raw.status),
            ));
        }
        serde_json::from_slice(&raw.body).map_err(ApiError::decode)
    }

    /// Converts the untyped `data` into the caller's expected shape.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if `data` does not match `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, ApiError> {
        let data = serde_json::from_value(self.data).map_err(ApiError::decode)?;
        Ok(ApiResponse {
            code: self.code,
            message: self.message,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn raw(status: u16, body: Value) -> RawResponse {
        RawResponse {
            status,
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn decodes_success_envelope() {
        let response = ApiResponse::from_raw(&raw(
            200,
            json!({ "code": 0, "message": "ok", "data": { "id": 7 } }),
        ))
        .unwrap();
        assert_eq!(response.code, 0);
        assert_eq!(response.message, "ok");
        assert_eq!(response.data, json!({ "id": 7 }));
    }

    #[test]
    fn missing_message_defaults_to_empty() {
        let response =
            ApiResponse::from_raw(&raw(200, json!({ "code": 0, "data": [1, 2, 3] }))).unwrap();
        assert_eq!(response.message, "");
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let err = ApiResponse::from_raw(&raw(503, json!({ "code": 0, "data": null }))).unwrap_err();
        assert_eq!(
            err,
            ApiError::status(503, "server responded with status 503")
        );
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = ApiResponse::from_raw(&RawResponse {
            status: 200,
            body: Bytes::from_static(b"<html>not json</html>"),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn into_typed_converts_data() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Topic {
            id: u32,
            title: String,
        }

        let envelope = ApiResponse {
            code: 0,
            message: "ok".to_string(),
            data: json!({ "id": 1, "title": "greetings" }),
        };
        let typed: ApiResponse<Topic> = envelope.into_typed().unwrap();
        assert_eq!(
            typed.data,
            Topic {
                id: 1,
                title: "greetings".to_string()
            }
        );
    }

    #[test]
    fn into_typed_shape_mismatch_is_a_decode_error() {
        let envelope = ApiResponse {
            code: 0,
            message: String::new(),
            data: json!("a string, not an object"),
        };
        let err = envelope.into_typed::<Vec<u32>>().unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}

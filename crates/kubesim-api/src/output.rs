//! Response envelope: an HTTP status code plus a JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use kubesim_lifecycle::EngineError;

/// What every request resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiOutput {
    pub code: StatusCode,
    pub response: Value,
}

impl ApiOutput {
    pub fn ok(response: Value) -> Self {
        Self {
            code: StatusCode::OK,
            response,
        }
    }

    pub fn created(response: Value) -> Self {
        Self {
            code: StatusCode::CREATED,
            response,
        }
    }

    /// `Status` failure document.
    pub fn failure(code: StatusCode, reason: &str, message: &str) -> Self {
        Self {
            code,
            response: json!({
                "apiVersion": "v1",
                "kind": "Status",
                "code": code.as_u16(),
                "reason": reason,
                "message": message,
                "status": "Failure",
            }),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::failure(StatusCode::NOT_FOUND, "NotFound", message)
    }

    pub fn internal(message: &str) -> Self {
        Self::failure(StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError", message)
    }
}

impl From<EngineError> for ApiOutput {
    fn from(err: EngineError) -> Self {
        let code = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::failure(code, err.reason(), &err.to_string())
    }
}

impl IntoResponse for ApiOutput {
    fn into_response(self) -> Response {
        (self.code, Json(self.response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_status_documents() {
        let out = ApiOutput::from(EngineError::already_exists("pods", "a"));
        assert_eq!(out.code, StatusCode::CONFLICT);
        assert_eq!(out.response["kind"], "Status");
        assert_eq!(out.response["code"], 409);
        assert_eq!(out.response["reason"], "AlreadyExists");
        assert_eq!(out.response["message"], "pods \"a\" already exists");
        assert_eq!(out.response["status"], "Failure");

        let out = ApiOutput::from(EngineError::NamespaceNotFound("x".into()));
        assert_eq!(out.code, StatusCode::NOT_FOUND);
        assert_eq!(out.response["message"], "namespaces \"x\" not found");

        let out = ApiOutput::from(EngineError::Internal("boom".into()));
        assert_eq!(out.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(out.response["reason"], "InternalServerError");
    }
}

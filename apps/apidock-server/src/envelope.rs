//! Uniform JSON response envelope.
//!
//! Every endpoint answers HTTP 200 with `{errcode, errmsg, data}`; clients
//! dispatch on `errcode`, not on the HTTP status.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<T> {
    errcode: i32,
    errmsg: String,
    data: T,
}

/// Successful payload wrapper (`errcode: 0`).
#[derive(Debug)]
pub struct Data<T>(pub T);

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            errcode: 0,
            errmsg: "success".to_string(),
            data: self.0,
        })
        .into_response()
    }
}

/// Client-visible error carried in the envelope.
#[derive(Clone, Debug)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

impl ApiError {
    /// Missing or malformed request field.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: 400,
            message: message.into(),
        }
    }

    /// No valid session token on the request.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            code: 40011,
            message: message.into(),
        }
    }

    /// Operation restricted to site administrators.
    pub fn forbidden_admin() -> Self {
        Self {
            code: 401,
            message: "site admin privileges required".to_string(),
        }
    }

    /// Name conflict (shares the 401 code with admin denials).
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self {
            code: 401,
            message: message.into(),
        }
    }

    /// Caller lacks the required group authority.
    pub fn forbidden() -> Self {
        Self {
            code: 405,
            message: "insufficient permissions".to_string(),
        }
    }

    /// Referenced record does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: 490,
            message: message.into(),
        }
    }

    /// Backend failure. The detail is logged, not leaked.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("internal error: {}", detail);
        Self {
            code: 500,
            message: "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Json(Envelope {
            errcode: self.code,
            errmsg: self.message,
            data: serde_json::Value::Null,
        })
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_errcode_zero() {
        let env = Envelope {
            errcode: 0,
            errmsg: "success".to_string(),
            data: serde_json::json!({"id": 1}),
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["errcode"], 0);
        assert_eq!(json["errmsg"], "success");
        assert_eq!(json["data"]["id"], 1);
    }

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::invalid_params("x").code, 400);
        assert_eq!(ApiError::unauthorized("x").code, 40011);
        assert_eq!(ApiError::forbidden_admin().code, 401);
        assert_eq!(ApiError::duplicate("x").code, 401);
        assert_eq!(ApiError::forbidden().code, 405);
        assert_eq!(ApiError::not_found("x").code, 490);
        assert_eq!(ApiError::internal("boom").code, 500);
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = ApiError::internal("database exploded at 0x1234");
        assert_eq!(err.message, "internal server error");
    }
}

//! Query errors and their RFC 7807 problem responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use dg_01_document_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Errors answered to HTTP clients.
///
/// Cloneable so one result can be handed to every request sharing a
/// single-flight call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn empty_param(name: &str) -> Self {
        Self::BadRequest(format!("empty {name}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn problem(&self) -> Problem {
        let status = self.status();
        Problem {
            problem_type: format!("digest/problem/{}", status.as_u16()),
            title: status.canonical_reason().unwrap_or("error").to_string(),
            detail: self.to_string(),
            status: status.as_u16(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "store query failed");
        ApiError::Internal(e.to_string())
    }
}

/// RFC 7807 problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub detail: String,
    pub status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::to_vec(&self.problem()).unwrap_or_default();
        (status, [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_fields() {
        let problem = ApiError::NotFound("token design".into()).problem();
        assert_eq!(problem.status, 404);
        assert_eq!(problem.title, "Not Found");
        assert_eq!(problem.detail, "token design not found");

        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["type"], "digest/problem/404");
    }

    #[test]
    fn test_store_errors_are_internal() {
        let err = ApiError::from(StoreError::Unavailable("closed".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_response_uses_problem_content_type() {
        let response = ApiError::empty_param("contract").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PROBLEM_CONTENT_TYPE
        );
    }
}

//! Error bodies of the loans REST surface, rendered as RFC 9457
//! `application/problem+json`.
//!
//! Every problem is identified by a [`ProblemCode`]. The code fixes the HTTP
//! status, the title and the `type` URI, so handlers only supply the detail
//! and the request path that failed.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

const TYPE_BASE: &str = "https://errors.equiploan.dev/";

/// Stable machine codes. Clients branch on these, never on `title` or
/// `detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemCode {
    BadRequest,
    Unauthenticated,
    DuplicateUser,
    InvalidCredentials,
    Forbidden,
    NotFound,
    MissingTarget,
    MissingMaterial,
    MaterialUnavailable,
    InvalidTransition,
    Validation,
    Internal,
}

impl ProblemCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemCode::BadRequest => "LOANS_BAD_REQUEST",
            ProblemCode::Unauthenticated => "LOANS_UNAUTHENTICATED",
            ProblemCode::DuplicateUser => "LOANS_DUPLICATE_USER",
            ProblemCode::InvalidCredentials => "LOANS_INVALID_CREDENTIALS",
            ProblemCode::Forbidden => "LOANS_FORBIDDEN",
            ProblemCode::NotFound => "LOANS_NOT_FOUND",
            ProblemCode::MissingTarget => "LOANS_MISSING_TARGET",
            ProblemCode::MissingMaterial => "LOANS_MISSING_MATERIAL",
            ProblemCode::MaterialUnavailable => "LOANS_MATERIAL_UNAVAILABLE",
            ProblemCode::InvalidTransition => "LOANS_INVALID_TRANSITION",
            ProblemCode::Validation => "LOANS_VALIDATION",
            ProblemCode::Internal => "LOANS_INTERNAL",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ProblemCode::BadRequest
            | ProblemCode::MissingTarget
            | ProblemCode::MissingMaterial
            | ProblemCode::Validation => StatusCode::BAD_REQUEST,
            ProblemCode::Unauthenticated | ProblemCode::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ProblemCode::Forbidden => StatusCode::FORBIDDEN,
            ProblemCode::NotFound => StatusCode::NOT_FOUND,
            ProblemCode::DuplicateUser
            | ProblemCode::MaterialUnavailable
            | ProblemCode::InvalidTransition => StatusCode::CONFLICT,
            ProblemCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ProblemCode::BadRequest => "Bad request",
            ProblemCode::Unauthenticated => "Authentication required",
            ProblemCode::DuplicateUser => "User already exists",
            ProblemCode::InvalidCredentials => "Invalid credentials",
            ProblemCode::Forbidden => "Forbidden",
            ProblemCode::NotFound => "Not found",
            ProblemCode::MissingTarget => "Missing target teacher",
            ProblemCode::MissingMaterial => "Missing material selection",
            ProblemCode::MaterialUnavailable => "Material unavailable",
            ProblemCode::InvalidTransition => "Invalid transition",
            ProblemCode::Validation => "Validation error",
            ProblemCode::Internal => "Internal error",
        }
    }
}

/// Problem body returned by every failing loans endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(title = "Problem")]
pub struct Problem {
    /// `https://errors.equiploan.dev/<code>`
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Path of the request that failed, e.g. `/requests/{id}/approve`.
    pub instance: String,
    /// One of the `LOANS_*` codes.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// A rejected input field, located by JSON Pointer (`/name`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub pointer: String,
    pub detail: String,
}

impl Problem {
    pub fn new(code: ProblemCode, detail: impl Into<String>, instance: &str) -> Self {
        Self {
            type_url: format!("{TYPE_BASE}{}", code.as_str()),
            title: code.title().to_owned(),
            status: code.status().as_u16(),
            detail: detail.into(),
            instance: instance.to_owned(),
            code: code.as_str().to_owned(),
            errors: None,
        }
    }

    /// Attach the offending field; the pointer is derived from its name.
    pub fn with_field(mut self, field: &str, detail: impl Into<String>) -> Self {
        self.errors.get_or_insert_with(Vec::new).push(FieldError {
            pointer: format!("/{field}"),
            detail: detail.into(),
        });
        self
    }
}

/// `Problem` as an axum response.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl ProblemResponse {
    pub fn new(code: ProblemCode, detail: impl Into<String>, instance: &str) -> Self {
        Self(Problem::new(code, detail, instance))
    }
}

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
            )],
            Json(self.0),
        )
            .into_response()
    }
}

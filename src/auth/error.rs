// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization errors.
//!
//! Every rejection in the authorizer pipeline maps to exactly one variant.
//! The response body uses the same envelope as [`crate::error::ApiError`]:
//! `{"success": false, "error": <status>, "message": <description>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ErrorBody;

/// Authorization error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token header carries no `kid`
    MissingKeyId,
    /// No signing key with the token's `kid`
    NoMatchingKey,
    /// Token `exp` is in the past
    TokenExpired,
    /// Audience or issuer mismatch
    InvalidClaims,
    /// Any other decode or signature failure
    UnparseableToken,
    /// Claim set has no usable `permissions` field
    PermissionsMissing,
    /// Required permission not granted
    PermissionDenied,
    /// Signing keys could not be fetched from the issuer
    KeyFetch(String),
}

impl AuthError {
    /// Machine-readable error code, used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "authorization_header_missing",
            AuthError::InvalidAuthHeader => "invalid_header",
            AuthError::MissingKeyId => "invalid_header",
            AuthError::NoMatchingKey => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::UnparseableToken => "invalid_header",
            AuthError::PermissionsMissing => "invalid_claims",
            AuthError::PermissionDenied => "unauthorized",
            AuthError::KeyFetch(_) => "jwks_unavailable",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MissingKeyId
            | AuthError::NoMatchingKey
            | AuthError::TokenExpired
            | AuthError::InvalidClaims => StatusCode::UNAUTHORIZED,
            AuthError::UnparseableToken | AuthError::PermissionsMissing => {
                StatusCode::BAD_REQUEST
            }
            AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::KeyFetch(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-facing description.
    ///
    /// `KeyFetch` details stay in the logs and are not echoed to callers.
    pub fn description(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "authorization header is expected",
            AuthError::InvalidAuthHeader => "authorization header must be bearer token",
            AuthError::MissingKeyId => "authorization malformed",
            AuthError::NoMatchingKey => "Unable to find the appropriate key",
            AuthError::TokenExpired => "Token expired",
            AuthError::InvalidClaims => "Incorrect claims. Please, check the audience and issuer",
            AuthError::UnparseableToken => "Unable to parse authentication token",
            AuthError::PermissionsMissing => "Permissions not included in JWT",
            AuthError::PermissionDenied => "Permission not found",
            AuthError::KeyFetch(_) => "Unable to fetch signing keys",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::KeyFetch(detail) => write!(f, "{}: {detail}", self.description()),
            other => f.write_str(other.description()),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ErrorBody::new(self.status_code(), self.description()).into_response()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for verified claims.
//!
//! Use the `Claims` extractor in handlers behind a
//! [`PermissionGuard`](super::PermissionGuard):
//!
//! ```rust,ignore
//! async fn my_handler(Claims(claims): Claims) -> impl IntoResponse {
//!     // claims is the verified ClaimSet
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::ClaimSet;
use crate::error::ApiError;

/// Verified claims placed in the request by the permission middleware.
pub struct Claims(pub ClaimSet);

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A handler asking for claims on an unguarded route is a wiring bug.
        parts
            .extensions
            .get::<ClaimSet>()
            .cloned()
            .map(Claims)
            .ok_or_else(|| {
                tracing::error!(path = %parts.uri.path(), "Claims requested on unguarded route");
                ApiError::internal()
            })
    }
}

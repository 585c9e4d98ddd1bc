// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified JWT claim set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AuthError;

/// Claim name holding the granted permission strings.
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// Decoded and verified token payload.
///
/// Built fresh for every request and never persisted. All claims are kept,
/// not only the ones the authorizer inspects, so handlers see exactly what
/// the issuer signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// The `sub` claim, if present.
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// The granted permission strings.
    ///
    /// The claim must be a JSON array of strings. A missing claim, or one of
    /// any other shape, is reported as [`AuthError::PermissionsMissing`].
    pub fn permissions(&self) -> Result<BTreeSet<&str>, AuthError> {
        let Some(Value::Array(values)) = self.0.get(PERMISSIONS_CLAIM) else {
            return Err(AuthError::PermissionsMissing);
        };

        values
            .iter()
            .map(|value| value.as_str().ok_or(AuthError::PermissionsMissing))
            .collect()
    }

    /// Require an exact permission string to be granted.
    pub fn require_permission(&self, required: &str) -> Result<(), AuthError> {
        if self.permissions()?.contains(required) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied)
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Bearer token authorization for the menu API.
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user with Auth0
//! 2. Frontend sends `Authorization: Bearer <access token>`
//! 3. Server:
//!    - Resolves the token's `kid` against the Auth0 JWKS (cached)
//!    - Verifies RS256 signature, expiry, audience and issuer
//!    - Checks the route's permission against the `permissions` claim
//!
//! ## Access tiers
//!
//! | Tier | Permissions |
//! |------|-------------|
//! | public | none |
//! | barista | `get:drinks-detail` |
//! | manager | `get:drinks-detail`, `post:drinks`, `patch:drinks`, `delete:drinks` |

pub mod authorizer;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod permissions;
pub mod refresher;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorizer::{Authorizer, AuthorizerSettings};
pub use claims::ClaimSet;
pub use error::AuthError;
pub use extractor::Claims;
pub use jwks::{JwksManager, SigningKeyResolver, StaticKeyResolver};
pub use middleware::{require_permission, PermissionGuard};
pub use permissions::{Permission, Role};
pub use refresher::KeySetRefresher;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token authorizer.
//!
//! A request passes five gates in order, the first failure wins:
//!
//! 1. `Authorization: Bearer <token>` header
//! 2. `kid` in the unverified token header
//! 3. signing key resolved for that `kid`
//! 4. signature, expiry, audience and issuer
//! 5. required permission in the `permissions` claim

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::ClaimSet;
use super::error::AuthError;
use super::jwks::SigningKeyResolver;

/// Default clock skew tolerance. Any `exp` in the past is rejected.
pub const DEFAULT_LEEWAY: u64 = 0;

/// Token validation parameters, fixed at startup.
#[derive(Debug, Clone)]
pub struct AuthorizerSettings {
    /// Expected `aud` (the API identifier)
    pub audience: String,
    /// Expected `iss` (`https://<domain>/`)
    pub issuer: String,
    /// Accepted signing algorithms
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerance in seconds
    pub leeway: u64,
}

impl AuthorizerSettings {
    pub fn new(audience: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
            algorithms: vec![Algorithm::RS256],
            leeway: DEFAULT_LEEWAY,
        }
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = self.algorithms.clone();
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation
    }
}

/// Verifies bearer tokens and checks permissions.
#[derive(Clone)]
pub struct Authorizer {
    resolver: Arc<dyn SigningKeyResolver>,
    settings: AuthorizerSettings,
}

impl Authorizer {
    pub fn new(resolver: Arc<dyn SigningKeyResolver>, settings: AuthorizerSettings) -> Self {
        Self { resolver, settings }
    }

    pub fn resolver(&self) -> &Arc<dyn SigningKeyResolver> {
        &self.resolver
    }

    /// Authorize a request for `required_permission`.
    ///
    /// Returns the verified claim set on success.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> Result<ClaimSet, AuthError> {
        let result = self.check(headers, required_permission).await;

        if let Err(e) = &result {
            tracing::debug!(
                permission = %required_permission,
                code = e.error_code(),
                status = e.status_code().as_u16(),
                "Request rejected by authorizer"
            );
        }

        result
    }

    async fn check(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> Result<ClaimSet, AuthError> {
        let token = bearer_token(headers)?;
        let claims = self.verify(token).await?;
        claims.require_permission(required_permission)?;
        Ok(claims)
    }

    /// Verify a compact token and return its claims (gates 2-4).
    pub async fn verify(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::UnparseableToken)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let key = self.resolver.resolve(&kid).await?;

        let token_data = decode::<ClaimSet>(token, &key, &self.settings.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAudience
                | ErrorKind::InvalidIssuer
                | ErrorKind::ImmatureSignature => AuthError::InvalidClaims,
                ErrorKind::MissingRequiredClaim(claim) if claim == "aud" || claim == "iss" => {
                    AuthError::InvalidClaims
                }
                _ => AuthError::UnparseableToken,
            })?;

        Ok(token_data.claims)
    }
}

/// Extract the token from `Authorization: Bearer <token>` (gate 1).
///
/// The scheme is matched case-insensitively. An empty header counts as
/// missing.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    if value.trim().is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

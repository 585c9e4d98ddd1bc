// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token minting helpers shared by the auth and API test suites.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};

use super::authorizer::{Authorizer, AuthorizerSettings};
use super::jwks::StaticKeyResolver;
use super::permissions::Role;

pub const SIGNING_KID: &str = "signing-key-1";
pub const TEST_AUDIENCE: &str = "drinks";
pub const TEST_ISSUER: &str = "https://coffee-shop.test.auth0.com/";

const SIGNING_PRIVATE_PEM: &str = include_str!("testdata/signing.key.pem");
const SIGNING_PUBLIC_PEM: &str = include_str!("testdata/signing.pub.pem");
const OTHER_PRIVATE_PEM: &str = include_str!("testdata/other.key.pem");
const TEST_JWKS: &str = include_str!("testdata/jwks.json");

/// Which private key signs a minted token.
#[derive(Clone, Copy)]
pub enum SigningKey {
    /// The key published in the test JWKS
    Published,
    /// A key the issuer never published
    Foreign,
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub fn test_jwks() -> JwkSet {
    serde_json::from_str(TEST_JWKS).unwrap()
}

pub fn signing_decoding_key() -> DecodingKey {
    DecodingKey::from_rsa_pem(SIGNING_PUBLIC_PEM.as_bytes()).unwrap()
}

/// Claims an Auth0 access token for `permissions` would carry.
pub fn claims_with(permissions: &[&str]) -> Value {
    json!({
        "iss": TEST_ISSUER,
        "sub": "auth0|5f1a2b3c",
        "aud": [TEST_AUDIENCE, "https://coffee-shop.test.auth0.com/userinfo"],
        "iat": now() - 60,
        "exp": now() + 3600,
        "permissions": permissions,
    })
}

/// Claims for a user in the given access tier.
pub fn claims_for(role: Role) -> Value {
    let permissions: Vec<&str> = role.permissions().iter().map(|p| p.as_str()).collect();
    claims_with(&permissions)
}

/// Sign `claims` with RS256, optionally stamping a `kid`.
pub fn mint(claims: &Value, kid: Option<&str>, key: SigningKey) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);

    let pem = match key {
        SigningKey::Published => SIGNING_PRIVATE_PEM,
        SigningKey::Foreign => OTHER_PRIVATE_PEM,
    };
    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &encoding_key).unwrap()
}

/// A well-formed token signed by the published key.
pub fn token_for(claims: &Value) -> String {
    mint(claims, Some(SIGNING_KID), SigningKey::Published)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn test_settings() -> AuthorizerSettings {
    AuthorizerSettings::new(TEST_AUDIENCE, TEST_ISSUER)
}

/// Authorizer trusting only the test JWKS.
pub fn test_authorizer() -> Authorizer {
    Authorizer::new(
        Arc::new(StaticKeyResolver::from_jwks(&test_jwks())),
        test_settings(),
    )
}

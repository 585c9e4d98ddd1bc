// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coffee Menu Server - drink menu API guarded by Auth0 access tokens
//!
//! The public menu is open to everyone. Recipe details and menu changes
//! require a bearer token whose `permissions` claim names the operation.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, JWKS caching and permission checks
//! - `config` - Environment configuration
//! - `storage` - Drink persistence (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

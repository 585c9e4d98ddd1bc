// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent drink storage in a single redb file. The path comes from
//! `DATABASE_PATH` (see [`crate::config`]).

pub mod drinks;

pub use drinks::{DrinkStore, StorageError, StorageResult};

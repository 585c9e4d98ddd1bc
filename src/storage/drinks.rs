// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded drink database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `drinks`: id → serialized Drink (JSON bytes)
//! - `drink_titles`: title → id (uniqueness index)
//! - `meta`: key → u64 (id counter)
//!
//! Every operation runs in a single transaction, so the title index never
//! disagrees with the drinks table.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use crate::models::{Drink, DrinkChanges, Ingredient, NewDrink};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: id → serialized Drink (JSON bytes).
const DRINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("drinks");

/// Index: title → id.
const DRINK_TITLES: TableDefinition<&str, u64> = TableDefinition::new("drink_titles");

/// Counters.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_drink_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("drink {0} not found")]
    NotFound(u64),

    #[error("a drink titled {0:?} already exists")]
    DuplicateTitle(String),

    #[error("corrupt database: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// DrinkStore
// =============================================================================

/// Embedded ACID drink database.
pub struct DrinkStore {
    db: Database,
}

impl DrinkStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DRINKS)?;
            let _ = write_txn.open_table(DRINK_TITLES)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Confirm the database answers a read transaction.
    pub fn check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(DRINKS)?;
        Ok(())
    }

    /// All drinks, ordered by id.
    pub fn list(&self) -> StorageResult<Vec<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;

        let mut drinks = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            drinks.push(serde_json::from_slice(value.value())?);
        }
        Ok(drinks)
    }

    /// Look up a single drink.
    pub fn get(&self, id: u64) -> StorageResult<Drink> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(id)),
        }
    }

    /// Insert a new drink, assigning the next id.
    pub fn insert(&self, new: NewDrink) -> StorageResult<Drink> {
        let write_txn = self.db.begin_write()?;
        let drink = insert_row(&write_txn, new)?;
        write_txn.commit()?;

        tracing::debug!(id = drink.id, "Drink row inserted");
        Ok(drink)
    }

    /// Apply a partial update. Absent fields keep their stored value.
    pub fn update(&self, id: u64, changes: DrinkChanges) -> StorageResult<Drink> {
        let write_txn = self.db.begin_write()?;
        let drink = {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let mut drink: Drink = match drinks.get(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::NotFound(id)),
            };

            if let Some(title) = changes.title {
                if title != drink.title {
                    let mut titles = write_txn.open_table(DRINK_TITLES)?;
                    if titles.get(title.as_str())?.is_some() {
                        return Err(StorageError::DuplicateTitle(title));
                    }
                    titles.remove(drink.title.as_str())?;
                    titles.insert(title.as_str(), id)?;
                    drink.title = title;
                }
            }

            if let Some(recipe) = changes.recipe {
                drink.recipe = recipe;
            }

            let json = serde_json::to_vec(&drink)?;
            drinks.insert(id, json.as_slice())?;
            drink
        };
        write_txn.commit()?;

        tracing::debug!(id, "Drink row updated");
        Ok(drink)
    }

    /// Remove a drink and its title index entry.
    pub fn delete(&self, id: u64) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let drink: Drink = match drinks.remove(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::NotFound(id)),
            };

            let mut titles = write_txn.open_table(DRINK_TITLES)?;
            titles.remove(drink.title.as_str())?;
        }
        write_txn.commit()?;

        tracing::debug!(id, "Drink row deleted");
        Ok(())
    }

    /// Drop every drink, restart ids at 1 and seed the default menu.
    pub fn reset(&self) -> StorageResult<Vec<Drink>> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(DRINKS)?;
        write_txn.delete_table(DRINK_TITLES)?;
        write_txn.delete_table(META)?;
        let seeded = default_menu()
            .into_iter()
            .map(|drink| insert_row(&write_txn, drink))
            .collect::<StorageResult<Vec<_>>>()?;
        write_txn.commit()?;

        tracing::warn!(seeded = seeded.len(), "Drink database reset");
        Ok(seeded)
    }
}

/// Insert `new` inside an open write transaction.
fn insert_row(write_txn: &WriteTransaction, new: NewDrink) -> StorageResult<Drink> {
    let mut titles = write_txn.open_table(DRINK_TITLES)?;
    if titles.get(new.title.as_str())?.is_some() {
        return Err(StorageError::DuplicateTitle(new.title));
    }

    let mut meta = write_txn.open_table(META)?;
    let id = meta.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
    let next = id
        .checked_add(1)
        .ok_or_else(|| StorageError::Corrupt("drink id counter exhausted".into()))?;
    meta.insert(NEXT_ID_KEY, next)?;

    let drink = Drink {
        id,
        title: new.title,
        recipe: new.recipe,
    };
    let json = serde_json::to_vec(&drink)?;

    let mut drinks = write_txn.open_table(DRINKS)?;
    drinks.insert(id, json.as_slice())?;
    titles.insert(drink.title.as_str(), id)?;
    Ok(drink)
}

/// The menu a freshly reset database starts with.
fn default_menu() -> Vec<NewDrink> {
    vec![NewDrink {
        title: "water".to_string(),
        recipe: vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }],
    }]
}

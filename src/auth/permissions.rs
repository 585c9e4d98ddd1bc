// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission vocabulary and access tiers.
//!
//! The identity provider assigns permissions to users through roles; tokens
//! carry the resulting permission strings in their `permissions` claim. The
//! authorizer only ever compares strings, so [`Role`] exists to document the
//! tiers and to mint realistic tokens in tests.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A permission string understood by the drink handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    /// `get:drinks-detail` - read full recipes
    #[serde(rename = "get:drinks-detail")]
    GetDrinksDetail,
    /// `post:drinks` - create drinks
    #[serde(rename = "post:drinks")]
    PostDrinks,
    /// `patch:drinks` - edit drinks
    #[serde(rename = "patch:drinks")]
    PatchDrinks,
    /// `delete:drinks` - remove drinks
    #[serde(rename = "delete:drinks")]
    DeleteDrinks,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::GetDrinksDetail,
        Permission::PostDrinks,
        Permission::PatchDrinks,
        Permission::DeleteDrinks,
    ];

    /// The exact string carried in tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::GetDrinksDetail => "get:drinks-detail",
            Permission::PostDrinks => "post:drinks",
            Permission::PatchDrinks => "patch:drinks",
            Permission::DeleteDrinks => "delete:drinks",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access tiers.
///
/// - `Public` - no token, may list drinks in short form
/// - `Barista` - may read full recipes
/// - `Manager` - full menu management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Public,
    Barista,
    Manager,
}

impl Role {
    /// Permissions the identity provider grants to this tier.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Public => &[],
            Role::Barista => &[Permission::GetDrinksDetail],
            Role::Manager => &Permission::ALL,
        }
    }

    /// Check whether this tier is granted `permission`.
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

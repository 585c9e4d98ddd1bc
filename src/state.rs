// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{Authorizer, Permission, PermissionGuard};
use crate::storage::DrinkStore;

#[derive(Clone)]
pub struct AppState {
    pub drinks: Arc<DrinkStore>,
    pub authorizer: Arc<Authorizer>,
}

impl AppState {
    pub fn new(drinks: DrinkStore, authorizer: Authorizer) -> Self {
        Self {
            drinks: Arc::new(drinks),
            authorizer: Arc::new(authorizer),
        }
    }

    /// Middleware state requiring `permission` on a route.
    pub fn guard(&self, permission: Permission) -> PermissionGuard {
        PermissionGuard::new(self.authorizer.clone(), permission)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the drink menu API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and the OpenAPI
//! document.
//!
//! ## Representations
//!
//! - **short** (public): ingredient colors and parts only, enough to draw
//!   the drink graphic
//! - **long** (barista and manager): full recipe including ingredient names

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

// =============================================================================
// Drink
// =============================================================================

/// One recipe component.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Ingredient {
    /// Ingredient name, e.g. "milk".
    pub name: String,
    /// Display color, e.g. "grey" or "#ffe4c4".
    pub color: String,
    /// Relative amount, at least 1.
    pub parts: u32,
}

/// A drink on the menu (long representation).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Drink {
    /// Store-assigned identifier.
    pub id: u64,
    /// Unique drink title.
    pub title: String,
    /// Ordered recipe components.
    pub recipe: Vec<Ingredient>,
}

/// Ingredient without its name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

/// Public view of a drink.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DrinkShort {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl Drink {
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|ingredient| ShortIngredient {
                    color: ingredient.color.clone(),
                    parts: ingredient.parts,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A recipe as sent by clients: one ingredient or a list.
#[derive(Debug, Clone, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecipeInput {
    One(Ingredient),
    Many(Vec<Ingredient>),
}

impl RecipeInput {
    pub fn into_vec(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::One(ingredient) => vec![ingredient],
            RecipeInput::Many(ingredients) => ingredients,
        }
    }
}

/// Body of `POST /drinks`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: RecipeInput,
}

/// Body of `PATCH /drinks/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

/// Validated drink contents ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrinkChanges {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

impl CreateDrinkRequest {
    pub fn validate(self) -> Result<NewDrink, ApiError> {
        Ok(NewDrink {
            title: validate_title(self.title)?,
            recipe: validate_recipe(self.recipe.into_vec())?,
        })
    }
}

impl UpdateDrinkRequest {
    pub fn validate(self) -> Result<DrinkChanges, ApiError> {
        Ok(DrinkChanges {
            title: self.title.map(validate_title).transpose()?,
            recipe: self
                .recipe
                .map(|recipe| validate_recipe(recipe.into_vec()))
                .transpose()?,
        })
    }
}

fn validate_title(title: String) -> Result<String, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::unprocessable());
    }
    Ok(trimmed.to_string())
}

fn validate_recipe(recipe: Vec<Ingredient>) -> Result<Vec<Ingredient>, ApiError> {
    let valid = !recipe.is_empty()
        && recipe.iter().all(|ingredient| {
            ingredient.parts > 0
                && !ingredient.name.trim().is_empty()
                && !ingredient.color.trim().is_empty()
        });

    if valid {
        Ok(recipe)
    } else {
        Err(ApiError::unprocessable())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// `{"success": true, "drinks": [...]}` with short drinks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShortDrinksResponse {
    pub success: bool,
    pub drinks: Vec<DrinkShort>,
}

/// `{"success": true, "drinks": [...]}` with long drinks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DrinksResponse {
    pub success: bool,
    pub drinks: Vec<Drink>,
}

/// `{"success": true, "delete": <id>}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: u64,
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Drink menu handlers.
//!
//! `list_drinks` is public. Every other handler sits behind a
//! `PermissionGuard` (see [`super::router`]) and receives the verified
//! claims, which are used for the audit log line.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::{
    auth::Claims,
    error::ApiError,
    models::{
        CreateDrinkRequest, DeleteDrinkResponse, DrinksResponse, ShortDrinksResponse,
        UpdateDrinkRequest,
    },
    state::AppState,
};

fn drink_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::not_found())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::bad_request()
    })
}

#[utoipa::path(
    get,
    path = "/drinks",
    tag = "Drinks",
    responses((status = 200, body = ShortDrinksResponse))
)]
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<ShortDrinksResponse>, ApiError> {
    let drinks = state.drinks.list()?;
    Ok(Json(ShortDrinksResponse {
        success: true,
        drinks: drinks.iter().map(|drink| drink.short()).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/drinks-detail",
    tag = "Drinks",
    security(("bearer" = ["get:drinks-detail"])),
    responses(
        (status = 200, body = DrinksResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Permission not found")
    )
)]
pub async fn list_drink_details(
    State(state): State<AppState>,
    Claims(_claims): Claims,
) -> Result<Json<DrinksResponse>, ApiError> {
    Ok(Json(DrinksResponse {
        success: true,
        drinks: state.drinks.list()?,
    }))
}

#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    tag = "Drinks",
    security(("bearer" = ["post:drinks"])),
    responses(
        (status = 200, body = DrinksResponse),
        (status = 400, description = "Malformed body"),
        (status = 422, description = "Invalid drink or duplicate title")
    )
)]
pub async fn create_drink(
    State(state): State<AppState>,
    Claims(claims): Claims,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse>, ApiError> {
    let new_drink = body(payload)?.validate()?;
    let drink = state.drinks.insert(new_drink)?;

    tracing::info!(
        subject = claims.subject().unwrap_or_default(),
        id = drink.id,
        title = %drink.title,
        "Drink created"
    );

    Ok(Json(DrinksResponse {
        success: true,
        drinks: vec![drink],
    }))
}

#[utoipa::path(
    patch,
    path = "/drinks/{drink_id}",
    params(("drink_id" = u64, Path, description = "Identifier of the drink to update")),
    request_body = UpdateDrinkRequest,
    tag = "Drinks",
    security(("bearer" = ["patch:drinks"])),
    responses(
        (status = 200, body = DrinksResponse),
        (status = 400, description = "Malformed or empty body"),
        (status = 404, description = "Unknown drink"),
        (status = 422, description = "Invalid drink or duplicate title")
    )
)]
pub async fn update_drink(
    State(state): State<AppState>,
    Claims(claims): Claims,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse>, ApiError> {
    let id = drink_id(path)?;
    // Unknown ids are reported before body problems.
    state.drinks.get(id)?;

    let request = body(payload)?;
    if request.title.is_none() && request.recipe.is_none() {
        return Err(ApiError::bad_request());
    }

    let drink = state.drinks.update(id, request.validate()?)?;

    tracing::info!(
        subject = claims.subject().unwrap_or_default(),
        id,
        title = %drink.title,
        "Drink updated"
    );

    Ok(Json(DrinksResponse {
        success: true,
        drinks: vec![drink],
    }))
}

#[utoipa::path(
    delete,
    path = "/drinks/{drink_id}",
    params(("drink_id" = u64, Path, description = "Identifier of the drink to delete")),
    tag = "Drinks",
    security(("bearer" = ["delete:drinks"])),
    responses(
        (status = 200, body = DeleteDrinkResponse),
        (status = 404, description = "Unknown drink")
    )
)]
pub async fn delete_drink(
    State(state): State<AppState>,
    Claims(claims): Claims,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteDrinkResponse>, ApiError> {
    let id = drink_id(path)?;
    state.drinks.delete(id)?;

    tracing::info!(
        subject = claims.subject().unwrap_or_default(),
        id,
        "Drink deleted"
    );

    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::auth::test_support::{claims_for, test_authorizer};
    use crate::auth::{ClaimSet, Role};
    use crate::models::{Ingredient, NewDrink, RecipeInput};
    use crate::storage::DrinkStore;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = DrinkStore::open(&dir.path().join("drinks.redb")).unwrap();
        (AppState::new(store, test_authorizer()), dir)
    }

    fn manager() -> Claims {
        let claims: ClaimSet = serde_json::from_value(claims_for(Role::Manager)).unwrap();
        Claims(claims)
    }

    fn espresso() -> Ingredient {
        Ingredient {
            name: "espresso".into(),
            color: "brown".into(),
            parts: 1,
        }
    }

    fn seed(state: &AppState, title: &str) -> u64 {
        state
            .drinks
            .insert(NewDrink {
                title: title.into(),
                recipe: vec![espresso()],
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn list_drinks_uses_short_form() {
        let (state, _dir) = test_state();
        seed(&state, "doppio");

        let Json(response) = list_drinks(State(state)).await.unwrap();
        assert!(response.success);
        let value = serde_json::to_value(&response.drinks).unwrap();
        assert_eq!(
            value,
            json!([{ "id": 1, "title": "doppio", "recipe": [{ "color": "brown", "parts": 1 }] }])
        );
    }

    #[tokio::test]
    async fn empty_menu_is_ok() {
        let (state, _dir) = test_state();
        let Json(response) = list_drinks(State(state)).await.unwrap();
        assert!(response.drinks.is_empty());
    }

    #[tokio::test]
    async fn details_include_names() {
        let (state, _dir) = test_state();
        seed(&state, "doppio");

        let Json(response) = list_drink_details(State(state), manager()).await.unwrap();
        assert_eq!(response.drinks[0].recipe[0].name, "espresso");
    }

    #[tokio::test]
    async fn create_drink_success() {
        let (state, _dir) = test_state();
        let request = CreateDrinkRequest {
            title: "ristretto".into(),
            recipe: RecipeInput::One(espresso()),
        };

        let Json(response) = create_drink(State(state.clone()), manager(), Ok(Json(request)))
            .await
            .unwrap();
        assert_eq!(response.drinks.len(), 1);
        assert_eq!(response.drinks[0].title, "ristretto");
        assert_eq!(state.drinks.list().unwrap(), response.drinks);
    }

    #[tokio::test]
    async fn create_duplicate_is_unprocessable() {
        let (state, _dir) = test_state();
        seed(&state, "ristretto");
        let request = CreateDrinkRequest {
            title: "ristretto".into(),
            recipe: RecipeInput::One(espresso()),
        };

        let error = create_drink(State(state), manager(), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(error.status.as_u16(), 422);
    }

    #[tokio::test]
    async fn update_drink_success() {
        let (state, _dir) = test_state();
        let id = seed(&state, "doppio");
        let request = UpdateDrinkRequest {
            title: Some("double espresso".into()),
            recipe: None,
        };

        let Json(response) = update_drink(
            State(state.clone()),
            manager(),
            Ok(Path(id)),
            Ok(Json(request)),
        )
        .await
        .unwrap();
        assert_eq!(response.drinks[0].title, "double espresso");
        assert_eq!(response.drinks[0].recipe, vec![espresso()]);
    }

    #[tokio::test]
    async fn empty_update_is_bad_request() {
        let (state, _dir) = test_state();
        let id = seed(&state, "doppio");

        let error = update_drink(
            State(state),
            manager(),
            Ok(Path(id)),
            Ok(Json(UpdateDrinkRequest::default())),
        )
        .await
        .unwrap_err();
        assert_eq!(error.status.as_u16(), 400);
    }

    #[tokio::test]
    async fn update_unknown_drink_is_not_found() {
        let (state, _dir) = test_state();
        let error = update_drink(
            State(state),
            manager(),
            Ok(Path(99)),
            Ok(Json(UpdateDrinkRequest {
                title: Some("nothing".into()),
                recipe: None,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(error.status.as_u16(), 404);
    }

    #[tokio::test]
    async fn delete_drink_success() {
        let (state, _dir) = test_state();
        let id = seed(&state, "doppio");

        let Json(response) = delete_drink(State(state.clone()), manager(), Ok(Path(id)))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.delete, id);
        assert!(state.drinks.list().unwrap().is_empty());

        let error = delete_drink(State(state), manager(), Ok(Path(id)))
            .await
            .unwrap_err();
        assert_eq!(error.status.as_u16(), 404);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    extract::Request,
    handler::Handler,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_permission, Permission},
    error::ApiError,
    models::{
        CreateDrinkRequest, DeleteDrinkResponse, Drink, DrinkShort, DrinksResponse, Ingredient,
        RecipeInput, ShortDrinksResponse, ShortIngredient, UpdateDrinkRequest,
    },
    state::AppState,
};

pub mod drinks;
pub mod health;

pub fn router(state: AppState) -> Router {
    let guard = |permission: Permission| from_fn_with_state(state.guard(permission), require_permission);

    let routes = Router::new()
        .route(
            "/drinks",
            get(drinks::list_drinks)
                .post(drinks::create_drink.layer(guard(Permission::PostDrinks))),
        )
        .route(
            "/drinks-detail",
            get(drinks::list_drink_details.layer(guard(Permission::GetDrinksDetail))),
        )
        .route(
            "/drinks/{drink_id}",
            patch(drinks::update_drink.layer(guard(Permission::PatchDrinks)))
                .delete(drinks::delete_drink.layer(guard(Permission::DeleteDrinks))),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(RequestCounter::default()))
        .layer(CorsLayer::permissive())
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Sequential `x-request-id` values for requests that arrive without one.
#[derive(Clone, Default)]
struct RequestCounter {
    next: Arc<AtomicU64>,
}

impl MakeRequestId for RequestCounter {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        HeaderValue::from_str(&id.to_string()).ok().map(RequestId::new)
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        drinks::list_drinks,
        drinks::list_drink_details,
        drinks::create_drink,
        drinks::update_drink,
        drinks::delete_drink,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Ingredient,
            ShortIngredient,
            Drink,
            DrinkShort,
            RecipeInput,
            CreateDrinkRequest,
            UpdateDrinkRequest,
            ShortDrinksResponse,
            DrinksResponse,
            DeleteDrinkResponse,
            Permission,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Drinks", description = "Drink menu"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::test_support::{
        bearer, claims_for, claims_with, mint, test_authorizer, test_settings, token_for,
        SigningKey,
    };
    use crate::auth::{AuthError, Authorizer, Role, SigningKeyResolver};
    use crate::storage::DrinkStore;

    /// Resolver whose key endpoint is down.
    struct KeysUnavailable;

    #[async_trait::async_trait]
    impl SigningKeyResolver for KeysUnavailable {
        async fn resolve(&self, _kid: &str) -> Result<jsonwebtoken::DecodingKey, AuthError> {
            Err(AuthError::KeyFetch("connection refused".into()))
        }
    }

    fn app_with(authorizer: Authorizer) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = DrinkStore::open(&dir.path().join("drinks.redb")).unwrap();
        (router(AppState::new(store, authorizer)), dir)
    }

    fn app() -> (Router, tempfile::TempDir) {
        app_with(test_authorizer())
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, bearer(token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request) -> (StatusCode, Value) {
        let response: Response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn latte() -> Value {
        json!({
            "title": "latte",
            "recipe": [
                { "name": "espresso", "color": "brown", "parts": 1 },
                { "name": "steamed milk", "color": "white", "parts": 3 }
            ]
        })
    }

    #[tokio::test]
    async fn public_menu_needs_no_token() {
        let (app, _dir) = app();
        let (status, body) = send(&app, request(Method::GET, "/drinks", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "drinks": [] }));
    }

    #[tokio::test]
    async fn details_without_token_is_unauthorized() {
        let (app, _dir) = app();
        let (status, body) = send(&app, request(Method::GET, "/drinks-detail", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": 401,
                "message": "authorization header is expected"
            })
        );
    }

    #[tokio::test]
    async fn barista_reads_details_but_cannot_create() {
        let (app, _dir) = app();
        let token = token_for(&claims_for(Role::Barista));

        let (status, _) = send(
            &app,
            request(Method::GET, "/drinks-detail", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            request(Method::POST, "/drinks", Some(&token), Some(latte())),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Permission not found");
    }

    #[tokio::test]
    async fn manager_runs_full_menu_lifecycle() {
        let (app, _dir) = app();
        let token = token_for(&claims_for(Role::Manager));

        let (status, body) = send(
            &app,
            request(Method::POST, "/drinks", Some(&token), Some(latte())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["drinks"][0]["id"].as_u64().unwrap();

        let (_, body) = send(&app, request(Method::GET, "/drinks", None, None)).await;
        assert_eq!(
            body["drinks"][0]["recipe"],
            json!([{ "color": "brown", "parts": 1 }, { "color": "white", "parts": 3 }])
        );

        let (status, body) = send(
            &app,
            request(
                Method::PATCH,
                &format!("/drinks/{id}"),
                Some(&token),
                Some(json!({ "title": "flat white" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"][0]["title"], "flat white");

        let (status, body) = send(
            &app,
            request(Method::DELETE, &format!("/drinks/{id}"), Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "delete": id }));

        let (status, body) = send(
            &app,
            request(Method::DELETE, &format!("/drinks/{id}"), Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "resource not found");
    }

    #[tokio::test]
    async fn authorization_runs_before_body_parsing() {
        let (app, _dir) = app();
        let malformed = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/drinks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (app, _dir) = app();
        let token = token_for(&claims_for(Role::Manager));
        let malformed = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/drinks")
            .header(header::AUTHORIZATION, bearer(&token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Bad Request");
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let (app, _dir) = app();
        let token = mint(
            &claims_for(Role::Manager),
            Some("signing-key-1"),
            SigningKey::Foreign,
        );

        let (status, body) = send(
            &app,
            request(Method::GET, "/drinks-detail", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Unable to parse authentication token");
    }

    #[tokio::test]
    async fn token_without_permissions_claim_is_bad_request() {
        let (app, _dir) = app();
        let mut claims = claims_with(&[]);
        claims.as_object_mut().unwrap().remove("permissions");
        let token = token_for(&claims);

        let (status, body) = send(
            &app,
            request(Method::GET, "/drinks-detail", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Permissions not included in JWT");
    }

    #[tokio::test]
    async fn key_endpoint_outage_is_service_unavailable() {
        let (app, _dir) = app_with(Authorizer::new(Arc::new(KeysUnavailable), test_settings()));
        let token = token_for(&claims_for(Role::Manager));

        let (status, body) = send(
            &app,
            request(Method::POST, "/drinks", Some(&token), Some(latte())),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": 503,
                "message": "Unable to fetch signing keys"
            })
        );

        let (status, body) = send(&app, request(Method::GET, "/drinks", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"], json!([]));
    }

    #[tokio::test]
    async fn non_integer_id_is_not_found() {
        let (app, _dir) = app();
        let token = token_for(&claims_for(Role::Manager));

        let (status, _) = send(
            &app,
            request(Method::DELETE, "/drinks/latte", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (app, _dir) = app();
        let (status, body) = send(&app, request(Method::GET, "/menu", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "success": false, "error": 404, "message": "resource not found" })
        );
    }

    #[tokio::test]
    async fn wrong_method_is_not_allowed() {
        let (app, _dir) = app();
        let (status, body) = send(&app, request(Method::PUT, "/drinks", None, None)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], 405);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (app, _dir) = app();
        let response = app
            .oneshot(request(Method::GET, "/health/live", None, None))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn openapi_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(doc.paths.paths.contains_key("/drinks/{drink_id}"));
    }
}

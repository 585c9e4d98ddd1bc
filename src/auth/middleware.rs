// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission middleware for Axum.
//!
//! Each protected handler is wrapped with a [`PermissionGuard`] naming the
//! permission it needs. The guard runs the authorizer before the handler and
//! stores the verified [`ClaimSet`] in the request extensions, where the
//! [`Claims`](super::Claims) extractor picks it up.
//!
//! ```rust,ignore
//! let guard = PermissionGuard::new(authorizer, Permission::PostDrinks);
//! let route = post(create_drink.layer(from_fn_with_state(guard, require_permission)));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::authorizer::Authorizer;
use super::claims::ClaimSet;
use super::permissions::Permission;

/// Middleware state: the authorizer plus the permission a route requires.
#[derive(Clone)]
pub struct PermissionGuard {
    authorizer: Arc<Authorizer>,
    permission: Permission,
}

impl PermissionGuard {
    pub fn new(authorizer: Arc<Authorizer>, permission: Permission) -> Self {
        Self {
            authorizer,
            permission,
        }
    }
}

/// Authorize the request, then hand it to the wrapped handler.
///
/// Rejections are rendered directly and the handler never runs.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    match guard
        .authorizer
        .authorize(request.headers(), guard.permission.as_str())
        .await
    {
        Ok(claims) => {
            tracing::debug!(
                subject = claims.subject().unwrap_or("<none>"),
                permission = %guard.permission,
                "Request authorized"
            );
            request.extensions_mut().insert::<ClaimSet>(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use crate::auth::permissions::Role;
    use crate::auth::test_support::{bearer, claims_for, test_authorizer, token_for};
    use crate::auth::Claims;

    fn app(permission: Permission) -> Router {
        let guard = PermissionGuard::new(Arc::new(test_authorizer()), permission);
        Router::new().route(
            "/protected",
            get(|Claims(claims): Claims| async move {
                claims.subject().unwrap_or_default().to_string()
            })
            .route_layer(from_fn_with_state(guard, require_permission)),
        )
    }

    async fn call(app: Router, authorization: Option<String>) -> (StatusCode, String) {
        let mut request = HttpRequest::builder().uri("/protected");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn passes_claims_to_handler() {
        let token = token_for(&claims_for(Role::Barista));
        let (status, body) = call(app(Permission::GetDrinksDetail), Some(bearer(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "auth0|5f1a2b3c");
    }

    #[tokio::test]
    async fn rejection_skips_handler() {
        let token = token_for(&claims_for(Role::Barista));
        let (status, body) = call(app(Permission::DeleteDrinks), Some(bearer(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 403);
        assert_eq!(body["message"], "Permission not found");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (status, _) = call(app(Permission::GetDrinksDetail), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

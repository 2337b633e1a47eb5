//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`:
//! - Users, sessions and the current account
//! - Profiles and follows
//! - Articles, tags and share links
//! - Votes, favorites, bookmarks and ratings
//! - Comments and highlights
//! - Notifications
//! - Escalation of reported articles

pub mod articles;
pub mod auth;
pub mod comments;
pub mod common;
pub mod escalation;
pub mod highlights;
pub mod middleware;
pub mod notifications;
pub mod profiles;
pub mod reactions;
pub mod tags;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, Viewer};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a verified session)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(profiles::protected_router())
        .merge(articles::protected_router())
        .merge(reactions::protected_router())
        .merge(comments::protected_router())
        .merge(highlights::protected_router())
        .merge(notifications::protected_router())
        .merge(escalation::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a valid session still identifies the viewer
    let public_routes = Router::new()
        .merge(auth::public_router())
        .merge(profiles::public_router())
        .merge(articles::public_router())
        .merge(comments::public_router())
        .merge(tags::router())
        .merge(notifications::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    public_routes.merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = if cors_origin == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(_) => {
                tracing::warn!("Invalid CORS origin '{}', allowing any", cors_origin);
                AllowOrigin::any()
            }
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]);

    Router::new()
        .route("/api/v1/health", get(health))
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness plus a round trip to the database
async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.pool.ping().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, MemoryCache};
    use crate::config::Config;
    use crate::db::{create_test_pool, migrations::run_migrations};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));
        AppState::new(&Config::default(), pool, cache)
    }

    async fn test_router() -> Router {
        build_router(test_state().await, &Config::default().server.cors_origin)
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .await
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_closed_database() {
        let state = test_state().await;
        state.pool.close().await;
        let response = build_router(state, &Config::default().server.cors_origin)
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_protected_route_requires_session() {
        let response = test_router()
            .await
            .oneshot(Request::get("/api/v1/user").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_route_ignores_bad_session() {
        let response = test_router()
            .await
            .oneshot(
                Request::get("/api/v1/articles")
                    .header(header::AUTHORIZATION, "Bearer not-a-session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

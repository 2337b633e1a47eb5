//! Article API endpoints
//!
//! Handles HTTP requests for article management:
//! - GET /api/v1/articles - List articles (paginated, filterable)
//! - GET /api/v1/articles/{slug} - Get single article
//! - POST /api/v1/articles - Create article
//! - PATCH /api/v1/articles/{slug} - Update article
//! - DELETE /api/v1/articles/{slug} - Delete article
//! - GET /api/v1/articles/favorites/me - Articles the caller favorited
//! - GET /api/v1/articles/{slug}/share/{provider} - Share link

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_page_size, MessageResponse};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, Viewer};
use crate::models::{ArticleFilter, ArticleView, CreateArticleInput, ListParams, UpdateArticleInput};
use crate::services::{invalid_provider_message, ShareProvider};

/// Query parameters for listing articles
#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Substring of the author's username
    pub author: Option<String>,
    /// Substring of the title
    pub title: Option<String>,
    /// Comma separated tag names
    pub tags: Option<String>,
}

/// `{"article": {...}}` request body
#[derive(Debug, Deserialize)]
pub struct ArticleEnvelope<T> {
    #[serde(default)]
    pub article: T,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article: ArticleView,
}

#[derive(Debug, Serialize)]
pub struct ArticleResults {
    pub articles: Vec<ArticleView>,
}

/// Response for article list
#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub results: ArticleResults,
    #[serde(rename = "articlesCount")]
    pub articles_count: i64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<ArticleView>,
}

#[derive(Debug, Serialize)]
pub struct ShareLink {
    pub provider: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub share: ShareLink,
}

/// Build public article routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/{slug}", get(get_article))
        .route("/articles/{slug}/share/{provider}", get(share_article))
}

/// Build protected article routes
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/articles", axum::routing::post(create_article))
        .route("/articles/favorites/me", get(list_favorites))
        .route(
            "/articles/{slug}",
            axum::routing::patch(update_article).delete(delete_article),
        )
}

/// GET /api/v1/articles - List articles
///
/// Newest first. Asking for a page past the last one is a 404.
async fn list_articles(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let filter = ArticleFilter::from_query(
        query.author.as_deref(),
        query.title.as_deref(),
        query.tags.as_deref(),
    );

    let result = state
        .article_service
        .list(&filter, &params, viewer.user())
        .await?;

    Ok(Json(ArticleListResponse {
        results: ArticleResults {
            articles: result.items,
        },
        articles_count: result.total,
        page: result.page,
        page_size: result.per_page,
    }))
}

/// GET /api/v1/articles/{slug} - Get single article
async fn get_article(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state.article_service.get(&slug, viewer.user()).await?;
    Ok(Json(ArticleResponse { article }))
}

/// POST /api/v1/articles - Create article
async fn create_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<ArticleEnvelope<CreateArticleInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.create(&user, body.article).await?;
    Ok((StatusCode::CREATED, Json(ArticleResponse { article })))
}

/// PATCH /api/v1/articles/{slug} - Partial update, author only
async fn update_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    Json(body): Json<ArticleEnvelope<UpdateArticleInput>>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state
        .article_service
        .update(&slug, &user, body.article)
        .await?;
    Ok(Json(ArticleResponse { article }))
}

/// DELETE /api/v1/articles/{slug} - Delete article, author only
async fn delete_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.article_service.delete(&slug, &user).await?;
    Ok(Json(MessageResponse::new("Article deleted")))
}

/// GET /api/v1/articles/favorites/me
async fn list_favorites(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let favorites = state.article_service.favorites_of(&user).await?;
    Ok(Json(FavoritesResponse { favorites }))
}

/// GET /api/v1/articles/{slug}/share/{provider}
///
/// An unknown provider is answered with a 200 and a hint listing the valid ones.
async fn share_article(
    State(state): State<AppState>,
    Path((slug, provider)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let Ok(provider) = provider.parse::<ShareProvider>() else {
        return Ok(Json(MessageResponse::new(invalid_provider_message())).into_response());
    };

    let link = state.article_service.share_link(&slug, provider).await?;
    Ok(Json(ShareResponse {
        share: ShareLink {
            provider: provider.to_string(),
            link,
        },
    })
    .into_response())
}

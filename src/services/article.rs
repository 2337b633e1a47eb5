//! Article service
//!
//! Business logic for articles:
//! - create, update and delete with author-only permissions
//! - unique slugs derived from the title
//! - presentation with tags, author, read time, reactions and rating
//! - caching of the reader independent part of an article by slug
//! - follower notifications when an article is published

use crate::cache::{all_articles_pattern, article_key, Cache, CacheLayer};
use crate::db::repositories::{
    ArticleRepository, FavoriteRepository, ProfileRepository, RatingRepository, TagRepository,
    UserRepository, VoteRepository, VoteTarget,
};
use crate::models::{
    normalize_tag_list, round_rating, Article, ArticleFilter, ArticleSnapshot, ArticleView,
    AuthorSummary, CreateArticleInput, ListParams, PagedResult, UpdateArticleInput, User,
    ViewerFlags, VoteKind, DEFAULT_ARTICLE_IMAGE, MAX_TITLE_LENGTH,
};
use crate::services::notification::NotificationService;
use crate::services::profile::gravatar_url;
use crate::services::read_time::read_time;
use crate::services::share::{share_title, ShareProvider};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Longest accepted description
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

pub const ARTICLE_NOT_FOUND: &str = "Article does not exist";

#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("{0}")]
    NotFound(String),

    /// The caller does not own the article
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Invalid page.")]
    InvalidPage,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ArticleServiceError {
    fn not_found() -> Self {
        ArticleServiceError::NotFound(ARTICLE_NOT_FOUND.to_string())
    }
}

/// Repositories the article service reads from
pub struct ArticleRepos {
    pub articles: Arc<dyn ArticleRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub ratings: Arc<dyn RatingRepository>,
}

pub struct ArticleService {
    repos: ArticleRepos,
    cache: Arc<Cache>,
    notifications: Arc<NotificationService>,
    site_url: String,
    cache_ttl: Duration,
}

impl ArticleService {
    pub fn new(
        repos: ArticleRepos,
        cache: Arc<Cache>,
        notifications: Arc<NotificationService>,
        site_url: impl Into<String>,
    ) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repos,
            cache,
            notifications,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            cache_ttl,
        }
    }

    /// Publish a new article and notify the author's followers
    pub async fn create(
        &self,
        author: &User,
        input: CreateArticleInput,
    ) -> Result<ArticleView, ArticleServiceError> {
        let mut input = input;
        input.title = input.title.trim().to_string();
        validate_title(&input.title)?;
        validate_description(&input.description)?;
        if input.body.trim().is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Body may not be blank".to_string(),
            ));
        }
        input.image = normalize_image(input.image.take())?;
        if input.image.is_none() {
            input.image = Some(DEFAULT_ARTICLE_IMAGE.to_string());
        }

        let slug = self.unique_slug(&input.title, None).await?;
        let article = self
            .repos
            .articles
            .create(&slug, &input, author.id)
            .await
            .context("Failed to create article")?;

        let tags = normalize_tag_list(&input.tag_list);
        if !tags.is_empty() {
            self.repos
                .tags
                .set_article_tags(article.id, &tags)
                .await
                .context("Failed to tag article")?;
        }

        tracing::info!("{} published '{}'", author.username, article.slug);
        self.notifications.article_published(author, &article).await;

        self.view(&article, Some(author)).await
    }

    /// Article row by slug
    pub async fn find(&self, slug: &str) -> Result<Article, ArticleServiceError> {
        self.repos
            .articles
            .get_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
            .ok_or_else(ArticleServiceError::not_found)
    }

    /// Presented article for `viewer`
    pub async fn get(
        &self,
        slug: &str,
        viewer: Option<&User>,
    ) -> Result<ArticleView, ArticleServiceError> {
        let snapshot = self.snapshot_by_slug(slug).await?;
        let flags = self.viewer_flags(snapshot.article.id, viewer).await?;
        Ok(ArticleView::new(snapshot, flags))
    }

    /// One page of articles, newest first.
    ///
    /// The first page always exists; any later page past the end is an error.
    pub async fn list(
        &self,
        filter: &ArticleFilter,
        params: &ListParams,
        viewer: Option<&User>,
    ) -> Result<PagedResult<ArticleView>, ArticleServiceError> {
        let total = self
            .repos
            .articles
            .count(filter)
            .await
            .context("Failed to count articles")?;
        if params.page > 1 && params.offset() >= total {
            return Err(ArticleServiceError::InvalidPage);
        }

        let articles = self
            .repos
            .articles
            .list(filter, params.offset(), params.limit())
            .await
            .context("Failed to list articles")?;

        let mut views = Vec::with_capacity(articles.len());
        for article in &articles {
            views.push(self.view(article, viewer).await?);
        }
        Ok(PagedResult::new(views, total, params))
    }

    /// Partial update by the author
    pub async fn update(
        &self,
        slug: &str,
        caller: &User,
        input: UpdateArticleInput,
    ) -> Result<ArticleView, ArticleServiceError> {
        let mut article = self.find(slug).await?;
        if !caller.owns(article.author_id) {
            return Err(ArticleServiceError::Forbidden(
                "Cannot edit an article that is not yours".to_string(),
            ));
        }

        if let Some(title) = input.title.map(|t| t.trim().to_string()) {
            validate_title(&title)?;
            if title != article.title {
                article.slug = self.unique_slug(&title, Some(article.id)).await?;
                article.title = title;
            }
        }
        if let Some(description) = input.description {
            validate_description(&description)?;
            article.description = description;
        }
        if let Some(body) = input.body {
            if body.trim().is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Body may not be blank".to_string(),
                ));
            }
            article.body = body;
        }
        if let Some(image) = normalize_image(input.image)? {
            article.image = image;
        }

        let updated = self
            .repos
            .articles
            .update(&article)
            .await
            .context("Failed to update article")?;

        if let Some(tags) = input.tag_list {
            self.repos
                .tags
                .set_article_tags(updated.id, &normalize_tag_list(&tags))
                .await
                .context("Failed to retag article")?;
        }

        self.invalidate(slug).await;
        if updated.slug != slug {
            self.invalidate(&updated.slug).await;
        }
        self.view(&updated, Some(caller)).await
    }

    /// Delete by the author
    pub async fn delete(&self, slug: &str, caller: &User) -> Result<(), ArticleServiceError> {
        let article = self.find(slug).await?;
        if !caller.owns(article.author_id) {
            return Err(ArticleServiceError::Forbidden(
                "Cannot delete an article that is not yours".to_string(),
            ));
        }
        self.remove(&article).await
    }

    /// Delete without an ownership check; callers authorize first
    pub async fn remove(&self, article: &Article) -> Result<(), ArticleServiceError> {
        let deleted = self
            .repos
            .articles
            .delete(article.id)
            .await
            .context("Failed to delete article")?;
        if !deleted {
            return Err(ArticleServiceError::not_found());
        }
        self.invalidate(&article.slug).await;
        tracing::info!("Deleted article '{}'", article.slug);
        Ok(())
    }

    /// Articles `user` has favorited
    pub async fn favorites_of(&self, user: &User) -> Result<Vec<ArticleView>, ArticleServiceError> {
        let articles = self
            .repos
            .articles
            .list_favorited_by(user.id)
            .await
            .context("Failed to list favorites")?;
        let mut views = Vec::with_capacity(articles.len());
        for article in &articles {
            views.push(self.view(article, Some(user)).await?);
        }
        Ok(views)
    }

    /// Every tag name in use
    pub async fn tags(&self) -> Result<Vec<String>, ArticleServiceError> {
        let tags = self
            .repos
            .tags
            .list_names()
            .await
            .context("Failed to list tags")?;
        if tags.is_empty() {
            return Err(ArticleServiceError::NotFound(
                "There are no tags in Authors Heaven at the moment".to_string(),
            ));
        }
        Ok(tags)
    }

    /// Share link for an article on `provider`
    pub async fn share_link(
        &self,
        slug: &str,
        provider: ShareProvider,
    ) -> Result<String, ArticleServiceError> {
        let snapshot = self.snapshot_by_slug(slug).await?;
        let url = format!("{}/articles/{}", self.site_url, snapshot.article.slug);
        let title = share_title(&snapshot.article.title, &snapshot.author.username);
        Ok(provider.link(&url, &title))
    }

    /// Drop the cached copy of one article
    pub async fn invalidate(&self, slug: &str) {
        if let Err(e) = self.cache.delete(&article_key(slug)).await {
            tracing::warn!("Failed to invalidate cached article {}: {}", slug, e);
        }
    }

    /// Drop every cached article, e.g. after an author's profile changed
    pub async fn invalidate_all(&self) {
        if let Err(e) = self.cache.delete_pattern(&all_articles_pattern()).await {
            tracing::warn!("Failed to invalidate cached articles: {}", e);
        }
    }

    // ========================================================================
    // Presentation
    // ========================================================================

    async fn view(
        &self,
        article: &Article,
        viewer: Option<&User>,
    ) -> Result<ArticleView, ArticleServiceError> {
        let snapshot = match self.cached(&article.slug).await {
            Some(s) => s,
            None => self.build_snapshot(article.clone()).await?,
        };
        let flags = self.viewer_flags(article.id, viewer).await?;
        Ok(ArticleView::new(snapshot, flags))
    }

    async fn snapshot_by_slug(&self, slug: &str) -> Result<ArticleSnapshot, ArticleServiceError> {
        if let Some(snapshot) = self.cached(slug).await {
            return Ok(snapshot);
        }
        let article = self.find(slug).await?;
        self.build_snapshot(article).await
    }

    async fn cached(&self, slug: &str) -> Option<ArticleSnapshot> {
        match self.cache.get::<ArticleSnapshot>(&article_key(slug)).await {
            Ok(Some(snapshot)) => {
                tracing::debug!("Article cache hit: {}", slug);
                Some(snapshot)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Article cache read failed for {}: {}", slug, e);
                None
            }
        }
    }

    async fn build_snapshot(&self, article: Article) -> Result<ArticleSnapshot, ArticleServiceError> {
        let tag_list = self
            .repos
            .tags
            .get_for_article(article.id)
            .await
            .context("Failed to load tags")?;
        let author = self.author_summary(article.author_id).await?;
        let counts = self
            .repos
            .votes
            .counts(VoteTarget::Article, article.id)
            .await
            .context("Failed to count votes")?;
        let favorites_count = self
            .repos
            .favorites
            .count(article.id)
            .await
            .context("Failed to count favorites")?;
        let average_rating = self
            .repos
            .ratings
            .average(article.id)
            .await
            .context("Failed to average ratings")?
            .map(round_rating);

        let readtime = read_time(&article.title, &article.body, &article.description, &tag_list);
        let snapshot = ArticleSnapshot {
            article,
            tag_list,
            author,
            readtime,
            likes: counts.likes,
            dislikes: counts.dislikes,
            favorites_count,
            average_rating,
        };

        if let Err(e) = self
            .cache
            .set(&article_key(&snapshot.article.slug), &snapshot, self.cache_ttl)
            .await
        {
            tracing::warn!("Failed to cache article {}: {}", snapshot.article.slug, e);
        }
        Ok(snapshot)
    }

    async fn author_summary(&self, author_id: i64) -> Result<AuthorSummary, ArticleServiceError> {
        let user = self
            .repos
            .users
            .get_by_id(author_id)
            .await
            .context("Failed to load author")?
            .ok_or_else(|| anyhow::anyhow!("Article author {} is missing", author_id))?;
        let profile = self
            .repos
            .profiles
            .get(author_id)
            .await
            .context("Failed to load author profile")?;
        Ok(AuthorSummary {
            username: user.username,
            bio: profile.as_ref().map(|p| p.bio.clone()).unwrap_or_default(),
            image: profile
                .and_then(|p| p.image)
                .or_else(|| Some(gravatar_url(&user.email))),
        })
    }

    async fn viewer_flags(
        &self,
        article_id: i64,
        viewer: Option<&User>,
    ) -> Result<ViewerFlags, ArticleServiceError> {
        let Some(viewer) = viewer else {
            return Ok(ViewerFlags::default());
        };
        let favorited = self
            .repos
            .favorites
            .exists(viewer.id, article_id)
            .await
            .context("Failed to check favorite")?;
        let vote = self
            .repos
            .votes
            .get(VoteTarget::Article, viewer.id, article_id)
            .await
            .context("Failed to load vote")?;
        Ok(ViewerFlags {
            favorited,
            liked: vote == Some(VoteKind::Like),
            disliked: vote == Some(VoteKind::Dislike),
        })
    }

    /// Slug for `title` that no other article uses
    async fn unique_slug(
        &self,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, ArticleServiceError> {
        let base = generate_slug(title);
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self
            .repos
            .articles
            .exists_by_slug(&candidate, exclude_id)
            .await
            .context("Failed to check slug")?
        {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}

fn validate_title(title: &str) -> Result<(), ArticleServiceError> {
    if title.is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Title may not be blank".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ArticleServiceError::ValidationError(format!(
            "Title cannot be more than {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ArticleServiceError> {
    if description.trim().is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Description may not be blank".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ArticleServiceError::ValidationError(format!(
            "Description cannot be more than {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

/// Blank means "not given"; anything else must be an http(s) URL
fn normalize_image(image: Option<String>) -> Result<Option<String>, ArticleServiceError> {
    match image.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()) {
        None => Ok(None),
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(Some(url)),
        Some(_) => Err(ArticleServiceError::ValidationError(
            "Image must be a valid URL".to_string(),
        )),
    }
}

/// Generate a URL-friendly slug from a title.
///
/// Lowercases, keeps ASCII alphanumerics and non-ASCII letters, and turns
/// every other run of characters into a single hyphen.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || (!c.is_ascii() && c.is_alphanumeric()) {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_hyphen = false;
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};
    use crate::db::DynDatabasePool;
    use crate::services::test_support::{article_service, notification_service};

    async fn setup_test_service() -> (DynDatabasePool, Arc<ArticleService>) {
        let pool = setup_pool().await;
        let service = article_service(&pool, notification_service(&pool)).await;
        (pool, service)
    }

    fn input(title: &str) -> CreateArticleInput {
        CreateArticleInput::new(title, "A description", "Body of the article")
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Rust: the  Good Parts! "), "rust-the-good-parts");
        assert_eq!(generate_slug("snake_case_title"), "snake-case-title");
        assert_eq!(generate_slug("Café au lait"), "café-au-lait");
        assert_eq!(generate_slug("!!!"), "article");
    }

    #[tokio::test]
    async fn test_create_article() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;

        let view = service
            .create(&ada, input("Hello World").with_tags(["rust", " web ", "rust"]))
            .await
            .unwrap();

        assert_eq!(view.slug, "hello-world");
        assert_eq!(view.tag_list, vec!["rust", "web"]);
        assert_eq!(view.author.username, "ada");
        assert_eq!(view.image, DEFAULT_ARTICLE_IMAGE);
        assert_eq!(view.readtime, "2 seconds");
        assert_eq!(view.average_rating, None);
        assert!(!view.favorited);
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_numbered_slugs() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;

        let first = service.create(&ada, input("Same Title")).await.unwrap();
        let second = service.create(&ada, input("Same Title")).await.unwrap();
        let third = service.create(&ada, input("Same Title")).await.unwrap();

        assert_eq!(first.slug, "same-title");
        assert_eq!(second.slug, "same-title-1");
        assert_eq!(third.slug, "same-title-2");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;

        for bad in [
            input(""),
            input(&"t".repeat(MAX_TITLE_LENGTH + 1)),
            CreateArticleInput::new("Title", "", "Body"),
            CreateArticleInput::new("Title", "Desc", "   "),
        ] {
            assert!(matches!(
                service.create(&ada, bad).await,
                Err(ArticleServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_get_missing_article() {
        let (_pool, service) = setup_test_service().await;
        let err = service.get("nope", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Article does not exist");
    }

    #[tokio::test]
    async fn test_update_regenerates_slug_and_keeps_tags() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        service
            .create(&ada, input("Old Title").with_tags(["rust"]))
            .await
            .unwrap();

        let updated = service
            .update(
                "old-title",
                &ada,
                UpdateArticleInput {
                    title: Some("New Title".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "new-title");
        assert_eq!(updated.tag_list, vec!["rust"]);
        assert!(service.get("old-title", None).await.is_err());

        let retagged = service
            .update(
                "new-title",
                &ada,
                UpdateArticleInput {
                    tag_list: Some(vec!["web".to_string(), "api".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retagged.tag_list, vec!["web", "api"]);
        assert_eq!(retagged.slug, "new-title");
    }

    #[tokio::test]
    async fn test_update_and_delete_require_author() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        service.create(&ada, input("Mine")).await.unwrap();

        let err = service
            .update("mine", &bob, UpdateArticleInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot edit an article that is not yours");

        let err = service.delete("mine", &bob).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete an article that is not yours");

        service.delete("mine", &ada).await.unwrap();
        assert!(matches!(
            service.get("mine", None).await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_snapshot_invalidated_on_update() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        service.create(&ada, input("Cached")).await.unwrap();
        service.get("cached", None).await.unwrap();

        service
            .update(
                "cached",
                &ada,
                UpdateArticleInput {
                    body: Some("Fresh body".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(service.get("cached", None).await.unwrap().body, "Fresh body");
    }

    #[tokio::test]
    async fn test_list_pagination_and_filters() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        for i in 0..3 {
            service
                .create(&ada, input(&format!("Ada post {}", i)).with_tags(["rust"]))
                .await
                .unwrap();
        }
        service
            .create(&bob, input("Bob on gardening").with_tags(["garden"]))
            .await
            .unwrap();

        let all = service
            .list(&ArticleFilter::default(), &ListParams::new(1, 10), None)
            .await
            .unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(all.items[0].title, "Bob on gardening");

        let page2 = service
            .list(&ArticleFilter::default(), &ListParams::new(2, 3), None)
            .await
            .unwrap();
        assert_eq!(page2.items.len(), 1);

        let beyond = service
            .list(&ArticleFilter::default(), &ListParams::new(3, 3), None)
            .await;
        assert!(matches!(beyond, Err(ArticleServiceError::InvalidPage)));

        let by_author = ArticleFilter::from_query(Some("AD"), None, None);
        let result = service.list(&by_author, &ListParams::default(), None).await.unwrap();
        assert_eq!(result.total, 3);

        let by_tag = ArticleFilter::from_query(None, None, Some("garden,missing"));
        let result = service.list(&by_tag, &ListParams::default(), None).await.unwrap();
        assert_eq!(result.total, 1);

        let by_title = ArticleFilter::from_query(None, Some("gardening"), None);
        let result = service.list(&by_title, &ListParams::default(), None).await.unwrap();
        assert_eq!(result.items[0].author.username, "bob");
    }

    #[tokio::test]
    async fn test_empty_first_page_is_valid() {
        let (_pool, service) = setup_test_service().await;
        let page = service
            .list(&ArticleFilter::default(), &ListParams::default(), None)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_tags_listing() {
        let (pool, service) = setup_test_service().await;
        let err = service.tags().await.unwrap_err();
        assert_eq!(err.to_string(), "There are no tags in Authors Heaven at the moment");

        let ada = insert_user(&pool, "ada").await;
        service
            .create(&ada, input("Tagged").with_tags(["web", "api"]))
            .await
            .unwrap();
        assert_eq!(service.tags().await.unwrap(), vec!["api", "web"]);
    }

    #[tokio::test]
    async fn test_share_link() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        service.create(&ada, input("Share Me")).await.unwrap();

        let link = service
            .share_link("share-me", ShareProvider::Facebook)
            .await
            .unwrap();
        assert_eq!(
            link,
            "https://www.facebook.com/sharer/sharer.php?u=http%3A%2F%2Flocalhost%3A8080%2Farticles%2Fshare-me"
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn slug_is_url_safe(title in "\\PC{0,60}") {
                let slug = generate_slug(&title);
                prop_assert!(!slug.is_empty());
                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert!(slug.chars().all(|c| c == '-' || c.is_alphanumeric()));
                prop_assert!(!slug.chars().any(|c| c.is_ascii_uppercase()));
            }

            #[test]
            fn slug_is_stable(title in "[A-Za-z0-9 ]{1,40}") {
                let slug = generate_slug(&title);
                prop_assert_eq!(generate_slug(&slug), slug);
            }
        }
    }
}

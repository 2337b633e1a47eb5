//! Fixtures shared by the repository tests

use super::{ArticleRepository, SqlxArticleRepository, SqlxUserRepository, UserRepository};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{Article, CreateArticleInput, User, UserRole};

/// Migrated in-memory database
pub async fn setup_pool() -> DynDatabasePool {
    let pool = create_test_pool()
        .await
        .expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> User {
    let user = User::new(
        username.to_string(),
        format!("{}@example.com", username),
        "hash".to_string(),
        UserRole::User,
    );
    SqlxUserRepository::new(pool.clone())
        .create(&user)
        .await
        .expect("Failed to insert user")
}

pub async fn insert_article(pool: &DynDatabasePool, author_id: i64, slug: &str) -> Article {
    let input = CreateArticleInput::new(
        format!("Title of {}", slug),
        "A short description",
        "Some body text for the article",
    );
    SqlxArticleRepository::new(pool.clone())
        .create(slug, &input, author_id)
        .await
        .expect("Failed to insert article")
}

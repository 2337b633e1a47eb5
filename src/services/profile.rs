//! Profile service
//!
//! Public profiles and the follow graph.

use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::models::{Profile, ProfileView, UpdateProfileInput, User, MAX_BIO_LENGTH, MAX_NAME_LENGTH};
use anyhow::Context;
use std::sync::Arc;

const USER_NOT_FOUND: &str = "User does not exist";
const FOLLOW_TARGET_NOT_FOUND: &str = "User with that username Not found";

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ProfileService {
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(user_repo: Arc<dyn UserRepository>, profile_repo: Arc<dyn ProfileRepository>) -> Self {
        Self {
            user_repo,
            profile_repo,
        }
    }

    /// Profile of `username` as seen by `viewer`
    pub async fn get_profile(
        &self,
        username: &str,
        viewer: Option<&User>,
    ) -> Result<ProfileView, ProfileServiceError> {
        let user = self.find_user(username, USER_NOT_FOUND).await?;
        let following = match viewer {
            Some(v) if v.id != user.id => self
                .profile_repo
                .is_following(v.id, user.id)
                .await
                .context("Failed to check follow")?,
            _ => false,
        };
        let profile = self.load_profile(user.id).await?;
        Ok(ProfileView::new(user.username, profile, following))
    }

    /// Update the caller's own profile
    pub async fn update_profile(
        &self,
        username: &str,
        caller: &User,
        input: UpdateProfileInput,
    ) -> Result<ProfileView, ProfileServiceError> {
        let user = self.find_user(username, USER_NOT_FOUND).await?;
        if !caller.owns(user.id) {
            return Err(ProfileServiceError::Forbidden(
                "You do not own this profile".to_string(),
            ));
        }
        validate_profile_input(&input)?;

        let mut profile = self.load_profile(user.id).await?;
        profile.apply(input);
        let saved = self
            .profile_repo
            .update(&profile)
            .await
            .context("Failed to update profile")?;
        Ok(ProfileView::new(user.username, saved, false))
    }

    /// Follow `username`, returning the confirmation message
    pub async fn follow(&self, caller: &User, username: &str) -> Result<String, ProfileServiceError> {
        let target = self.find_user(username, FOLLOW_TARGET_NOT_FOUND).await?;
        if target.id == caller.id {
            return Err(ProfileServiceError::ValidationError(
                "You cannot follow yourself".to_string(),
            ));
        }
        let added = self
            .profile_repo
            .follow(caller.id, target.id)
            .await
            .context("Failed to follow user")?;
        if !added {
            return Err(ProfileServiceError::ValidationError(format!(
                "You already follow {}",
                target.username
            )));
        }
        Ok(format!("You now follow {}", target.username))
    }

    pub async fn unfollow(&self, caller: &User, username: &str) -> Result<String, ProfileServiceError> {
        let target = self.find_user(username, FOLLOW_TARGET_NOT_FOUND).await?;
        let removed = self
            .profile_repo
            .unfollow(caller.id, target.id)
            .await
            .context("Failed to unfollow user")?;
        if !removed {
            return Err(ProfileServiceError::ValidationError(format!(
                "You do not follow {}",
                target.username
            )));
        }
        Ok(format!("You have unfollowed {}", target.username))
    }

    /// Usernames `username` follows
    pub async fn following(&self, username: &str) -> Result<Vec<String>, ProfileServiceError> {
        let user = self.find_user(username, FOLLOW_TARGET_NOT_FOUND).await?;
        let names = self
            .profile_repo
            .following(user.id)
            .await
            .context("Failed to list following")?;
        Ok(names)
    }

    /// Usernames following `username`
    pub async fn followers(&self, username: &str) -> Result<Vec<String>, ProfileServiceError> {
        let user = self.find_user(username, FOLLOW_TARGET_NOT_FOUND).await?;
        let names = self
            .profile_repo
            .followers(user.id)
            .await
            .context("Failed to list followers")?;
        Ok(names)
    }

    async fn find_user(&self, username: &str, missing: &str) -> Result<User, ProfileServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| ProfileServiceError::NotFound(missing.to_string()))
    }

    async fn load_profile(&self, user_id: i64) -> Result<Profile, ProfileServiceError> {
        let profile = self
            .profile_repo
            .get(user_id)
            .await
            .context("Failed to get profile")?;
        Ok(profile.unwrap_or_else(|| Profile::empty(user_id)))
    }
}

fn validate_profile_input(input: &UpdateProfileInput) -> Result<(), ProfileServiceError> {
    for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
        if value.as_ref().is_some_and(|v| v.chars().count() > MAX_NAME_LENGTH) {
            return Err(ProfileServiceError::ValidationError(format!(
                "Ensure {} has no more than {} characters",
                field, MAX_NAME_LENGTH
            )));
        }
    }
    if input.bio.as_ref().is_some_and(|b| b.chars().count() > MAX_BIO_LENGTH) {
        return Err(ProfileServiceError::ValidationError(format!(
            "Ensure bio has no more than {} characters",
            MAX_BIO_LENGTH
        )));
    }
    if let Some(image) = input.image.as_deref().map(str::trim) {
        if !image.is_empty() && !(image.starts_with("http://") || image.starts_with("https://")) {
            return Err(ProfileServiceError::ValidationError(
                "Image must be a valid URL".to_string(),
            ));
        }
    }
    Ok(())
}

/// Gravatar image for an email address, used when a profile has no image
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase());
    format!("https://www.gravatar.com/avatar/{:x}?d=identicon", digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};
    use crate::db::repositories::{SqlxProfileRepository, SqlxUserRepository};
    use crate::db::DynDatabasePool;

    async fn setup_test_service() -> (DynDatabasePool, ProfileService) {
        let pool = setup_pool().await;
        let service = ProfileService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxProfileRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    #[test]
    fn test_gravatar_url_ignores_case_and_whitespace() {
        let url = gravatar_url(" Ada@Example.com ");
        assert_eq!(url, gravatar_url("ada@example.com"));
        assert!(url.starts_with("https://www.gravatar.com/avatar/"));
        assert!(url.ends_with("?d=identicon"));
    }

    #[tokio::test]
    async fn test_get_profile_following_flag() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;

        let view = service.get_profile("ada", Some(&bob)).await.unwrap();
        assert_eq!(view.username, "ada");
        assert!(!view.following);

        service.follow(&bob, "ada").await.unwrap();
        assert!(service.get_profile("ada", Some(&bob)).await.unwrap().following);
        assert!(!service.get_profile("ada", None).await.unwrap().following);
        assert!(!service.get_profile("ada", Some(&ada)).await.unwrap().following);

        let missing = service.get_profile("nobody", None).await.unwrap_err();
        assert_eq!(missing.to_string(), "User does not exist");
    }

    #[tokio::test]
    async fn test_update_profile_owner_only() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;

        let input = UpdateProfileInput {
            bio: Some("Writes about engines".to_string()),
            ..Default::default()
        };
        let err = service
            .update_profile("ada", &bob, input.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileServiceError::Forbidden(_)));

        let view = service.update_profile("ada", &ada, input).await.unwrap();
        assert_eq!(view.bio, "Writes about engines");
    }

    #[tokio::test]
    async fn test_update_profile_validation() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;

        let long_name = UpdateProfileInput {
            first_name: Some("x".repeat(MAX_NAME_LENGTH + 1)),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile("ada", &ada, long_name).await,
            Err(ProfileServiceError::ValidationError(_))
        ));

        let bad_image = UpdateProfileInput {
            image: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile("ada", &ada, bad_image).await,
            Err(ProfileServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_rules() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        insert_user(&pool, "bob").await;

        assert_eq!(service.follow(&ada, "bob").await.unwrap(), "You now follow bob");
        assert_eq!(
            service.follow(&ada, "bob").await.unwrap_err().to_string(),
            "You already follow bob"
        );
        assert_eq!(
            service.follow(&ada, "ada").await.unwrap_err().to_string(),
            "You cannot follow yourself"
        );
        assert_eq!(
            service.follow(&ada, "ghost").await.unwrap_err().to_string(),
            "User with that username Not found"
        );
    }

    #[tokio::test]
    async fn test_unfollow_and_lists() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        insert_user(&pool, "cy").await;

        service.follow(&ada, "cy").await.unwrap();
        service.follow(&bob, "cy").await.unwrap();

        assert_eq!(service.followers("cy").await.unwrap(), vec!["ada", "bob"]);
        assert_eq!(service.following("ada").await.unwrap(), vec!["cy"]);

        assert_eq!(
            service.unfollow(&ada, "cy").await.unwrap(),
            "You have unfollowed cy"
        );
        assert_eq!(
            service.unfollow(&ada, "cy").await.unwrap_err().to_string(),
            "You do not follow cy"
        );
        assert_eq!(service.followers("cy").await.unwrap(), vec!["bob"]);
    }
}

//! Profile and follow models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of first and last names
pub const MAX_NAME_LENGTH: usize = 30;
/// Maximum length of a bio
pub const MAX_BIO_LENGTH: usize = 500;

/// Public profile attached 1:1 to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Empty profile for a freshly registered user
    pub fn empty(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, input: UpdateProfileInput) {
        if let Some(first_name) = input.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            self.last_name = last_name;
        }
        if let Some(bio) = input.bio {
            self.bio = bio;
        }
        if let Some(image) = input.image {
            self.image = Some(image).filter(|i| !i.trim().is_empty());
        }
    }
}

/// Partial profile update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// Profile as seen by another user
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub image: Option<String>,
    /// Whether the viewer follows this profile
    pub following: bool,
}

impl ProfileView {
    pub fn new(username: String, profile: Profile, following: bool) -> Self {
        Self {
            username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            image: profile.image,
            following,
        }
    }
}

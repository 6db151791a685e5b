use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub banned_until: Option<OffsetDateTime>,
    pub ban_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The shape other users see: no ban bookkeeping, no admin flag.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            bio: user.bio,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
        }
    }
}

/// A profile with its populated relation lists, mirroring what the API
/// returns for `GET /api/users/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub recipes: Vec<RecipeRef>,
    pub favorites: Vec<RecipeRef>,
    pub followers: Vec<PublicUser>,
    pub following: Vec<PublicUser>,
}

/// Minimal recipe reference used when populating user profiles.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRef {
    pub id: Uuid,
    pub name: String,
}

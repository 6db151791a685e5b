use sqlx::Row;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::{hash_password, user_from_row, verify_password};
use crate::domain::user::{PublicUser, RecipeRef, User, UserProfile};
use crate::infra::db::Db;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username or email already taken")]
    Duplicate,
    #[error("Cannot ban an administrator")]
    BanAdmin,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_active(&self) -> Result<Vec<User>, UserError> {
        let rows = sqlx::query(
            "SELECT id, username, email, bio, profile_picture, is_active, is_admin, \
                    banned_until, ban_reason, created_at \
             FROM users WHERE is_active ORDER BY created_at DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Fetch a profile with its populated relation lists. Deactivated
    /// accounts are invisible.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, UserError> {
        let row = sqlx::query(
            "SELECT id, username, email, bio, profile_picture, is_active, is_admin, \
                    banned_until, ban_reason, created_at \
             FROM users WHERE id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(UserError::NotFound)?;

        let user = user_from_row(&row);

        let recipes = self
            .recipe_refs(
                "SELECT id, name FROM recipes WHERE user_id = $1 ORDER BY created_at DESC",
                user_id,
            )
            .await?;
        let favorites = self
            .recipe_refs(
                "SELECT r.id, r.name FROM favorites f \
                 JOIN recipes r ON r.id = f.recipe_id \
                 WHERE f.user_id = $1 ORDER BY f.created_at DESC",
                user_id,
            )
            .await?;
        let followers = self
            .user_edges(
                "SELECT u.id, u.username, u.bio, u.profile_picture, u.created_at \
                 FROM follows f JOIN users u ON u.id = f.follower_id \
                 WHERE f.followee_id = $1 AND u.is_active \
                 ORDER BY f.created_at DESC",
                user_id,
            )
            .await?;
        let following = self
            .user_edges(
                "SELECT u.id, u.username, u.bio, u.profile_picture, u.created_at \
                 FROM follows f JOIN users u ON u.id = f.followee_id \
                 WHERE f.follower_id = $1 AND u.is_active \
                 ORDER BY f.created_at DESC",
                user_id,
            )
            .await?;

        Ok(UserProfile {
            user: user.into(),
            recipes,
            favorites,
            followers,
            following,
        })
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: ProfilePatch,
    ) -> Result<User, UserError> {
        if patch.username.is_some() || patch.email.is_some() {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users \
                 WHERE (username = $1 OR email = $2) AND id <> $3)",
            )
            .bind(patch.username.as_deref().unwrap_or(""))
            .bind(patch.email.as_deref().unwrap_or(""))
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
            if taken {
                return Err(UserError::Duplicate);
            }
        }

        let row = sqlx::query(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                bio = COALESCE($4, bio), \
                profile_picture = COALESCE($5, profile_picture) \
             WHERE id = $1 AND is_active \
             RETURNING id, username, email, bio, profile_picture, is_active, is_admin, \
                       banned_until, ban_reason, created_at",
        )
        .bind(user_id)
        .bind(patch.username)
        .bind(patch.email)
        .bind(patch.bio)
        .bind(patch.profile_picture)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(UserError::NotFound)?;

        Ok(user_from_row(&row))
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE id = $1 AND is_active")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(UserError::NotFound)?;

        let current_hash: String = row.get("password_hash");
        if !verify_password(old_password, &current_hash)? {
            return Err(UserError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(new_hash)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Soft delete. Credentials are re-verified so a leaked token alone
    /// cannot close an account.
    pub async fn deactivate(&self, identifier: &str, password: &str) -> Result<(), UserError> {
        let row = sqlx::query(
            "SELECT id, password_hash, is_active FROM users \
             WHERE username = $1 OR email = $1",
        )
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(UserError::NotFound)?;

        let is_active: bool = row.get("is_active");
        if !is_active {
            return Err(UserError::NotFound);
        }

        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Err(UserError::InvalidCredentials);
        }

        let user_id: Uuid = row.get("id");
        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// The expiry is computed once, at ban time, and stored absolute.
    pub async fn ban(
        &self,
        user_id: Uuid,
        until: OffsetDateTime,
        reason: Option<String>,
    ) -> Result<User, UserError> {
        let is_admin: Option<bool> =
            sqlx::query_scalar("SELECT is_admin FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;

        match is_admin {
            None => return Err(UserError::NotFound),
            Some(true) => return Err(UserError::BanAdmin),
            Some(false) => {}
        }

        let row = sqlx::query(
            "UPDATE users SET banned_until = $2, ban_reason = $3 \
             WHERE id = $1 \
             RETURNING id, username, email, bio, profile_picture, is_active, is_admin, \
                       banned_until, ban_reason, created_at",
        )
        .bind(user_id)
        .bind(until)
        .bind(reason)
        .fetch_one(self.db.pool())
        .await?;

        Ok(user_from_row(&row))
    }

    pub async fn unban(&self, user_id: Uuid) -> Result<User, UserError> {
        let row = sqlx::query(
            "UPDATE users SET banned_until = NULL, ban_reason = NULL \
             WHERE id = $1 \
             RETURNING id, username, email, bio, profile_picture, is_active, is_admin, \
                       banned_until, ban_reason, created_at",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(UserError::NotFound)?;

        Ok(user_from_row(&row))
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, UserError> {
        let is_admin: Option<bool> =
            sqlx::query_scalar("SELECT is_admin FROM users WHERE id = $1 AND is_active")
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(is_admin.unwrap_or(false))
    }

    async fn recipe_refs(&self, sql: &str, user_id: Uuid) -> Result<Vec<RecipeRef>, UserError> {
        let rows = sqlx::query(sql)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RecipeRef {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn user_edges(&self, sql: &str, user_id: Uuid) -> Result<Vec<PublicUser>, UserError> {
        let rows = sqlx::query(sql)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| PublicUser {
                id: row.get("id"),
                username: row.get("username"),
                bio: row.get("bio"),
                profile_picture: row.get("profile_picture"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

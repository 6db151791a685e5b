use thiserror::Error;
use uuid::Uuid;

use crate::infra::db::Db;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("You cannot follow yourself")]
    SelfFollow,
    #[error("User not found")]
    UserNotFound,
    #[error("Recipe not found")]
    RecipeNotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Resulting state of a toggle, so callers never need a second read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Added,
    Removed,
}

impl ToggleState {
    pub fn added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Follow if absent, unfollow if present. Both edges of the relation
    /// (follower's "following", followee's "followers") are the same row,
    /// so they can never disagree.
    pub async fn toggle_follow(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<ToggleState, SocialError> {
        if follower_id == followee_id {
            return Err(SocialError::SelfFollow);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND is_active)",
        )
        .bind(followee_id)
        .fetch_one(self.db.pool())
        .await?;
        if !exists {
            return Err(SocialError::UserNotFound);
        }

        self.toggle(
            "INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2",
            follower_id,
            followee_id,
        )
        .await
    }

    pub async fn toggle_favorite(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<ToggleState, SocialError> {
        self.ensure_recipe(recipe_id).await?;
        self.toggle(
            "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2",
            user_id,
            recipe_id,
        )
        .await
    }

    pub async fn toggle_recipe_like(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<ToggleState, SocialError> {
        self.ensure_recipe(recipe_id).await?;
        self.toggle(
            "INSERT INTO recipe_likes (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM recipe_likes WHERE user_id = $1 AND recipe_id = $2",
            user_id,
            recipe_id,
        )
        .await
    }

    /// Atomic add-or-remove: the conditional DELETE runs in the same
    /// transaction as the INSERT attempt, so two racing toggles cannot
    /// both observe "absent" and end up with a duplicate or a lost edge.
    async fn toggle(
        &self,
        insert_sql: &str,
        delete_sql: &str,
        left: Uuid,
        right: Uuid,
    ) -> Result<ToggleState, SocialError> {
        let mut tx = self.db.pool().begin().await?;

        let inserted = sqlx::query(insert_sql)
            .bind(left)
            .bind(right)
            .execute(&mut *tx)
            .await?;

        let state = if inserted.rows_affected() > 0 {
            ToggleState::Added
        } else {
            sqlx::query(delete_sql)
                .bind(left)
                .bind(right)
                .execute(&mut *tx)
                .await?;
            ToggleState::Removed
        };

        tx.commit().await?;
        Ok(state)
    }

    async fn ensure_recipe(&self, recipe_id: Uuid) -> Result<(), SocialError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)")
                .bind(recipe_id)
                .fetch_one(self.db.pool())
                .await?;
        if exists {
            Ok(())
        } else {
            Err(SocialError::RecipeNotFound)
        }
    }
}

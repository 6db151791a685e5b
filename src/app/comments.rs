use std::collections::HashMap;

use sqlx::Row;
use thiserror::Error;
use uuid::Uuid;

use crate::app::social::ToggleState;
use crate::domain::recipe::{Comment, Reply};
use crate::infra::db::Db;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Recipe not found")]
    RecipeNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Reply not found")]
    ReplyNotFound,
    #[error("Only the comment author or the recipe owner can do that")]
    Forbidden,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn add_comment(
        &self,
        recipe_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Comment, CommentError> {
        self.ensure_recipe(recipe_id).await?;

        let row = sqlx::query(
            "INSERT INTO comments (recipe_id, user_id, body) \
             VALUES ($1, $2, $3) \
             RETURNING id, created_at",
        )
        .bind(recipe_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        let username: Option<String> =
            sqlx::query_scalar("SELECT username FROM users WHERE id = $1 AND is_active")
                .bind(author_id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(Comment {
            id: row.get("id"),
            recipe_id,
            user_id: author_id,
            username,
            body: body.to_string(),
            likes: Vec::new(),
            replies: Vec::new(),
            created_at: row.get("created_at"),
        })
    }

    /// Either the comment author or the recipe owner may delete. Replies
    /// and likes go with the comment via cascading foreign keys.
    pub async fn delete_comment(
        &self,
        recipe_id: Uuid,
        comment_id: Uuid,
        actor_id: Uuid,
    ) -> Result<(), CommentError> {
        let row = sqlx::query(
            "SELECT c.user_id AS author_id, r.user_id AS owner_id \
             FROM comments c JOIN recipes r ON r.id = c.recipe_id \
             WHERE c.id = $1 AND c.recipe_id = $2",
        )
        .bind(comment_id)
        .bind(recipe_id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => {
                self.ensure_recipe(recipe_id).await?;
                return Err(CommentError::CommentNotFound);
            }
        };

        let author_id: Uuid = row.get("author_id");
        let owner_id: Uuid = row.get("owner_id");
        if actor_id != author_id && actor_id != owner_id {
            return Err(CommentError::Forbidden);
        }

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    pub async fn toggle_comment_like(
        &self,
        recipe_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<ToggleState, CommentError> {
        self.ensure_comment(recipe_id, comment_id).await?;
        self.toggle(
            "INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2",
            comment_id,
            user_id,
        )
        .await
    }

    pub async fn add_reply(
        &self,
        recipe_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Reply, CommentError> {
        self.ensure_comment(recipe_id, comment_id).await?;

        let row = sqlx::query(
            "INSERT INTO replies (comment_id, user_id, body) \
             VALUES ($1, $2, $3) \
             RETURNING id, created_at",
        )
        .bind(comment_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        let username: Option<String> =
            sqlx::query_scalar("SELECT username FROM users WHERE id = $1 AND is_active")
                .bind(author_id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(Reply {
            id: row.get("id"),
            comment_id,
            user_id: author_id,
            username,
            body: body.to_string(),
            likes: Vec::new(),
            created_at: row.get("created_at"),
        })
    }

    pub async fn toggle_reply_like(
        &self,
        recipe_id: Uuid,
        comment_id: Uuid,
        reply_id: Uuid,
        user_id: Uuid,
    ) -> Result<ToggleState, CommentError> {
        self.ensure_comment(recipe_id, comment_id).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM replies WHERE id = $1 AND comment_id = $2)",
        )
        .bind(reply_id)
        .bind(comment_id)
        .fetch_one(self.db.pool())
        .await?;
        if !exists {
            return Err(CommentError::ReplyNotFound);
        }

        self.toggle(
            "INSERT INTO reply_likes (reply_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            "DELETE FROM reply_likes WHERE reply_id = $1 AND user_id = $2",
            reply_id,
            user_id,
        )
        .await
    }

    async fn toggle(
        &self,
        insert_sql: &str,
        delete_sql: &str,
        left: Uuid,
        right: Uuid,
    ) -> Result<ToggleState, CommentError> {
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

    async fn ensure_recipe(&self, recipe_id: Uuid) -> Result<(), CommentError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)")
                .bind(recipe_id)
                .fetch_one(self.db.pool())
                .await?;
        if exists {
            Ok(())
        } else {
            Err(CommentError::RecipeNotFound)
        }
    }

    /// Resolves the deepest missing level first so the caller gets
    /// "recipe not found" rather than "comment not found" for a bad
    /// recipe id.
    async fn ensure_comment(
        &self,
        recipe_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), CommentError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1 AND recipe_id = $2)",
        )
        .bind(comment_id)
        .bind(recipe_id)
        .fetch_one(self.db.pool())
        .await?;
        if exists {
            return Ok(());
        }
        self.ensure_recipe(recipe_id).await?;
        Err(CommentError::CommentNotFound)
    }
}

/// Load the full comment subtree for a recipe: comments in insertion
/// order, each with its liker ids and replies in insertion order.
pub(crate) async fn load_comment_tree(
    db: &Db,
    recipe_id: Uuid,
) -> Result<Vec<Comment>, sqlx::Error> {
    let comment_rows = sqlx::query(
        "SELECT c.id, c.recipe_id, c.user_id, u.username, c.body, c.created_at \
         FROM comments c \
         LEFT JOIN users u ON u.id = c.user_id AND u.is_active \
         WHERE c.recipe_id = $1 \
         ORDER BY c.created_at, c.id",
    )
    .bind(recipe_id)
    .fetch_all(db.pool())
    .await?;

    let mut comments: Vec<Comment> = comment_rows
        .iter()
        .map(|row| Comment {
            id: row.get("id"),
            recipe_id: row.get("recipe_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            body: row.get("body"),
            likes: Vec::new(),
            replies: Vec::new(),
            created_at: row.get("created_at"),
        })
        .collect();

    if comments.is_empty() {
        return Ok(comments);
    }

    let comment_ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
    let index: HashMap<Uuid, usize> = comment_ids
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position))
        .collect();

    let like_rows = sqlx::query(
        "SELECT comment_id, user_id FROM comment_likes \
         WHERE comment_id = ANY($1) ORDER BY created_at",
    )
    .bind(&comment_ids)
    .fetch_all(db.pool())
    .await?;
    for row in like_rows {
        let comment_id: Uuid = row.get("comment_id");
        if let Some(&position) = index.get(&comment_id) {
            comments[position].likes.push(row.get("user_id"));
        }
    }

    let reply_rows = sqlx::query(
        "SELECT r.id, r.comment_id, r.user_id, u.username, r.body, r.created_at \
         FROM replies r \
         LEFT JOIN users u ON u.id = r.user_id AND u.is_active \
         WHERE r.comment_id = ANY($1) \
         ORDER BY r.created_at, r.id",
    )
    .bind(&comment_ids)
    .fetch_all(db.pool())
    .await?;

    let mut replies: Vec<Reply> = reply_rows
        .iter()
        .map(|row| Reply {
            id: row.get("id"),
            comment_id: row.get("comment_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            body: row.get("body"),
            likes: Vec::new(),
            created_at: row.get("created_at"),
        })
        .collect();

    if !replies.is_empty() {
        let reply_ids: Vec<Uuid> = replies.iter().map(|r| r.id).collect();
        let reply_index: HashMap<Uuid, usize> = reply_ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();

        let reply_like_rows = sqlx::query(
            "SELECT reply_id, user_id FROM reply_likes \
             WHERE reply_id = ANY($1) ORDER BY created_at",
        )
        .bind(&reply_ids)
        .fetch_all(db.pool())
        .await?;
        for row in reply_like_rows {
            let reply_id: Uuid = row.get("reply_id");
            if let Some(&position) = reply_index.get(&reply_id) {
                replies[position].likes.push(row.get("user_id"));
            }
        }
    }

    for reply in replies {
        if let Some(&position) = index.get(&reply.comment_id) {
            comments[position].replies.push(reply);
        }
    }

    Ok(comments)
}

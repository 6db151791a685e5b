use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::Row;
use thiserror::Error;
use uuid::Uuid;

use crate::app::comments;
use crate::domain::recipe::{NamedRef, Recipe, RecipeDetail, RecipeSummary};
use crate::infra::db::Db;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Recipe not found")]
    NotFound,
    #[error("Only the recipe owner can do that")]
    NotOwner,
    #[error("At least one image is required")]
    NoImages,
    #[error("Cannot remove the last image. At least one image is required")]
    LastImage,
    #[error("Unknown category or ingredient")]
    UnknownLink,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub category_ids: Vec<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
    pub instructions: Vec<String>,
    pub images: Vec<String>,
    pub is_public: bool,
}

/// Partial update. Image handling composes in a fixed order: replace or
/// append first, then subtract removals, then check the ≥1 invariant.
#[derive(Debug, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_ids: Option<Vec<Uuid>>,
    pub ingredient_ids: Option<Vec<Uuid>>,
    pub instructions: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub new_images: Vec<String>,
    pub replace_images: bool,
    pub remove_images: Vec<String>,
}

const SUMMARY_SELECT: &str =
    "SELECT r.id, r.user_id, r.name, r.description, r.instructions, r.images, \
            r.is_public, r.views, r.created_at, \
            u.username AS owner_username, \
            (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id) AS likes \
     FROM recipes r \
     LEFT JOIN users u ON u.id = r.user_id AND u.is_active";

#[derive(Clone)]
pub struct RecipeService {
    db: Db,
}

impl RecipeService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        recipe: NewRecipe,
    ) -> Result<RecipeSummary, RecipeError> {
        if recipe.images.is_empty() {
            return Err(RecipeError::NoImages);
        }

        let mut tx = self.db.pool().begin().await?;

        let recipe_id: Uuid = sqlx::query_scalar(
            "INSERT INTO recipes (user_id, name, description, instructions, images, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(owner_id)
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.instructions)
        .bind(&recipe.images)
        .bind(recipe.is_public)
        .fetch_one(&mut *tx)
        .await?;

        if !recipe.category_ids.is_empty() {
            sqlx::query(
                "INSERT INTO recipe_categories (recipe_id, category_id) \
                 SELECT $1, unnest($2::uuid[])",
            )
            .bind(recipe_id)
            .bind(&recipe.category_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_link_error)?;
        }

        if !recipe.ingredient_ids.is_empty() {
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_id, ingredient_id) \
                 SELECT $1, unnest($2::uuid[])",
            )
            .bind(recipe_id)
            .bind(&recipe.ingredient_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_link_error)?;
        }

        tx.commit().await?;

        self.summary(recipe_id).await
    }

    pub async fn list_public(&self) -> Result<Vec<RecipeSummary>, RecipeError> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} WHERE r.is_public ORDER BY r.created_at DESC, r.id DESC"
        ))
        .fetch_all(self.db.pool())
        .await?;
        self.summarize(rows).await
    }

    /// Fetch one recipe, bumping the view counter atomically, with the
    /// full comment/reply subtree populated.
    pub async fn get(&self, recipe_id: Uuid) -> Result<RecipeDetail, RecipeError> {
        let bumped = sqlx::query("UPDATE recipes SET views = views + 1 WHERE id = $1")
            .bind(recipe_id)
            .execute(self.db.pool())
            .await?;
        if bumped.rows_affected() == 0 {
            return Err(RecipeError::NotFound);
        }

        let summary = self.summary(recipe_id).await?;

        let liked_by: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM recipe_likes WHERE recipe_id = $1 ORDER BY created_at",
        )
        .bind(recipe_id)
        .fetch_all(self.db.pool())
        .await?;

        let comments = comments::load_comment_tree(&self.db, recipe_id).await?;

        Ok(RecipeDetail {
            summary,
            liked_by,
            comments,
        })
    }

    pub async fn by_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<RecipeSummary>, RecipeError> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} \
             WHERE r.is_public AND EXISTS ( \
                 SELECT 1 FROM recipe_categories rc \
                 WHERE rc.recipe_id = r.id AND rc.category_id = $1) \
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(category_id)
        .fetch_all(self.db.pool())
        .await?;
        self.summarize(rows).await
    }

    pub async fn by_user(&self, user_id: Uuid) -> Result<Vec<RecipeSummary>, RecipeError> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} WHERE r.user_id = $1 \
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        self.summarize(rows).await
    }

    pub async fn random(&self) -> Result<Option<RecipeSummary>, RecipeError> {
        let row = sqlx::query(&format!(
            "{SUMMARY_SELECT} WHERE r.is_public ORDER BY random() LIMIT 1"
        ))
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(self.summarize(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Ownership-gated partial update. The row is locked for the duration
    /// so the image invariant is checked against what will actually be
    /// committed; a violation aborts with no partial write.
    pub async fn update(
        &self,
        recipe_id: Uuid,
        actor_id: Uuid,
        patch: RecipePatch,
    ) -> Result<RecipeSummary, RecipeError> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT user_id, images FROM recipes WHERE id = $1 FOR UPDATE")
            .bind(recipe_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RecipeError::NotFound)?;

        let owner_id: Uuid = row.get("user_id");
        if owner_id != actor_id {
            return Err(RecipeError::NotOwner);
        }

        let mut images: Vec<String> = row.get("images");
        if patch.replace_images {
            // an empty replacement set still counts as a replacement
            images = patch.new_images;
        } else {
            images.extend(patch.new_images);
        }
        if !patch.remove_images.is_empty() {
            images.retain(|image| !patch.remove_images.contains(image));
        }
        if images.is_empty() {
            return Err(RecipeError::NoImages);
        }

        sqlx::query(
            "UPDATE recipes SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                instructions = COALESCE($4, instructions), \
                is_public = COALESCE($5, is_public), \
                images = $6 \
             WHERE id = $1",
        )
        .bind(recipe_id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.instructions)
        .bind(patch.is_public)
        .bind(&images)
        .execute(&mut *tx)
        .await?;

        if let Some(category_ids) = patch.category_ids {
            sqlx::query("DELETE FROM recipe_categories WHERE recipe_id = $1")
                .bind(recipe_id)
                .execute(&mut *tx)
                .await?;
            if !category_ids.is_empty() {
                sqlx::query(
                    "INSERT INTO recipe_categories (recipe_id, category_id) \
                     SELECT $1, unnest($2::uuid[])",
                )
                .bind(recipe_id)
                .bind(&category_ids)
                .execute(&mut *tx)
                .await
                .map_err(map_link_error)?;
            }
        }

        if let Some(ingredient_ids) = patch.ingredient_ids {
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(recipe_id)
                .execute(&mut *tx)
                .await?;
            if !ingredient_ids.is_empty() {
                sqlx::query(
                    "INSERT INTO recipe_ingredients (recipe_id, ingredient_id) \
                     SELECT $1, unnest($2::uuid[])",
                )
                .bind(recipe_id)
                .bind(&ingredient_ids)
                .execute(&mut *tx)
                .await
                .map_err(map_link_error)?;
            }
        }

        tx.commit().await?;

        self.summary(recipe_id).await
    }

    pub async fn add_images(
        &self,
        recipe_id: Uuid,
        actor_id: Uuid,
        images: Vec<String>,
    ) -> Result<Recipe, RecipeError> {
        if images.is_empty() {
            return Err(RecipeError::NoImages);
        }

        self.check_owner(recipe_id, actor_id).await?;

        let row = sqlx::query(
            "UPDATE recipes SET images = images || $2 \
             WHERE id = $1 \
             RETURNING id, user_id, name, description, instructions, images, is_public, \
                       views, created_at",
        )
        .bind(recipe_id)
        .bind(&images)
        .fetch_one(self.db.pool())
        .await?;

        Ok(recipe_from_row(&row))
    }

    pub async fn remove_image(
        &self,
        recipe_id: Uuid,
        actor_id: Uuid,
        image_url: &str,
    ) -> Result<Recipe, RecipeError> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT user_id, images FROM recipes WHERE id = $1 FOR UPDATE")
            .bind(recipe_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RecipeError::NotFound)?;

        let owner_id: Uuid = row.get("user_id");
        if owner_id != actor_id {
            return Err(RecipeError::NotOwner);
        }

        let images: Vec<String> = row.get("images");
        if images.len() <= 1 {
            return Err(RecipeError::LastImage);
        }

        let row = sqlx::query(
            "UPDATE recipes SET images = array_remove(images, $2) \
             WHERE id = $1 \
             RETURNING id, user_id, name, description, instructions, images, is_public, \
                       views, created_at",
        )
        .bind(recipe_id)
        .bind(image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(recipe_from_row(&row))
    }

    /// Ownership-gated delete. Category/ingredient links, likes, favorites
    /// and the comment subtree all go in the same statement via cascading
    /// foreign keys; nothing dangling survives.
    pub async fn delete(&self, recipe_id: Uuid, actor_id: Uuid) -> Result<(), RecipeError> {
        self.check_owner(recipe_id, actor_id).await?;

        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    pub async fn admin_list(
        &self,
        is_public: Option<bool>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RecipeSummary>, RecipeError> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT} \
             WHERE ($1::boolean IS NULL OR r.is_public = $1) \
               AND ($2::uuid IS NULL OR r.user_id = $2) \
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(is_public)
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        self.summarize(rows).await
    }

    pub async fn admin_delete(&self, recipe_id: Uuid) -> Result<(), RecipeError> {
        let deleted = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(self.db.pool())
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(RecipeError::NotFound);
        }
        Ok(())
    }

    pub async fn exists(&self, recipe_id: Uuid) -> Result<bool, RecipeError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)")
                .bind(recipe_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    /// The ownership guard: NotFound before Forbidden, per the API contract.
    async fn check_owner(&self, recipe_id: Uuid, actor_id: Uuid) -> Result<(), RecipeError> {
        let owner_id: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM recipes WHERE id = $1")
                .bind(recipe_id)
                .fetch_optional(self.db.pool())
                .await?;

        match owner_id {
            None => Err(RecipeError::NotFound),
            Some(owner_id) if owner_id != actor_id => Err(RecipeError::NotOwner),
            Some(_) => Ok(()),
        }
    }

    async fn summary(&self, recipe_id: Uuid) -> Result<RecipeSummary, RecipeError> {
        let row = sqlx::query(&format!("{SUMMARY_SELECT} WHERE r.id = $1"))
            .bind(recipe_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(RecipeError::NotFound)?;

        self.summarize(vec![row])
            .await?
            .pop()
            .ok_or(RecipeError::NotFound)
    }

    /// Attach category and ingredient names to a page of recipe rows with
    /// two batch queries instead of two per recipe.
    async fn summarize(&self, rows: Vec<PgRow>) -> Result<Vec<RecipeSummary>, RecipeError> {
        let mut summaries: Vec<RecipeSummary> = rows
            .iter()
            .map(|row| RecipeSummary {
                recipe: recipe_from_row(row),
                owner_username: row.get("owner_username"),
                categories: Vec::new(),
                ingredients: Vec::new(),
                likes: row.get("likes"),
            })
            .collect();

        if summaries.is_empty() {
            return Ok(summaries);
        }

        let ids: Vec<Uuid> = summaries.iter().map(|s| s.recipe.id).collect();
        let index: HashMap<Uuid, usize> = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();

        let category_rows = sqlx::query(
            "SELECT rc.recipe_id, c.id, c.name FROM recipe_categories rc \
             JOIN categories c ON c.id = rc.category_id \
             WHERE rc.recipe_id = ANY($1) ORDER BY c.name",
        )
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await?;
        for row in category_rows {
            let recipe_id: Uuid = row.get("recipe_id");
            if let Some(&position) = index.get(&recipe_id) {
                summaries[position].categories.push(NamedRef {
                    id: row.get("id"),
                    name: row.get("name"),
                });
            }
        }

        let ingredient_rows = sqlx::query(
            "SELECT ri.recipe_id, i.id, i.name FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE ri.recipe_id = ANY($1) ORDER BY i.name",
        )
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await?;
        for row in ingredient_rows {
            let recipe_id: Uuid = row.get("recipe_id");
            if let Some(&position) = index.get(&recipe_id) {
                summaries[position].ingredients.push(NamedRef {
                    id: row.get("id"),
                    name: row.get("name"),
                });
            }
        }

        Ok(summaries)
    }
}

pub(crate) fn recipe_from_row(row: &PgRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        description: row.get("description"),
        instructions: row.get("instructions"),
        images: row.get("images"),
        is_public: row.get("is_public"),
        views: row.get("views"),
        created_at: row.get("created_at"),
    }
}

/// Foreign-key violations on link inserts mean the caller referenced a
/// category or ingredient that does not exist.
fn map_link_error(err: sqlx::Error) -> RecipeError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23503") {
            return RecipeError::UnknownLink;
        }
    }
    RecipeError::Db(err)
}

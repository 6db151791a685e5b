use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::recipe::NamedRef;
use crate::domain::taxonomy::{Category, Ingredient};
use crate::infra::db::Db;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Category not found")]
    CategoryNotFound,
    #[error("Ingredient not found")]
    IngredientNotFound,
    #[error("A category with that name already exists")]
    DuplicateCategory,
    #[error("An ingredient with that name already exists")]
    DuplicateIngredient,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// A category with the public recipes filed under it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithRecipes {
    #[serde(flatten)]
    pub category: Category,
    pub recipes: Vec<NamedRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientWithRecipes {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub recipes: Vec<NamedRef>,
}

#[derive(Clone)]
pub struct TaxonomyService {
    db: Db,
}

impl TaxonomyService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, TaxonomyError> {
        let row = sqlx::query(
            "INSERT INTO categories (name) VALUES ($1) \
             ON CONFLICT (name) DO NOTHING \
             RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(TaxonomyError::DuplicateCategory)?;

        Ok(category_from_row(&row))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, TaxonomyError> {
        let rows =
            sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    pub async fn get_category(
        &self,
        category_id: Uuid,
    ) -> Result<CategoryWithRecipes, TaxonomyError> {
        let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(TaxonomyError::CategoryNotFound)?;

        let recipes = self
            .recipe_refs(
                "SELECT r.id, r.name FROM recipe_categories rc \
                 JOIN recipes r ON r.id = rc.recipe_id \
                 WHERE rc.category_id = $1 AND r.is_public \
                 ORDER BY r.created_at DESC",
                category_id,
            )
            .await?;

        Ok(CategoryWithRecipes {
            category: category_from_row(&row),
            recipes,
        })
    }

    pub async fn rename_category(
        &self,
        category_id: Uuid,
        name: &str,
    ) -> Result<Category, TaxonomyError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1 AND id <> $2)",
        )
        .bind(name)
        .bind(category_id)
        .fetch_one(self.db.pool())
        .await?;
        if taken {
            return Err(TaxonomyError::DuplicateCategory);
        }

        let row = sqlx::query(
            "UPDATE categories SET name = $2 WHERE id = $1 \
             RETURNING id, name, created_at",
        )
        .bind(category_id)
        .bind(name)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(TaxonomyError::CategoryNotFound)?;

        Ok(category_from_row(&row))
    }

    /// Recipes filed under the category survive; only the link rows go.
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), TaxonomyError> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(self.db.pool())
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(TaxonomyError::CategoryNotFound);
        }
        Ok(())
    }

    /// Up to `limit` random categories that have at least one public
    /// recipe, each with its public recipes attached.
    pub async fn random_categories_with_recipes(
        &self,
        limit: i64,
    ) -> Result<Vec<CategoryWithRecipes>, TaxonomyError> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, c.created_at FROM categories c \
             WHERE EXISTS ( \
                 SELECT 1 FROM recipe_categories rc \
                 JOIN recipes r ON r.id = rc.recipe_id \
                 WHERE rc.category_id = c.id AND r.is_public) \
             ORDER BY random() LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let category = category_from_row(row);
            let recipes = self
                .recipe_refs(
                    "SELECT r.id, r.name FROM recipe_categories rc \
                     JOIN recipes r ON r.id = rc.recipe_id \
                     WHERE rc.category_id = $1 AND r.is_public \
                     ORDER BY r.created_at DESC",
                    category.id,
                )
                .await?;
            out.push(CategoryWithRecipes { category, recipes });
        }
        Ok(out)
    }

    pub async fn create_ingredient(
        &self,
        name: &str,
        quantity: Option<f64>,
    ) -> Result<Ingredient, TaxonomyError> {
        let row = sqlx::query(
            "INSERT INTO ingredients (name, quantity) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING \
             RETURNING id, name, quantity, created_at",
        )
        .bind(name)
        .bind(quantity)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(TaxonomyError::DuplicateIngredient)?;

        Ok(ingredient_from_row(&row))
    }

    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>, TaxonomyError> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, created_at FROM ingredients ORDER BY name",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(ingredient_from_row).collect())
    }

    pub async fn get_ingredient(
        &self,
        ingredient_id: Uuid,
    ) -> Result<IngredientWithRecipes, TaxonomyError> {
        let row = sqlx::query(
            "SELECT id, name, quantity, created_at FROM ingredients WHERE id = $1",
        )
        .bind(ingredient_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(TaxonomyError::IngredientNotFound)?;

        let recipes = self
            .recipe_refs(
                "SELECT r.id, r.name FROM recipe_ingredients ri \
                 JOIN recipes r ON r.id = ri.recipe_id \
                 WHERE ri.ingredient_id = $1 AND r.is_public \
                 ORDER BY r.created_at DESC",
                ingredient_id,
            )
            .await?;

        Ok(IngredientWithRecipes {
            ingredient: ingredient_from_row(&row),
            recipes,
        })
    }

    pub async fn update_ingredient(
        &self,
        ingredient_id: Uuid,
        name: Option<String>,
        quantity: Option<f64>,
    ) -> Result<Ingredient, TaxonomyError> {
        if let Some(name) = &name {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM ingredients WHERE name = $1 AND id <> $2)",
            )
            .bind(name)
            .bind(ingredient_id)
            .fetch_one(self.db.pool())
            .await?;
            if taken {
                return Err(TaxonomyError::DuplicateIngredient);
            }
        }

        let row = sqlx::query(
            "UPDATE ingredients SET \
                name = COALESCE($2, name), \
                quantity = COALESCE($3, quantity) \
             WHERE id = $1 \
             RETURNING id, name, quantity, created_at",
        )
        .bind(ingredient_id)
        .bind(name)
        .bind(quantity)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(TaxonomyError::IngredientNotFound)?;

        Ok(ingredient_from_row(&row))
    }

    pub async fn delete_ingredient(&self, ingredient_id: Uuid) -> Result<(), TaxonomyError> {
        let deleted = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(ingredient_id)
            .execute(self.db.pool())
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(TaxonomyError::IngredientNotFound);
        }
        Ok(())
    }

    pub async fn category_exists(&self, category_id: Uuid) -> Result<bool, TaxonomyError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    pub async fn ingredient_exists(&self, ingredient_id: Uuid) -> Result<bool, TaxonomyError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ingredients WHERE id = $1)")
                .bind(ingredient_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    async fn recipe_refs(&self, sql: &str, id: Uuid) -> Result<Vec<NamedRef>, TaxonomyError> {
        let rows = sqlx::query(sql).bind(id).fetch_all(self.db.pool()).await?;
        Ok(rows
            .into_iter()
            .map(|row| NamedRef {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }
}

fn category_from_row(row: &PgRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn ingredient_from_row(row: &PgRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        quantity: row.get("quantity"),
        created_at: row.get("created_at"),
    }
}

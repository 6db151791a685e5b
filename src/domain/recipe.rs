use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub images: Vec<String>,
    pub is_public: bool,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A recipe with its populated relations: owner username, category and
/// ingredient names, like count.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub owner_username: Option<String>,
    pub categories: Vec<NamedRef>,
    pub ingredients: Vec<NamedRef>,
    pub likes: i64,
}

/// Full detail for `GET /api/recipes/:id`: summary plus liker ids and the
/// comment/reply subtree.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub liked_by: Vec<Uuid>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub body: String,
    pub likes: Vec<Uuid>,
    pub replies: Vec<Reply>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub body: String,
    pub likes: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

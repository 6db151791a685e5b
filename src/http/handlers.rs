use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app::auth::{AuthService, LoginOutcome};
use crate::app::comments::{CommentError, CommentService};
use crate::app::recipes::{NewRecipe, RecipeError, RecipePatch, RecipeService};
use crate::app::reports::{ReportError, ReportService};
use crate::app::social::{SocialError, SocialService};
use crate::app::taxonomy::{TaxonomyError, TaxonomyService};
use crate::app::users::{ProfilePatch, UserError, UserService};
use crate::domain::report::{ReportReason, ReportStatus, ReportTarget, TargetKind};
use crate::domain::user::User;
use crate::http::auth::{AdminUser, AuthUser};
use crate::http::AppError;
use crate::AppState;

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        message: None,
    })
}

fn ok_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        message: Some(message.into()),
    })
}

fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            data: Some(data),
            message: None,
        }),
    )
}

fn done(message: impl Into<String>) -> Json<Envelope<()>> {
    Json(Envelope {
        success: true,
        data: None,
        message: Some(message.into()),
    })
}

fn map_user_err(err: UserError) -> AppError {
    match err {
        UserError::NotFound => AppError::not_found("User not found"),
        UserError::InvalidCredentials => AppError::unauthorized("Invalid credentials"),
        UserError::Duplicate => AppError::bad_request("Username or email already taken"),
        UserError::BanAdmin => AppError::bad_request("Cannot ban an administrator"),
        UserError::Db(err) => {
            tracing::error!(error = %err, "user query failed");
            AppError::internal("internal error")
        }
        UserError::Other(err) => {
            tracing::error!(error = %err, "user operation failed");
            AppError::internal("internal error")
        }
    }
}

fn map_social_err(err: SocialError) -> AppError {
    match err {
        SocialError::SelfFollow => AppError::bad_request("You cannot follow yourself"),
        SocialError::UserNotFound => AppError::not_found("User not found"),
        SocialError::RecipeNotFound => AppError::not_found("Recipe not found"),
        SocialError::Db(err) => {
            tracing::error!(error = %err, "social toggle failed");
            AppError::internal("internal error")
        }
    }
}

fn map_recipe_err(err: RecipeError) -> AppError {
    match err {
        RecipeError::NotFound => AppError::not_found("Recipe not found"),
        RecipeError::NotOwner => AppError::forbidden("Unauthorized"),
        RecipeError::NoImages => AppError::bad_request("At least one image is required"),
        RecipeError::LastImage => AppError::bad_request(
            "Cannot remove the last image. At least one image is required",
        ),
        RecipeError::UnknownLink => {
            AppError::bad_request("Unknown category or ingredient")
        }
        RecipeError::Db(err) => {
            tracing::error!(error = %err, "recipe query failed");
            AppError::internal("internal error")
        }
    }
}

fn map_comment_err(err: CommentError) -> AppError {
    match err {
        CommentError::RecipeNotFound => AppError::not_found("Recipe not found"),
        CommentError::CommentNotFound => AppError::not_found("Comment not found"),
        CommentError::ReplyNotFound => AppError::not_found("Reply not found"),
        CommentError::Forbidden => AppError::forbidden("Unauthorized"),
        CommentError::Db(err) => {
            tracing::error!(error = %err, "comment query failed");
            AppError::internal("internal error")
        }
    }
}

fn map_taxonomy_err(err: TaxonomyError) -> AppError {
    match err {
        TaxonomyError::CategoryNotFound => AppError::not_found("Category not found"),
        TaxonomyError::IngredientNotFound => AppError::not_found("Ingredient not found"),
        TaxonomyError::DuplicateCategory => {
            AppError::bad_request("A category with that name already exists")
        }
        TaxonomyError::DuplicateIngredient => {
            AppError::bad_request("An ingredient with that name already exists")
        }
        TaxonomyError::Db(err) => {
            tracing::error!(error = %err, "taxonomy query failed");
            AppError::internal("internal error")
        }
    }
}

fn map_report_err(err: ReportError) -> AppError {
    match err {
        ReportError::NotFound => AppError::not_found("Report not found"),
        ReportError::Db(err) => {
            tracing::error!(error = %err, "report query failed");
            AppError::internal("internal error")
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.ping().await.map_err(|err| {
        tracing::error!(error = %err, "health check failed");
        AppError::internal("database unreachable")
    })?;
    Ok(ok(json!({ "status": "ok" })))
}

// ---- users ----

#[derive(Serialize)]
struct AuthResponse {
    user: User,
    token: String,
    #[serde(with = "time::serde::rfc3339")]
    expires_at: OffsetDateTime,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(AppError::bad_request("username and email are required"));
    }
    if req.password.len() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_key,
        state.auth_token_ttl_hours,
    );
    let registered = service
        .register(req.username.trim(), req.email.trim(), &req.password)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to register user");
            AppError::internal("internal error")
        })?;

    let (user, token, expires_at) =
        registered.ok_or_else(|| AppError::bad_request("User already exists"))?;

    Ok(created(AuthResponse {
        user,
        token,
        expires_at,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    identifier: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let service = AuthService::new(
        state.db.clone(),
        state.paseto_key,
        state.auth_token_ttl_hours,
    );
    let outcome = service
        .login(req.identifier.trim(), &req.password)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "login failed");
            AppError::internal("internal error")
        })?;

    match outcome {
        LoginOutcome::Success {
            user,
            token,
            expires_at,
        } => Ok(ok(AuthResponse {
            user,
            token,
            expires_at,
        })),
        LoginOutcome::UnknownAccount => {
            Err(AppError::not_found("User not found, please sign up"))
        }
        LoginOutcome::InvalidCredentials => {
            Err(AppError::unauthorized("Invalid credentials"))
        }
        LoginOutcome::Banned { reason, until } => {
            let until_text = until
                .format(&Rfc3339)
                .unwrap_or_else(|_| until.to_string());
            let reason = reason.unwrap_or_else(|| "No reason provided".to_string());
            Err(AppError::forbidden(format!(
                "Account banned until {until_text}. Reason: {reason}"
            )))
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let users = UserService::new(state.db.clone())
        .list_active()
        .await
        .map_err(map_user_err)?;
    Ok(ok(users))
}

pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = UserService::new(state.db.clone())
        .get_profile(user_id)
        .await
        .map_err(map_user_err)?;
    Ok(ok(profile))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    username: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    profile_picture: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if user.user_id != user_id {
        return Err(AppError::forbidden("You can only modify your own profile"));
    }

    let updated = UserService::new(state.db.clone())
        .update_profile(
            user_id,
            ProfilePatch {
                username: req.username,
                email: req.email,
                bio: req.bio,
                profile_picture: req.profile_picture,
            },
        )
        .await
        .map_err(map_user_err)?;

    Ok(ok(updated))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if user.user_id != user_id {
        return Err(AppError::forbidden("You can only modify your own profile"));
    }
    if req.new_password.len() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    UserService::new(state.db.clone())
        .change_password(user_id, &req.old_password, &req.new_password)
        .await
        .map_err(map_user_err)?;

    Ok(done("Password updated"))
}

#[derive(Deserialize)]
pub struct DeactivateRequest {
    #[serde(alias = "email", alias = "username")]
    identifier: String,
    password: String,
}

pub async fn deactivate_account(
    State(state): State<AppState>,
    Json(req): Json<DeactivateRequest>,
) -> Result<impl IntoResponse, AppError> {
    UserService::new(state.db.clone())
        .deactivate(req.identifier.trim(), &req.password)
        .await
        .map_err(map_user_err)?;

    Ok(done("Account deactivated"))
}

pub async fn toggle_follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let status = SocialService::new(state.db.clone())
        .toggle_follow(user.user_id, user_id)
        .await
        .map_err(map_social_err)?;

    let message = if status.added() {
        "User followed"
    } else {
        "User unfollowed"
    };
    Ok(ok_message(json!({ "following": status.added() }), message))
}

#[derive(Deserialize)]
pub struct BanRequest {
    duration: i64,
    unit: String,
    reason: Option<String>,
}

pub async fn ban_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    _admin: AdminUser,
    Json(req): Json<BanRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.duration <= 0 {
        return Err(AppError::bad_request("duration must be positive"));
    }
    let span = match req.unit.as_str() {
        "hours" => Duration::hours(req.duration),
        "days" => Duration::days(req.duration),
        _ => return Err(AppError::bad_request("unit must be 'hours' or 'days'")),
    };

    let banned = UserService::new(state.db.clone())
        .ban(user_id, OffsetDateTime::now_utc() + span, req.reason)
        .await
        .map_err(map_user_err)?;

    Ok(ok_message(banned, "User banned"))
}

pub async fn unban_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let user = UserService::new(state.db.clone())
        .unban(user_id)
        .await
        .map_err(map_user_err)?;

    Ok(ok_message(user, "User unbanned"))
}

// ---- recipes ----

#[derive(Deserialize)]
pub struct CreateRecipeRequest {
    name: String,
    description: Option<String>,
    #[serde(default)]
    category_ids: Vec<Uuid>,
    #[serde(default)]
    ingredient_ids: Vec<Uuid>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    images: Vec<String>,
    is_public: Option<bool>,
}

pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if req.images.is_empty() {
        return Err(AppError::bad_request("At least one image is required"));
    }

    let recipe = RecipeService::new(state.db.clone())
        .create(
            user.user_id,
            NewRecipe {
                name: req.name.trim().to_string(),
                description: req.description,
                category_ids: req.category_ids,
                ingredient_ids: req.ingredient_ids,
                instructions: req.instructions,
                images: req.images,
                is_public: req.is_public.unwrap_or(true),
            },
        )
        .await
        .map_err(map_recipe_err)?;

    Ok(created(recipe))
}

pub async fn list_recipes(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let recipes = RecipeService::new(state.db.clone())
        .list_public()
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipes))
}

pub async fn random_recipe(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = RecipeService::new(state.db.clone())
        .random()
        .await
        .map_err(map_recipe_err)?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    Ok(ok(recipe))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = RecipeService::new(state.db.clone())
        .get(recipe_id)
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipe))
}

pub async fn recipes_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let recipes = RecipeService::new(state.db.clone())
        .by_category(category_id)
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipes))
}

pub async fn recipes_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let recipes = RecipeService::new(state.db.clone())
        .by_user(user_id)
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipes))
}

#[derive(Deserialize)]
pub struct UpdateRecipeRequest {
    name: Option<String>,
    description: Option<String>,
    category_ids: Option<Vec<Uuid>>,
    ingredient_ids: Option<Vec<Uuid>>,
    instructions: Option<Vec<String>>,
    is_public: Option<bool>,
    #[serde(default)]
    new_images: Vec<String>,
    #[serde(default)]
    replace_images: bool,
    #[serde(default)]
    remove_images: Vec<String>,
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<UpdateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = RecipeService::new(state.db.clone())
        .update(
            recipe_id,
            user.user_id,
            RecipePatch {
                name: req.name,
                description: req.description,
                category_ids: req.category_ids,
                ingredient_ids: req.ingredient_ids,
                instructions: req.instructions,
                is_public: req.is_public,
                new_images: req.new_images,
                replace_images: req.replace_images,
                remove_images: req.remove_images,
            },
        )
        .await
        .map_err(map_recipe_err)?;

    Ok(ok(recipe))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    RecipeService::new(state.db.clone())
        .delete(recipe_id, user.user_id)
        .await
        .map_err(map_recipe_err)?;
    Ok(done("Recipe deleted"))
}

#[derive(Deserialize)]
pub struct AddImagesRequest {
    #[serde(default)]
    images: Vec<String>,
}

pub async fn add_recipe_images(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<AddImagesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.images.is_empty() {
        return Err(AppError::bad_request("At least one image is required"));
    }

    let recipe = RecipeService::new(state.db.clone())
        .add_images(recipe_id, user.user_id, req.images)
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipe))
}

#[derive(Deserialize)]
pub struct RemoveImageRequest {
    #[serde(alias = "imageUrl")]
    image_url: String,
}

pub async fn remove_recipe_image(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<RemoveImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = RecipeService::new(state.db.clone())
        .remove_image(recipe_id, user.user_id, &req.image_url)
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipe))
}

pub async fn toggle_recipe_like(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let status = SocialService::new(state.db.clone())
        .toggle_recipe_like(user.user_id, recipe_id)
        .await
        .map_err(map_social_err)?;

    let message = if status.added() {
        "Recipe liked"
    } else {
        "Recipe unliked"
    };
    Ok(ok_message(json!({ "liked": status.added() }), message))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let status = SocialService::new(state.db.clone())
        .toggle_favorite(user.user_id, recipe_id)
        .await
        .map_err(map_social_err)?;

    let message = if status.added() {
        "Recipe added to favorites"
    } else {
        "Recipe removed from favorites"
    };
    Ok(ok_message(json!({ "favorited": status.added() }), message))
}

pub async fn admin_list_recipes(
    State(state): State<AppState>,
    Query(query): Query<AdminRecipesQuery>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let recipes = RecipeService::new(state.db.clone())
        .admin_list(query.is_public, query.user_id)
        .await
        .map_err(map_recipe_err)?;
    Ok(ok(recipes))
}

#[derive(Deserialize)]
pub struct AdminRecipesQuery {
    is_public: Option<bool>,
    user_id: Option<Uuid>,
}

pub async fn admin_delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    RecipeService::new(state.db.clone())
        .admin_delete(recipe_id)
        .await
        .map_err(map_recipe_err)?;
    Ok(done("Recipe deleted"))
}

pub async fn admin_recipe_reports(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let exists = RecipeService::new(state.db.clone())
        .exists(recipe_id)
        .await
        .map_err(map_recipe_err)?;
    if !exists {
        return Err(AppError::not_found("Recipe not found"));
    }

    let reports = ReportService::new(state.db.clone())
        .list_for_recipe(recipe_id)
        .await
        .map_err(map_report_err)?;
    Ok(ok(reports))
}

// ---- comments ----

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(alias = "text")]
    body: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    user: AuthUser,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.body.trim().is_empty() {
        return Err(AppError::bad_request("comment text is required"));
    }

    let comment = CommentService::new(state.db.clone())
        .add_comment(recipe_id, user.user_id, req.body.trim())
        .await
        .map_err(map_comment_err)?;
    Ok(created(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((recipe_id, comment_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    CommentService::new(state.db.clone())
        .delete_comment(recipe_id, comment_id, user.user_id)
        .await
        .map_err(map_comment_err)?;
    Ok(done("Comment deleted"))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Path((recipe_id, comment_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let status = CommentService::new(state.db.clone())
        .toggle_comment_like(recipe_id, comment_id, user.user_id)
        .await
        .map_err(map_comment_err)?;

    let message = if status.added() {
        "Comment liked"
    } else {
        "Comment unliked"
    };
    Ok(ok_message(json!({ "liked": status.added() }), message))
}

pub async fn add_reply(
    State(state): State<AppState>,
    Path((recipe_id, comment_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.body.trim().is_empty() {
        return Err(AppError::bad_request("reply text is required"));
    }

    let reply = CommentService::new(state.db.clone())
        .add_reply(recipe_id, comment_id, user.user_id, req.body.trim())
        .await
        .map_err(map_comment_err)?;
    Ok(created(reply))
}

pub async fn toggle_reply_like(
    State(state): State<AppState>,
    Path((recipe_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let status = CommentService::new(state.db.clone())
        .toggle_reply_like(recipe_id, comment_id, reply_id, user.user_id)
        .await
        .map_err(map_comment_err)?;

    let message = if status.added() {
        "Reply liked"
    } else {
        "Reply unliked"
    };
    Ok(ok_message(json!({ "liked": status.added() }), message))
}

// ---- categories ----

#[derive(Deserialize)]
pub struct NameRequest {
    name: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<NameRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }

    let category = TaxonomyService::new(state.db.clone())
        .create_category(req.name.trim())
        .await
        .map_err(map_taxonomy_err)?;
    Ok(created(category))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let categories = TaxonomyService::new(state.db.clone())
        .list_categories()
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let category = TaxonomyService::new(state.db.clone())
        .get_category(category_id)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(category))
}

pub async fn rename_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    _user: AuthUser,
    Json(req): Json<NameRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }

    let category = TaxonomyService::new(state.db.clone())
        .rename_category(category_id, req.name.trim())
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    TaxonomyService::new(state.db.clone())
        .delete_category(category_id)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(done("Category deleted"))
}

pub async fn admin_list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let categories = TaxonomyService::new(state.db.clone())
        .list_categories()
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(categories))
}

pub async fn admin_delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    TaxonomyService::new(state.db.clone())
        .delete_category(category_id)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(done("Category deleted"))
}

pub async fn admin_category_reports(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let exists = TaxonomyService::new(state.db.clone())
        .category_exists(category_id)
        .await
        .map_err(map_taxonomy_err)?;
    if !exists {
        return Err(AppError::not_found("Category not found"));
    }

    let reports = ReportService::new(state.db.clone())
        .list_for_target(TargetKind::Category, category_id)
        .await
        .map_err(map_report_err)?;
    Ok(ok(reports))
}

#[derive(Deserialize)]
pub struct RandomCategoriesQuery {
    limit: Option<i64>,
}

pub async fn random_categories_with_recipes(
    State(state): State<AppState>,
    Query(query): Query<RandomCategoriesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(6).clamp(1, 20);
    let categories = TaxonomyService::new(state.db.clone())
        .random_categories_with_recipes(limit)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(categories))
}

// ---- ingredients ----

#[derive(Deserialize)]
pub struct CreateIngredientRequest {
    name: String,
    quantity: Option<f64>,
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<CreateIngredientRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }

    let ingredient = TaxonomyService::new(state.db.clone())
        .create_ingredient(req.name.trim(), req.quantity)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(created(ingredient))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let ingredients = TaxonomyService::new(state.db.clone())
        .list_ingredients()
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(ingredients))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ingredient = TaxonomyService::new(state.db.clone())
        .get_ingredient(ingredient_id)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(ingredient))
}

#[derive(Deserialize)]
pub struct UpdateIngredientRequest {
    name: Option<String>,
    quantity: Option<f64>,
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
    _user: AuthUser,
    Json(req): Json<UpdateIngredientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ingredient = TaxonomyService::new(state.db.clone())
        .update_ingredient(ingredient_id, req.name, req.quantity)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(ingredient))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    TaxonomyService::new(state.db.clone())
        .delete_ingredient(ingredient_id)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(done("Ingredient deleted"))
}

pub async fn admin_list_ingredients(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let ingredients = TaxonomyService::new(state.db.clone())
        .list_ingredients()
        .await
        .map_err(map_taxonomy_err)?;
    Ok(ok(ingredients))
}

pub async fn admin_delete_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    TaxonomyService::new(state.db.clone())
        .delete_ingredient(ingredient_id)
        .await
        .map_err(map_taxonomy_err)?;
    Ok(done("Ingredient deleted"))
}

pub async fn admin_ingredient_reports(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let exists = TaxonomyService::new(state.db.clone())
        .ingredient_exists(ingredient_id)
        .await
        .map_err(map_taxonomy_err)?;
    if !exists {
        return Err(AppError::not_found("Ingredient not found"));
    }

    let reports = ReportService::new(state.db.clone())
        .list_for_target(TargetKind::Ingredient, ingredient_id)
        .await
        .map_err(map_report_err)?;
    Ok(ok(reports))
}

// ---- reports ----

#[derive(Deserialize)]
pub struct CreateReportRequest {
    #[serde(alias = "targetType")]
    target_type: String,
    #[serde(alias = "targetId")]
    target_id: Uuid,
    #[serde(alias = "recipeId")]
    recipe_id: Option<Uuid>,
    reason: String,
    description: String,
}

pub async fn create_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind = TargetKind::from_db(&req.target_type)
        .ok_or_else(|| AppError::bad_request("Invalid target type"))?;
    let reason = ReportReason::from_db(&req.reason)
        .ok_or_else(|| AppError::bad_request("Invalid report reason"))?;
    if req.description.trim().is_empty() {
        return Err(AppError::bad_request("description is required"));
    }

    let target = match kind {
        TargetKind::Recipe => ReportTarget::Recipe(req.target_id),
        TargetKind::Ingredient => ReportTarget::Ingredient(req.target_id),
        TargetKind::Category => ReportTarget::Category(req.target_id),
        TargetKind::User => ReportTarget::User(req.target_id),
        TargetKind::Comment => {
            let recipe_id = req.recipe_id.ok_or_else(|| {
                AppError::bad_request("recipeId is required when reporting a comment")
            })?;
            ReportTarget::Comment {
                comment_id: req.target_id,
                recipe_id,
            }
        }
    };

    let report = ReportService::new(state.db.clone())
        .create(user.user_id, target, reason, req.description.trim())
        .await
        .map_err(map_report_err)?;
    Ok(created(report))
}

#[derive(Deserialize)]
pub struct ReportsQuery {
    status: Option<String>,
    #[serde(alias = "targetType")]
    target_type: Option<String>,
}

pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let status = match &query.status {
        Some(value) => Some(
            ReportStatus::from_db(value)
                .ok_or_else(|| AppError::bad_request("Invalid status value"))?,
        ),
        None => None,
    };
    let target_type = match &query.target_type {
        Some(value) => Some(
            TargetKind::from_db(value)
                .ok_or_else(|| AppError::bad_request("Invalid target type"))?,
        ),
        None => None,
    };

    let reports = ReportService::new(state.db.clone())
        .list(status, target_type)
        .await
        .map_err(map_report_err)?;
    Ok(ok(reports))
}

pub async fn my_reports(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let reports = ReportService::new(state.db.clone())
        .my_reports(user.user_id)
        .await
        .map_err(map_report_err)?;
    Ok(ok(reports))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let report = ReportService::new(state.db.clone())
        .get(report_id)
        .await
        .map_err(map_report_err)?;
    Ok(ok(report))
}

#[derive(Deserialize)]
pub struct UpdateReportStatusRequest {
    status: String,
}

pub async fn update_report_status(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    _admin: AdminUser,
    Json(req): Json<UpdateReportStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = ReportStatus::from_db(&req.status)
        .ok_or_else(|| AppError::bad_request("Invalid status value"))?;

    let report = ReportService::new(state.db.clone())
        .update_status(report_id, status)
        .await
        .map_err(map_report_err)?;
    Ok(ok(report))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    ReportService::new(state.db.clone())
        .delete(report_id)
        .await
        .map_err(map_report_err)?;
    Ok(done("Report deleted"))
}

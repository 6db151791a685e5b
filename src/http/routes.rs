use axum::{routing::delete, routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::register))
        .route("/users", get(handlers::list_users))
        .route("/users", delete(handlers::deactivate_account))
        .route("/users/login", post(handlers::login))
        .route("/users/:id", get(handlers::get_user_profile))
        .route("/users/:id", put(handlers::update_profile))
        .route("/users/:id/password", put(handlers::change_password))
        .route("/users/:id/follow", post(handlers::toggle_follow))
        .route("/users/:id/ban", post(handlers::ban_user))
        .route("/users/:id/unban", post(handlers::unban_user))
}

pub fn recipes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(handlers::create_recipe))
        .route("/recipes", get(handlers::list_recipes))
        .route("/recipes/random", get(handlers::random_recipe))
        .route("/recipes/category/:category_id", get(handlers::recipes_by_category))
        .route("/recipes/user/:user_id", get(handlers::recipes_by_user))
        .route("/recipes/admin/all", get(handlers::admin_list_recipes))
        .route("/recipes/admin/:id", delete(handlers::admin_delete_recipe))
        .route("/recipes/admin/:id/reports", get(handlers::admin_recipe_reports))
        .route("/recipes/:id", get(handlers::get_recipe))
        .route("/recipes/:id", put(handlers::update_recipe))
        .route("/recipes/:id", delete(handlers::delete_recipe))
        .route("/recipes/:id/images", post(handlers::add_recipe_images))
        .route("/recipes/:id/images", delete(handlers::remove_recipe_image))
        .route("/recipes/:id/like", post(handlers::toggle_recipe_like))
        .route("/recipes/:id/favorite", post(handlers::toggle_favorite))
        .route("/recipes/:id/comments", post(handlers::add_comment))
        .route(
            "/recipes/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
        .route(
            "/recipes/:id/comments/:comment_id/like",
            post(handlers::toggle_comment_like),
        )
        .route(
            "/recipes/:id/comments/:comment_id/replies",
            post(handlers::add_reply),
        )
        .route(
            "/recipes/:id/comments/:comment_id/replies/:reply_id/like",
            post(handlers::toggle_reply_like),
        )
}

pub fn categories() -> Router<AppState> {
    Router::new()
        .route("/categories", post(handlers::create_category))
        .route("/categories", get(handlers::list_categories))
        .route(
            "/categories/random-with-recipes",
            get(handlers::random_categories_with_recipes),
        )
        .route("/categories/admin/all", get(handlers::admin_list_categories))
        .route("/categories/admin/:id", delete(handlers::admin_delete_category))
        .route(
            "/categories/admin/:id/reports",
            get(handlers::admin_category_reports),
        )
        .route("/categories/:id", get(handlers::get_category))
        .route("/categories/:id", put(handlers::rename_category))
        .route("/categories/:id", delete(handlers::delete_category))
}

pub fn ingredients() -> Router<AppState> {
    Router::new()
        .route("/ingredients", post(handlers::create_ingredient))
        .route("/ingredients", get(handlers::list_ingredients))
        .route("/ingredients/admin/all", get(handlers::admin_list_ingredients))
        .route("/ingredients/admin/:id", delete(handlers::admin_delete_ingredient))
        .route(
            "/ingredients/admin/:id/reports",
            get(handlers::admin_ingredient_reports),
        )
        .route("/ingredients/:id", get(handlers::get_ingredient))
        .route("/ingredients/:id", put(handlers::update_ingredient))
        .route("/ingredients/:id", delete(handlers::delete_ingredient))
}

pub fn reports() -> Router<AppState> {
    Router::new()
        .route("/reports", post(handlers::create_report))
        .route("/reports", get(handlers::list_reports))
        .route("/reports/my-reports", get(handlers::my_reports))
        .route("/reports/:id", get(handlers::get_report))
        .route("/reports/:id/status", put(handlers::update_report_status))
        .route("/reports/:id", delete(handlers::delete_report))
}

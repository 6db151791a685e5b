mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

#[tokio::test]
async fn create_requires_auth_and_at_least_one_image() {
    let app = app().await;
    let user = app.create_user("rec_create").await;

    let anon = app
        .post_json(
            "/api/recipes",
            json!({ "name": "Sneaky Soup", "images": ["https://img.example.com/s.jpg"] }),
            None,
        )
        .await;
    assert_eq!(anon.status, StatusCode::UNAUTHORIZED);

    let no_images = app
        .post_json(
            "/api/recipes",
            json!({ "name": "Invisible Pie", "images": [] }),
            Some(&user.token),
        )
        .await;
    assert_eq!(no_images.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_images.error_message(), "At least one image is required");
}

#[tokio::test]
async fn create_links_categories_and_ingredients() {
    let app = app().await;
    let user = app.create_user("rec_links").await;
    let category_id = app.create_category("rec_links_cat").await;
    let ingredient_id = app.create_ingredient("rec_links_ing").await;

    let res = app
        .post_json(
            "/api/recipes",
            json!({
                "name": "Linked Stew",
                "description": "hearty",
                "category_ids": [category_id],
                "ingredient_ids": [ingredient_id],
                "instructions": ["chop", "simmer"],
                "images": ["https://img.example.com/stew.jpg"]
            }),
            Some(&user.token),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    let data = res.data();
    assert_eq!(data["owner_username"], user.username);
    assert_eq!(data["categories"][0]["name"], "rec_links_cat");
    assert_eq!(data["ingredients"][0]["name"], "rec_links_ing");
    assert_eq!(data["likes"], 0);
}

#[tokio::test]
async fn create_with_unknown_category_is_rejected() {
    let app = app().await;
    let user = app.create_user("rec_badlink").await;

    let res = app
        .post_json(
            "/api/recipes",
            json!({
                "name": "Orphan Salad",
                "category_ids": [uuid::Uuid::new_v4()],
                "images": ["https://img.example.com/salad.jpg"]
            }),
            Some(&user.token),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_shows_only_public_recipes() {
    let app = app().await;
    let user = app.create_user("rec_listpub").await;
    let public_id = app.create_recipe_for_user(user.id).await;
    let private_id = app.create_private_recipe_for_user(user.id).await;

    let res = app.get("/api/recipes", None).await;
    assert_eq!(res.status, StatusCode::OK);

    let ids: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&public_id.to_string()));
    assert!(!ids.contains(&private_id.to_string()));
}

#[tokio::test]
async fn get_increments_views_and_returns_detail() {
    let app = app().await;
    let user = app.create_user("rec_views").await;
    let recipe_id = app.create_recipe_for_user(user.id).await;

    let first = app.get(&format!("/api/recipes/{}", recipe_id), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data()["views"], 1);

    let second = app.get(&format!("/api/recipes/{}", recipe_id), None).await;
    assert_eq!(second.data()["views"], 2);
    assert!(second.data()["comments"].as_array().is_some());
    assert!(second.data()["liked_by"].as_array().is_some());
}

#[tokio::test]
async fn get_missing_recipe_is_not_found() {
    let app = app().await;
    let res = app
        .get(&format!("/api/recipes/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error_message(), "Recipe not found");
}

#[tokio::test]
async fn update_is_owner_only() {
    let app = app().await;
    let owner = app.create_user("rec_upd_own").await;
    let stranger = app.create_user("rec_upd_str").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let res = app
        .put_json(
            &format!("/api/recipes/{}", recipe_id),
            json!({ "name": "Stolen Name" }),
            Some(&stranger.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .put_json(
            &format!("/api/recipes/{}", recipe_id),
            json!({ "name": "Renamed Properly", "is_public": false }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["name"], "Renamed Properly");
    assert_eq!(res.data()["is_public"], false);

    let missing = app
        .put_json(
            &format!("/api/recipes/{}", uuid::Uuid::new_v4()),
            json!({ "name": "Ghost" }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_cannot_empty_the_image_set() {
    let app = app().await;
    let owner = app.create_user("rec_img_empty").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let images_before: Vec<String> =
        sqlx::query_scalar("SELECT unnest(images) FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_all(app.pool())
            .await
            .unwrap();

    let res = app
        .put_json(
            &format!("/api/recipes/{}", recipe_id),
            json!({ "remove_images": images_before }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_message(), "At least one image is required");

    // nothing was written
    let images_after: Vec<String> =
        sqlx::query_scalar("SELECT unnest(images) FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_all(app.pool())
            .await
            .unwrap();
    assert_eq!(images_before, images_after);
}

#[tokio::test]
async fn image_add_and_remove_respect_the_invariant() {
    let app = app().await;
    let owner = app.create_user("rec_img_ops").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let last_image = app
        .delete_json(
            &format!("/api/recipes/{}/images", recipe_id),
            json!({ "image_url": "https://img.example.com/whatever.jpg" }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(last_image.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        last_image.error_message(),
        "Cannot remove the last image. At least one image is required"
    );

    let added = app
        .post_json(
            &format!("/api/recipes/{}/images", recipe_id),
            json!({ "images": ["https://img.example.com/extra.jpg"] }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.data()["images"].as_array().unwrap().len(), 2);

    let removed = app
        .delete_json(
            &format!("/api/recipes/{}/images", recipe_id),
            json!({ "image_url": "https://img.example.com/extra.jpg" }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.data()["images"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn replace_images_swaps_the_whole_set() {
    let app = app().await;
    let owner = app.create_user("rec_img_repl").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let res = app
        .put_json(
            &format!("/api/recipes/{}", recipe_id),
            json!({
                "new_images": ["https://img.example.com/a.jpg", "https://img.example.com/b.jpg"],
                "replace_images": true
            }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let images = res.data()["images"].as_array().unwrap().clone();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0], "https://img.example.com/a.jpg");
}

#[tokio::test]
async fn replacing_with_an_empty_set_fails_the_image_invariant() {
    let app = app().await;
    let owner = app.create_user("rec_img_repl_empty").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let res = app
        .put_json(
            &format!("/api/recipes/{}", recipe_id),
            json!({ "new_images": [], "replace_images": true }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_message(), "At least one image is required");

    let image_count: i64 =
        sqlx::query_scalar("SELECT cardinality(images)::bigint FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(image_count, 1);
}

#[tokio::test]
async fn delete_cascades_to_dependents() {
    let app = app().await;
    let owner = app.create_user("rec_del_own").await;
    let fan = app.create_user("rec_del_fan").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    app.post_json(
        &format!("/api/recipes/{}/like", recipe_id),
        json!({}),
        Some(&fan.token),
    )
    .await;
    let comment = app
        .post_json(
            &format!("/api/recipes/{}/comments", recipe_id),
            json!({ "body": "looks tasty" }),
            Some(&fan.token),
        )
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);

    let res = app
        .delete(&format!("/api/recipes/{}", recipe_id), Some(&owner.token))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let likes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM recipe_likes WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    let comments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(likes, 0);
    assert_eq!(comments, 0);
}

#[tokio::test]
async fn recipes_by_category_returns_only_public_matches() {
    let app = app().await;
    let user = app.create_user("rec_bycat").await;
    let category_id = app.create_category("rec_bycat_cat").await;
    let public_id = app.create_recipe_for_user(user.id).await;
    let private_id = app.create_private_recipe_for_user(user.id).await;
    app.link_recipe_category(public_id, category_id).await;
    app.link_recipe_category(private_id, category_id).await;

    let res = app
        .get(&format!("/api/recipes/category/{}", category_id), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let ids: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![public_id.to_string()]);
}

#[tokio::test]
async fn random_returns_a_public_recipe() {
    let app = app().await;
    let user = app.create_user("rec_random").await;
    app.create_recipe_for_user(user.id).await;

    let res = app.get("/api/recipes/random", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["is_public"], true);
}

#[tokio::test]
async fn admin_listing_and_delete_bypass_ownership() {
    let app = app().await;
    let admin = app.create_admin("rec_admin").await;
    let user = app.create_user("rec_admin_u").await;
    let private_id = app.create_private_recipe_for_user(user.id).await;

    let forbidden = app.get("/api/recipes/admin/all", Some(&user.token)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.error_message(), "Access denied. Admin only.");

    let res = app
        .get(
            &format!("/api/recipes/admin/all?user_id={}", user.id),
            Some(&admin.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let ids: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&private_id.to_string()));

    let res = app
        .delete(
            &format!("/api/recipes/admin/{}", private_id),
            Some(&admin.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let gone = app
        .delete(
            &format!("/api/recipes/admin/{}", private_id),
            Some(&admin.token),
        )
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

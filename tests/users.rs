mod common;

use axum::http::StatusCode;
use common::{app, DEFAULT_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn profile_is_populated_with_relations() {
    let app = app().await;
    let owner = app.create_user("prof_owner").await;
    let fan = app.create_user("prof_fan").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    // fan follows owner and favorites the recipe
    let res = app
        .post_json(
            &format!("/api/users/{}/follow", owner.id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app
        .post_json(
            &format!("/api/recipes/{}/favorite", recipe_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let owner_profile = app
        .get(&format!("/api/users/{}", owner.id), Some(&fan.token))
        .await;
    assert_eq!(owner_profile.status, StatusCode::OK);
    let data = owner_profile.data();
    assert_eq!(data["recipes"][0]["id"], json!(recipe_id));
    assert_eq!(data["followers"][0]["username"], fan.username);

    let fan_profile = app
        .get(&format!("/api/users/{}", fan.id), Some(&owner.token))
        .await;
    let data = fan_profile.data();
    assert_eq!(data["favorites"][0]["id"], json!(recipe_id));
    assert_eq!(data["following"][0]["username"], owner.username);
}

#[tokio::test]
async fn profile_of_deactivated_user_is_not_found() {
    let app = app().await;
    let viewer = app.create_user("prof_viewer").await;
    let ghost = app.create_user("prof_ghost").await;

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(ghost.id)
        .execute(app.pool())
        .await
        .unwrap();

    let res = app
        .get(&format!("/api/users/{}", ghost.id), Some(&viewer.token))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_profile_is_self_only() {
    let app = app().await;
    let user = app.create_user("upd_self").await;
    let other = app.create_user("upd_other").await;

    let res = app
        .put_json(
            &format!("/api/users/{}", user.id),
            json!({ "bio": "I cook things" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["bio"], "I cook things");

    let res = app
        .put_json(
            &format!("/api/users/{}", user.id),
            json!({ "bio": "hijacked" }),
            Some(&other.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_profile_rejects_taken_username() {
    let app = app().await;
    let user = app.create_user("upd_dup_a").await;
    let other = app.create_user("upd_dup_b").await;

    let res = app
        .put_json(
            &format!("/api/users/{}", user.id),
            json!({ "username": other.username }),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_password_requires_correct_old_password() {
    let app = app().await;
    let user = app.create_user("pw_change").await;

    let res = app
        .put_json(
            &format!("/api/users/{}/password", user.id),
            json!({ "old_password": "wrong-old", "new_password": "brandnewpassword" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .put_json(
            &format!("/api/users/{}/password", user.id),
            json!({ "old_password": DEFAULT_PASSWORD, "new_password": "brandnewpassword" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let login = app
        .post_json(
            "/api/users/login",
            json!({ "identifier": user.username, "password": "brandnewpassword" }),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn deactivation_reverifies_credentials_and_hides_user() {
    let app = app().await;
    let user = app.create_user("deact_me").await;

    let bad = app
        .delete_json(
            "/api/users",
            json!({ "identifier": user.username, "password": "not-my-password" }),
            None,
        )
        .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let res = app
        .delete_json(
            "/api/users",
            json!({ "identifier": user.username, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let login = app
        .post_json(
            "/api/users/login",
            json!({ "identifier": user.username, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ban_and_unban_are_admin_only() {
    let app = app().await;
    let admin = app.create_admin("ban_admin").await;
    let peasant = app.create_user("ban_peasant").await;
    let target = app.create_user("ban_target").await;

    let res = app
        .post_json(
            &format!("/api/users/{}/ban", target.id),
            json!({ "duration": 2, "unit": "days", "reason": "rude comments" }),
            Some(&peasant.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.error_message(), "Access denied. Admin only.");

    let res = app
        .post_json(
            &format!("/api/users/{}/ban", target.id),
            json!({ "duration": 2, "unit": "days", "reason": "rude comments" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["banned_until"].as_str().is_some());

    let res = app
        .post_json(
            &format!("/api/users/{}/unban", target.id),
            json!({}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["banned_until"].is_null());
}

#[tokio::test]
async fn banning_an_admin_is_rejected() {
    let app = app().await;
    let admin = app.create_admin("ban_adm_a").await;
    let other_admin = app.create_admin("ban_adm_b").await;

    let res = app
        .post_json(
            &format!("/api/users/{}/ban", other_admin.id),
            json!({ "duration": 1, "unit": "hours" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ban_rejects_unknown_unit() {
    let app = app().await;
    let admin = app.create_admin("ban_unit").await;
    let target = app.create_user("ban_unit_t").await;

    let res = app
        .post_json(
            &format!("/api/users/{}/ban", target.id),
            json!({ "duration": 3, "unit": "weeks" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

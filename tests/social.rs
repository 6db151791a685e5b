mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

#[tokio::test]
async fn follow_toggles_and_both_profiles_agree() {
    let app = app().await;
    let alice = app.create_user("soc_alice").await;
    let bob = app.create_user("soc_bob").await;

    let first = app
        .post_json(
            &format!("/api/users/{}/follow", bob.id),
            json!({}),
            Some(&alice.token),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data()["following"], true);
    assert_eq!(first.json()["message"], "User followed");

    let bob_profile = app
        .get(&format!("/api/users/{}", bob.id), Some(&alice.token))
        .await;
    assert_eq!(bob_profile.data()["followers"][0]["username"], alice.username);
    let alice_profile = app
        .get(&format!("/api/users/{}", alice.id), Some(&bob.token))
        .await;
    assert_eq!(alice_profile.data()["following"][0]["username"], bob.username);

    let second = app
        .post_json(
            &format!("/api/users/{}/follow", bob.id),
            json!({}),
            Some(&alice.token),
        )
        .await;
    assert_eq!(second.data()["following"], false);
    assert_eq!(second.json()["message"], "User unfollowed");

    let bob_profile = app
        .get(&format!("/api/users/{}", bob.id), Some(&alice.token))
        .await;
    assert!(bob_profile.data()["followers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let app = app().await;
    let user = app.create_user("soc_self").await;

    let res = app
        .post_json(
            &format!("/api/users/{}/follow", user.id),
            json!({}),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_message(), "You cannot follow yourself");
}

#[tokio::test]
async fn following_a_missing_user_is_not_found() {
    let app = app().await;
    let user = app.create_user("soc_missing").await;

    let res = app
        .post_json(
            &format!("/api/users/{}/follow", uuid::Uuid::new_v4()),
            json!({}),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repeated_follow_toggles_never_duplicate_edges() {
    let app = app().await;
    let alice = app.create_user("soc_rep_a").await;
    let bob = app.create_user("soc_rep_b").await;

    for _ in 0..3 {
        app.post_json(
            &format!("/api/users/{}/follow", bob.id),
            json!({}),
            Some(&alice.token),
        )
        .await;
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND followee_id = $2",
    )
    .bind(alice.id)
    .bind(bob.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    // three toggles: on, off, on
    assert_eq!(count, 1);
}

#[tokio::test]
async fn recipe_like_toggles_with_state_messages() {
    let app = app().await;
    let owner = app.create_user("soc_like_o").await;
    let fan = app.create_user("soc_like_f").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let liked = app
        .post_json(
            &format!("/api/recipes/{}/like", recipe_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.json()["message"], "Recipe liked");

    let detail = app.get(&format!("/api/recipes/{}", recipe_id), None).await;
    assert_eq!(detail.data()["liked_by"][0], json!(fan.id));
    assert_eq!(detail.data()["likes"], 1);

    let unliked = app
        .post_json(
            &format!("/api/recipes/{}/like", recipe_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(unliked.json()["message"], "Recipe unliked");

    let detail = app.get(&format!("/api/recipes/{}", recipe_id), None).await;
    assert!(detail.data()["liked_by"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn favorite_toggles_against_a_real_recipe_only() {
    let app = app().await;
    let owner = app.create_user("soc_fav_o").await;
    let fan = app.create_user("soc_fav_f").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let missing = app
        .post_json(
            &format!("/api/recipes/{}/favorite", uuid::Uuid::new_v4()),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let added = app
        .post_json(
            &format!("/api/recipes/{}/favorite", recipe_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(added.json()["message"], "Recipe added to favorites");

    let removed = app
        .post_json(
            &format!("/api/recipes/{}/favorite", recipe_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(removed.json()["message"], "Recipe removed from favorites");
}

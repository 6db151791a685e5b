mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

#[tokio::test]
async fn comments_append_in_order() {
    let app = app().await;
    let owner = app.create_user("cmt_order_o").await;
    let commenter = app.create_user("cmt_order_c").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    for body in ["first!", "second", "third"] {
        let res = app
            .post_json(
                &format!("/api/recipes/{}/comments", recipe_id),
                json!({ "body": body }),
                Some(&commenter.token),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.data()["username"], commenter.username);
    }

    let detail = app.get(&format!("/api/recipes/{}", recipe_id), None).await;
    let comments = detail.data()["comments"].as_array().unwrap().clone();
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0]["body"], "first!");
    assert_eq!(comments[2]["body"], "third");
}

#[tokio::test]
async fn commenting_on_a_missing_recipe_names_the_recipe() {
    let app = app().await;
    let user = app.create_user("cmt_missing").await;

    let res = app
        .post_json(
            &format!("/api/recipes/{}/comments", uuid::Uuid::new_v4()),
            json!({ "body": "into the void" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error_message(), "Recipe not found");
}

#[tokio::test]
async fn empty_comment_body_is_rejected() {
    let app = app().await;
    let owner = app.create_user("cmt_empty").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let res = app
        .post_json(
            &format!("/api/recipes/{}/comments", recipe_id),
            json!({ "body": "   " }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comment_deletion_allows_author_and_recipe_owner_only() {
    let app = app().await;
    let owner = app.create_user("cmt_del_o").await;
    let author = app.create_user("cmt_del_a").await;
    let stranger = app.create_user("cmt_del_s").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let make_comment = || async {
        let res = app
            .post_json(
                &format!("/api/recipes/{}/comments", recipe_id),
                json!({ "body": "delete me" }),
                Some(&author.token),
            )
            .await;
        res.data()["id"].as_str().unwrap().to_string()
    };

    let comment_id = make_comment().await;
    let res = app
        .delete(
            &format!("/api/recipes/{}/comments/{}", recipe_id, comment_id),
            Some(&stranger.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .delete(
            &format!("/api/recipes/{}/comments/{}", recipe_id, comment_id),
            Some(&author.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let comment_id = make_comment().await;
    let res = app
        .delete(
            &format!("/api/recipes/{}/comments/{}", recipe_id, comment_id),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_comment_takes_its_replies_and_likes() {
    let app = app().await;
    let owner = app.create_user("cmt_casc_o").await;
    let fan = app.create_user("cmt_casc_f").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let comment = app
        .post_json(
            &format!("/api/recipes/{}/comments", recipe_id),
            json!({ "body": "parent" }),
            Some(&owner.token),
        )
        .await;
    let comment_id = comment.data()["id"].as_str().unwrap().to_string();

    app.post_json(
        &format!("/api/recipes/{}/comments/{}/like", recipe_id, comment_id),
        json!({}),
        Some(&fan.token),
    )
    .await;
    app.post_json(
        &format!("/api/recipes/{}/comments/{}/replies", recipe_id, comment_id),
        json!({ "body": "child" }),
        Some(&fan.token),
    )
    .await;

    let res = app
        .delete(
            &format!("/api/recipes/{}/comments/{}", recipe_id, comment_id),
            Some(&owner.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let replies: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE comment_id = $1::uuid")
            .bind(&comment_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    let likes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1::uuid")
            .bind(&comment_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(replies, 0);
    assert_eq!(likes, 0);
}

#[tokio::test]
async fn comment_and_reply_likes_toggle() {
    let app = app().await;
    let owner = app.create_user("cmt_like_o").await;
    let fan = app.create_user("cmt_like_f").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let comment = app
        .post_json(
            &format!("/api/recipes/{}/comments", recipe_id),
            json!({ "body": "likeable" }),
            Some(&owner.token),
        )
        .await;
    let comment_id = comment.data()["id"].as_str().unwrap().to_string();

    let liked = app
        .post_json(
            &format!("/api/recipes/{}/comments/{}/like", recipe_id, comment_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(liked.json()["message"], "Comment liked");

    let reply = app
        .post_json(
            &format!("/api/recipes/{}/comments/{}/replies", recipe_id, comment_id),
            json!({ "body": "me too" }),
            Some(&fan.token),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let reply_id = reply.data()["id"].as_str().unwrap().to_string();

    let reply_liked = app
        .post_json(
            &format!(
                "/api/recipes/{}/comments/{}/replies/{}/like",
                recipe_id, comment_id, reply_id
            ),
            json!({}),
            Some(&owner.token),
        )
        .await;
    assert_eq!(reply_liked.json()["message"], "Reply liked");

    let detail = app.get(&format!("/api/recipes/{}", recipe_id), None).await;
    let comments = detail.data()["comments"].as_array().unwrap().clone();
    assert_eq!(comments[0]["likes"][0], json!(fan.id));
    assert_eq!(comments[0]["replies"][0]["body"], "me too");
    assert_eq!(comments[0]["replies"][0]["likes"][0], json!(owner.id));

    let unliked = app
        .post_json(
            &format!("/api/recipes/{}/comments/{}/like", recipe_id, comment_id),
            json!({}),
            Some(&fan.token),
        )
        .await;
    assert_eq!(unliked.json()["message"], "Comment unliked");
}

#[tokio::test]
async fn missing_levels_name_the_first_absent_one() {
    let app = app().await;
    let owner = app.create_user("cmt_levels").await;
    let recipe_id = app.create_recipe_for_user(owner.id).await;

    let comment = app
        .post_json(
            &format!("/api/recipes/{}/comments", recipe_id),
            json!({ "body": "real comment" }),
            Some(&owner.token),
        )
        .await;
    let comment_id = comment.data()["id"].as_str().unwrap().to_string();

    let bad_comment = app
        .post_json(
            &format!(
                "/api/recipes/{}/comments/{}/replies",
                recipe_id,
                uuid::Uuid::new_v4()
            ),
            json!({ "body": "orphan" }),
            Some(&owner.token),
        )
        .await;
    assert_eq!(bad_comment.status, StatusCode::NOT_FOUND);
    assert_eq!(bad_comment.error_message(), "Comment not found");

    let bad_reply = app
        .post_json(
            &format!(
                "/api/recipes/{}/comments/{}/replies/{}/like",
                recipe_id,
                comment_id,
                uuid::Uuid::new_v4()
            ),
            json!({}),
            Some(&owner.token),
        )
        .await;
    assert_eq!(bad_reply.status, StatusCode::NOT_FOUND);
    assert_eq!(bad_reply.error_message(), "Reply not found");
}

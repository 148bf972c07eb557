mod common;

use serde_json::Value;

async fn comments_of(app: &common::TestApp, post_id: i32) -> Vec<Value> {
    let (_, body) = common::get_json(app, &format!("/posts/{}", post_id)).await;
    body["data"]["comments"].as_array().unwrap().clone()
}

#[tokio::test]
async fn signed_in_user_comments() {
    let app = common::spawn_app().await;
    let author = common::create_test_user(&app, "poster").await;
    let reader = common::create_test_user(&app, "reader").await;
    let post_id = common::create_test_post(&app, &author.token, "discuss", None).await;

    let resp = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post_id)))
        .bearer_auth(&reader.token)
        .json(&serde_json::json!({ "text": "  Nice post  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["text"], "Nice post");
    assert_eq!(body["data"]["author"], reader.username.as_str());

    let comments = comments_of(&app, post_id).await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "Nice post");
    assert_eq!(comments[0]["post_id"], post_id);
}

#[tokio::test]
async fn anonymous_comment_is_refused() {
    let app = common::spawn_app().await;
    let author = common::create_test_user(&app, "quiet").await;
    let post_id = common::create_test_post(&app, &author.token, "no guests", None).await;

    let resp = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post_id)))
        .json(&serde_json::json!({ "text": "drive-by" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    assert!(comments_of(&app, post_id).await.is_empty());
}

#[tokio::test]
async fn blank_comment_is_rejected() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "blankc").await;
    let post_id = common::create_test_post(&app, &user.token, "post", None).await;

    let resp = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post_id)))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["fields"]["text"].is_array());

    assert!(comments_of(&app, post_id).await.is_empty());
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "lost").await;

    let resp = app
        .client
        .post(app.url("/posts/424242/comments"))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn comments_listed_oldest_first() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "chatty").await;
    let post_id = common::create_test_post(&app, &user.token, "thread", None).await;

    for text in ["one", "two", "three"] {
        let resp = app
            .client
            .post(app.url(&format!("/posts/{}/comments", post_id)))
            .bearer_auth(&user.token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let texts: Vec<String> = comments_of(&app, post_id)
        .await
        .iter()
        .map(|c| c["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

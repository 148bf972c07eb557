mod common;

use serde_json::Value;

#[tokio::test]
async fn admin_creates_and_reads_group() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;

    let (id, slug) = common::create_group_with_slug(&app, &admin.token, "slug").await;
    assert!(id > 0);
    assert_eq!(slug, "slug");

    let (status, body) = common::get_json(&app, "/groups/slug").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "Group slug");
    assert_eq!(body["data"]["description"], "A test group");
}

#[tokio::test]
async fn groups_listed_by_title() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;

    for (title, slug) in [("Zebra", "zebra"), ("Alpha", "alpha"), ("Middle", "middle")] {
        let resp = app
            .client
            .post(app.url("/groups"))
            .bearer_auth(&admin.token)
            .json(&serde_json::json!({ "title": title, "slug": slug }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let (status, body) = common::get_json(&app, "/groups").await;
    assert_eq!(status, 200);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Middle", "Zebra"]);
}

#[tokio::test]
async fn non_admin_cannot_manage_groups() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "plain").await;

    let resp = app
        .client
        .post(app.url("/groups"))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "title": "Mine", "slug": "mine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .post(app.url("/groups"))
        .json(&serde_json::json!({ "title": "Anon", "slug": "anon" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let (status, _) = common::get_json(&app, "/groups/mine").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    common::create_group_with_slug(&app, &admin.token, "dupe").await;

    let resp = app
        .client
        .post(app.url("/groups"))
        .bearer_auth(&admin.token)
        .json(&serde_json::json!({ "title": "Again", "slug": "dupe" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["fields"]["slug"].is_array());
}

#[tokio::test]
async fn invalid_group_fields_rejected() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;

    let resp = app
        .client
        .post(app.url("/groups"))
        .bearer_auth(&admin.token)
        .json(&serde_json::json!({ "title": "", "slug": "not a slug" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["fields"]["title"].is_array());
    assert!(body["fields"]["slug"].is_array());

    let resp = app
        .client
        .post(app.url("/groups"))
        .bearer_auth(&admin.token)
        .json(&serde_json::json!({ "title": "Писатели", "slug": "писатели" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["fields"]["slug"].is_array());
    assert!(body["fields"].get("title").is_none());
}

#[tokio::test]
async fn update_keeps_slug() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let (id, slug) = common::create_test_group(&app, &admin.token).await;

    let resp = app
        .client
        .put(app.url(&format!("/groups/{}", slug)))
        .bearer_auth(&admin.token)
        .json(&serde_json::json!({ "title": "Renamed", "description": "New text" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["slug"], slug.as_str());
    assert_eq!(body["data"]["title"], "Renamed");
}

#[tokio::test]
async fn delete_group_keeps_posts() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let (group_id, slug) = common::create_test_group(&app, &admin.token).await;
    let post_id = common::create_test_post(&app, &admin.token, "Survivor", Some(group_id)).await;

    let resp = app
        .client
        .delete(app.url(&format!("/groups/{}", slug)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, _) = common::get_json(&app, &format!("/groups/{}", slug)).await;
    assert_eq!(status, 404);

    let (status, body) = common::get_json(&app, &format!("/posts/{}", post_id)).await;
    assert_eq!(status, 200);
    assert!(body["data"]["post"]["group"].is_null());
}

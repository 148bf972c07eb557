#![allow(dead_code)]

use reqwest::{multipart, Client};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set,
};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};
use yatube::config::pagination::PaginationConfig;
use yatube::models::{user, Comment, Group, Post, User};
use yatube::services::upload::UploadConfig;

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);
static GROUP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// 1x1 transparent GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

pub const PAGE_SIZE: u64 = 10;

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        let config = yatube::config::jwt::JwtConfig::from_env().unwrap();
        let _ = yatube::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    pub uploads: UploadConfig,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    pub fn upload_path(&self, stored: &str) -> PathBuf {
        PathBuf::from(&self.uploads.upload_dir).join(stored)
    }
}

/// Connect to `TEST_DATABASE_URL`, or a private in-memory SQLite database.
/// A shared external database is wiped first, so run those suites with
/// `--test-threads=1`.
pub async fn test_database() -> DatabaseConnection {
    init_env();

    let database_url =
        std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let in_memory = database_url.starts_with("sqlite::memory:");

    let mut opt = ConnectOptions::new(database_url);
    if in_memory {
        // The in-memory database lives as long as its last connection.
        opt.max_connections(1).min_connections(1);
    }
    opt.sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    yatube::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    if !in_memory {
        cleanup_tables(&db).await;
    }

    db
}

pub async fn spawn_app() -> TestApp {
    let db = test_database().await;

    let upload_dir = std::env::temp_dir().join(format!(
        "yatube-test-uploads-{}",
        uuid::Uuid::new_v4()
    ));
    let uploads = UploadConfig {
        upload_dir: upload_dir.to_string_lossy().to_string(),
    };

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(yatube::routes::create_routes())
        .nest_service(
            "/uploads",
            tower_http::services::ServeDir::new(&uploads.upload_dir),
        )
        .layer(axum::middleware::from_fn(
            yatube::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(PaginationConfig::new(PAGE_SIZE)))
        .layer(axum::extract::Extension(uploads.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
        uploads,
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    Comment::delete_many().exec(db).await.unwrap();
    Post::delete_many().exec(db).await.unwrap();
    Group::delete_many().exec(db).await.unwrap();
    User::delete_many().exec(db).await.unwrap();
}

pub struct TestUser {
    pub id: i32,
    pub username: String,
    pub token: String,
}

/// Register a user with a unique name derived from `prefix`.
pub async fn create_test_user(app: &TestApp, prefix: &str) -> TestUser {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    register_user(app, &format!("{}_{}", prefix, counter)).await
}

/// Register a user with exactly this username.
pub async fn register_user(app: &TestApp, username: &str) -> TestUser {
    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "password": "test_password_123"
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse register response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!(
            "Failed to register user '{}': status={}, body={}",
            username, status, body
        );
    }

    TestUser {
        id: body["data"]["user_id"].as_i64().expect("missing user_id") as i32,
        username: username.to_string(),
        token: body["data"]["token"]
            .as_str()
            .expect("missing token")
            .to_string(),
    }
}

/// Make a user admin by directly updating the database.
pub async fn make_admin(db: &DatabaseConnection, user_id: i32) {
    let found = User::find_by_id(user_id)
        .one(db)
        .await
        .unwrap()
        .expect("user to promote");
    let mut active: user::ActiveModel = found.into();
    active.role = Set(user::ROLE_ADMIN.to_string());
    active.update(db).await.expect("Failed to make user admin");
}

/// Register an admin user.
pub async fn create_admin(app: &TestApp) -> TestUser {
    let admin = create_test_user(app, "admin").await;
    make_admin(&app.db, admin.id).await;
    admin
}

/// Create a group through the API and return (id, slug).
pub async fn create_test_group(app: &TestApp, admin_token: &str) -> (i32, String) {
    let counter = GROUP_COUNTER.fetch_add(1, Ordering::SeqCst);
    create_group_with_slug(app, admin_token, &format!("test-group-{}", counter)).await
}

pub async fn create_group_with_slug(app: &TestApp, admin_token: &str, slug: &str) -> (i32, String) {
    let resp = app
        .client
        .post(app.url("/groups"))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({
            "title": format!("Group {}", slug),
            "slug": slug,
            "description": "A test group"
        }))
        .send()
        .await
        .expect("Failed to create group");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create group: status={}, body={}", status, body);
    }

    (
        body["data"]["id"].as_i64().expect("missing id") as i32,
        body["data"]["slug"].as_str().expect("missing slug").to_string(),
    )
}

/// Multipart body for post create/edit.
pub fn post_form(text: &str, group: Option<i32>) -> multipart::Form {
    let mut form = multipart::Form::new().text("text", text.to_string());
    if let Some(group_id) = group {
        form = form.text("group", group_id.to_string());
    }
    form
}

pub fn with_image(form: multipart::Form, data: &[u8], filename: &str) -> multipart::Form {
    form.part(
        "image",
        multipart::Part::bytes(data.to_vec()).file_name(filename.to_string()),
    )
}

/// Create a post through the API and return its id.
pub async fn create_test_post(
    app: &TestApp,
    token: &str,
    text: &str,
    group: Option<i32>,
) -> i32 {
    let resp = app
        .client
        .post(app.url("/posts"))
        .bearer_auth(token)
        .multipart(post_form(text, group))
        .send()
        .await
        .expect("Failed to create post");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create post: status={}, body={}", status, body);
    }
    body["data"]["id"].as_i64().expect("missing id") as i32
}

pub async fn get_json(app: &TestApp, path: &str) -> (u16, Value) {
    let resp = app.client.get(app.url(path)).send().await.unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

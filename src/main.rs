mod config;
mod error;
mod forms;
mod handlers;
mod middleware;
mod migration;
mod models;
mod pagination;
mod response;
mod routes;
mod services;
mod utils;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use config::pagination::PaginationConfig;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use services::upload::{UploadConfig, MAX_FILE_SIZE};
use std::env;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for one maximum-size image plus the text fields of a post.
const REQUEST_BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth routes
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::get_current_user,
        crate::handlers::auth::delete_current_user,
        crate::handlers::auth::logout,
        // Group routes
        crate::handlers::group::list_groups,
        crate::handlers::group::get_group,
        crate::handlers::group::create_group,
        crate::handlers::group::update_group,
        crate::handlers::group::delete_group,
        // Post routes
        crate::handlers::post::index,
        crate::handlers::post::group_posts,
        crate::handlers::post::profile_posts,
        crate::handlers::post::post_detail,
        crate::handlers::post::create_post,
        crate::handlers::post::edit_post,
        crate::handlers::post::delete_post,
        // Comment routes
        crate::handlers::comment::add_comment,
    ),
    components(
        schemas(
            crate::response::ApiResponse<serde_json::Value>,
            crate::error::AppError,
            crate::error::ErrorResponse,
            // Auth
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::auth::UserResponse,
            // Group
            crate::handlers::group::GroupResponse,
            crate::handlers::group::CreateGroupRequest,
            crate::handlers::group::UpdateGroupRequest,
            // Post
            crate::handlers::post::PostResponse,
            crate::handlers::post::PostUpload,
            crate::handlers::post::AuthorResponse,
            crate::handlers::post::GroupPostsResponse,
            crate::handlers::post::ProfilePostsResponse,
            crate::handlers::post::PostDetailResponse,
            // Comment
            crate::handlers::comment::CommentResponse,
            crate::forms::CommentForm,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and account operations"),
        (name = "groups", description = "Community group operations"),
        (name = "posts", description = "Post listings and authoring"),
        (name = "comments", description = "Comment operations"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatube=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let settings = validate_config()?;

    utils::jwt::init_jwt_config(settings.jwt)?;

    tracing::info!("Starting Yatube v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database(&settings.database).await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    services::bootstrap_admin::ensure_bootstrap_admin(&db).await?;

    tracing::info!(
        page_size = settings.pagination.page_size,
        upload_dir = %settings.uploads.upload_dir,
        "Configuration loaded"
    );

    let app = create_app(&settings.uploads.upload_dir)
        .layer(Extension(db))
        .layer(Extension(settings.pagination))
        .layer(Extension(settings.uploads));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

struct Settings {
    jwt: config::jwt::JwtConfig,
    database: config::database::DatabaseConfig,
    pagination: PaginationConfig,
    uploads: UploadConfig,
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<Settings> {
    let jwt = config::jwt::JwtConfig::from_env()?;
    let database = config::database::DatabaseConfig::from_env()?;
    let pagination = PaginationConfig::from_env();

    // Upload directory, created if needed
    let uploads = UploadConfig::from_env();
    std::fs::create_dir_all(&uploads.upload_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create upload directory '{}': {}",
            uploads.upload_dir,
            e
        )
    })?;

    Ok(Settings {
        jwt,
        database,
        pagination,
        uploads,
    })
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app(upload_dir: &str) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .layer(axum::middleware::from_fn(
            middleware::security::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let backend = db.get_database_backend();
    let db_ok = db
        .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Yatube",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}

use crate::handlers;
use crate::middleware::auth::auth_middleware;
use axum::{middleware, routing, Router};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let write = write_routes().layer(middleware::from_fn(auth_middleware));

    auth_routes().merge(public_read_routes()).merge(write)
}

/// Registration and login.
fn auth_routes() -> Router {
    Router::new()
        .route("/auth/register", routing::post(handlers::auth::register))
        .route("/auth/login", routing::post(handlers::auth::login))
}

/// Listings and details, open to anonymous visitors.
fn public_read_routes() -> Router {
    Router::new()
        // Posts
        .route("/posts", routing::get(handlers::post::index))
        .route("/posts/{id}", routing::get(handlers::post::post_detail))
        // Groups
        .route("/groups", routing::get(handlers::group::list_groups))
        .route("/groups/{slug}", routing::get(handlers::group::get_group))
        .route(
            "/groups/{slug}/posts",
            routing::get(handlers::post::group_posts),
        )
        // Profiles
        .route(
            "/profiles/{username}/posts",
            routing::get(handlers::post::profile_posts),
        )
}

/// Everything that needs a signed-in user.
fn write_routes() -> Router {
    Router::new()
        // Auth
        .route(
            "/auth/me",
            routing::get(handlers::auth::get_current_user)
                .delete(handlers::auth::delete_current_user),
        )
        .route("/auth/logout", routing::post(handlers::auth::logout))
        // Posts
        .route("/posts", routing::post(handlers::post::create_post))
        .route(
            "/posts/{id}",
            routing::put(handlers::post::edit_post).delete(handlers::post::delete_post),
        )
        // Comments
        .route(
            "/posts/{id}/comments",
            routing::post(handlers::comment::add_comment),
        )
        // Groups (admin only - checked in handler)
        .route("/groups", routing::post(handlers::group::create_group))
        .route(
            "/groups/{slug}",
            routing::put(handlers::group::update_group).delete(handlers::group::delete_group),
        )
}

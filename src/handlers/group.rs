use crate::error::{AppError, AppResult};
use crate::forms::valid_slug;
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::GroupModel;
use crate::response::ApiResponse;
use crate::services::group::GroupService;
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroupRequest {
    /// Group title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// URL slug (1-50 characters: letters, digits, hyphens, underscores)
    #[validate(length(min = 1, max = 50), custom(function = "valid_slug"))]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGroupRequest {
    /// Group title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<GroupModel> for GroupResponse {
    fn from(g: GroupModel) -> Self {
        Self {
            id: g.id,
            title: g.title,
            slug: g.slug,
            description: g.description,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/groups",
    responses(
        (status = 200, description = "All groups ordered by title", body = Vec<GroupResponse>),
    ),
    tag = "groups"
)]
pub async fn list_groups(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let groups = GroupService::new(db).list().await?;
    let response: Vec<GroupResponse> = groups.into_iter().map(GroupResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{slug}",
    params(("slug" = String, Path, description = "Group slug")),
    responses(
        (status = 200, description = "Group details", body = GroupResponse),
        (status = 404, description = "Group not found", body = AppError),
    ),
    tag = "groups"
)]
pub async fn get_group(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let group = GroupService::new(db).get_by_slug(&slug).await?;
    Ok(ApiResponse::ok(GroupResponse::from(group)))
}

#[utoipa::path(
    post,
    path = "/api/v1/groups",
    security(("jwt_token" = [])),
    request_body = CreateGroupRequest,
    responses(
        (status = 200, description = "Group created", body = GroupResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 409, description = "Slug already taken", body = AppError),
    ),
    tag = "groups"
)]
pub async fn create_group(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&db, &auth_user).await?;
    payload.validate()?;

    let group = GroupService::new(db)
        .create(&payload.title, &payload.slug, &payload.description)
        .await?;

    Ok(ApiResponse::ok(GroupResponse::from(group)))
}

#[utoipa::path(
    put,
    path = "/api/v1/groups/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Group slug")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Group not found", body = AppError),
    ),
    tag = "groups"
)]
pub async fn update_group(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateGroupRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&db, &auth_user).await?;
    payload.validate()?;

    let group = GroupService::new(db)
        .update(&slug, &payload.title, &payload.description)
        .await?;

    Ok(ApiResponse::ok(GroupResponse::from(group)))
}

/// Posts of a deleted group stay, with their group cleared.
#[utoipa::path(
    delete,
    path = "/api/v1/groups/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Group slug")),
    responses(
        (status = 200, description = "Group deleted", body = String),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Group not found", body = AppError),
    ),
    tag = "groups"
)]
pub async fn delete_group(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&db, &auth_user).await?;
    GroupService::new(db).delete(&slug).await?;
    Ok(ApiResponse::ok("Group deleted"))
}

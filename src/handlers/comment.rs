use crate::error::{AppError, AppResult};
use crate::forms::CommentForm;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::comment::{CommentService, CommentView};
use crate::services::user::UserService;
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    /// Author username
    pub author: String,
    pub text: String,
    pub created: chrono::NaiveDateTime,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        let CommentView { comment, author } = view;
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author,
            text: comment.text,
            created: comment.created,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    request_body = CommentForm,
    responses(
        (status = 200, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn add_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(post_id): Path<i32>,
    Json(payload): Json<CommentForm>,
) -> AppResult<impl IntoResponse> {
    let user_id = auth_user.user_id;
    let text = payload.clean()?;

    let author = UserService::new(db.clone()).get_by_id(user_id).await?;
    let comment = CommentService::new(db).create(post_id, user_id, &text).await?;

    Ok(ApiResponse::ok(CommentResponse::from(CommentView {
        comment,
        author: author.username,
    })))
}

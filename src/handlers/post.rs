use crate::config::{pagination::PaginationConfig, parse_bool};
use crate::error::{AppError, AppResult};
use crate::forms::PostForm;
use crate::handlers::comment::CommentResponse;
use crate::handlers::group::GroupResponse;
use crate::middleware::auth::AuthUser;
use crate::pagination::{Page, PageQuery, Paginator};
use crate::response::ApiResponse;
use crate::services::{
    comment::CommentService,
    group::GroupService,
    post::{PostService, PostView},
    upload::{UploadConfig, UploadService},
    user::UserService,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

/// Multipart body accepted by post create/edit.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct PostUpload {
    /// Post text, required
    text: String,
    /// Group id, empty for none
    group: Option<String>,
    /// JPEG, PNG, GIF or WebP, at most 5 MB
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
    /// Remove the current image on edit; cannot be combined with `image`
    image_clear: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub text: String,
    pub pub_date: chrono::NaiveDateTime,
    pub author_id: i32,
    /// Author username
    pub author: String,
    pub group: Option<GroupResponse>,
    /// Public URL of the attached image
    pub image_url: Option<String>,
}

impl From<PostView> for PostResponse {
    fn from(view: PostView) -> Self {
        let PostView { post, author, group } = view;
        Self {
            id: post.id,
            text: post.text,
            pub_date: post.pub_date,
            author_id: post.author_id,
            author,
            group: group.map(GroupResponse::from),
            image_url: post.image.as_deref().map(UploadService::public_url),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorResponse {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupPostsResponse {
    pub group: GroupResponse,
    pub page: Page<PostResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfilePostsResponse {
    pub author: AuthorResponse,
    pub posts_count: u64,
    pub page: Page<PostResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub author_posts_count: u64,
    pub comments: Vec<CommentResponse>,
}

fn post_service(db: DatabaseConnection, pagination: PaginationConfig) -> PostService {
    PostService::new(db, Paginator::new(pagination))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(("page" = Option<String>, Query, description = "Page number, 1-indexed")),
    responses(
        (status = 200, description = "All posts, newest first", body = Page<PostResponse>),
    ),
    tag = "posts"
)]
pub async fn index(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let page = post_service(db, pagination).list(query.number()).await?;
    Ok(ApiResponse::ok(page.map(PostResponse::from)))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{slug}/posts",
    params(
        ("slug" = String, Path, description = "Group slug"),
        ("page" = Option<String>, Query, description = "Page number, 1-indexed"),
    ),
    responses(
        (status = 200, description = "Posts of the group, newest first", body = GroupPostsResponse),
        (status = 404, description = "Group not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn group_posts(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let group = GroupService::new(db.clone()).get_by_slug(&slug).await?;
    let page = post_service(db, pagination)
        .list_by_group(group.id, query.number())
        .await?;

    Ok(ApiResponse::ok(GroupPostsResponse {
        group: GroupResponse::from(group),
        page: page.map(PostResponse::from),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{username}/posts",
    params(
        ("username" = String, Path, description = "Author username"),
        ("page" = Option<String>, Query, description = "Page number, 1-indexed"),
    ),
    responses(
        (status = 200, description = "Posts of the author, newest first", body = ProfilePostsResponse),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn profile_posts(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let author = UserService::new(db.clone()).get_by_username(&username).await?;
    let page = post_service(db, pagination)
        .list_by_author(author.id, query.number())
        .await?;

    Ok(ApiResponse::ok(ProfilePostsResponse {
        posts_count: page.total,
        author: AuthorResponse {
            id: author.id,
            username: author.username,
        },
        page: page.map(PostResponse::from),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post with its comments", body = PostDetailResponse),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn post_detail(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = post_service(db.clone(), pagination);
    let view = service.get_view(id).await?;
    let author_posts_count = service.count_by_author(view.post.author_id).await?;
    let comments = CommentService::new(db).list_by_post(id).await?;

    Ok(ApiResponse::ok(PostDetailResponse {
        post: PostResponse::from(view),
        author_posts_count,
        comments: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    security(("jwt_token" = [])),
    request_body(content = PostUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 413, description = "Request body too large", body = AppError),
    ),
    tag = "posts"
)]
pub async fn create_post(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let user_id = auth_user.user_id;
    let form = read_post_form(multipart).await?.clean(&db).await?;

    let service = post_service(db, pagination);
    let post = service.create(user_id, form, &uploads).await?;
    let view = service.get_view(post.id).await?;

    Ok(ApiResponse::ok(PostResponse::from(view)))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    request_body(content = PostUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn edit_post(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    Extension(uploads): Extension<UploadConfig>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let service = post_service(db.clone(), pagination);

    // Strangers are refused before the body is read.
    let existing = service.get_editable(id, auth_user.user_id).await?;
    let form = read_post_form(multipart).await?.clean(&db).await?;
    let post = service.update(existing, form, &uploads).await?;
    let view = service.get_view(post.id).await?;

    Ok(ApiResponse::ok(PostResponse::from(view)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post deleted", body = String),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn delete_post(
    Extension(db): Extension<DatabaseConnection>,
    Extension(pagination): Extension<PaginationConfig>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user_id = auth_user.user_id;
    post_service(db, pagination).delete(id, user_id).await?;
    Ok(ApiResponse::ok("Post deleted"))
}

/// Collect the `text`, `group`, `image` and `image_clear` parts; anything
/// else is ignored.
async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("text") => form.text = field.text().await.map_err(multipart_error)?,
            Some("group") => form.group = Some(field.text().await.map_err(multipart_error)?),
            Some("image") => {
                let data = field.bytes().await.map_err(multipart_error)?;
                if !data.is_empty() {
                    form.image = Some(data.to_vec());
                }
            }
            Some("image_clear") => {
                let value = field.text().await.map_err(multipart_error)?;
                form.image_clear = parse_bool(&value).unwrap_or(false);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::field("__all__", format!("Malformed form data: {}", err.body_text()))
    }
}

use crate::error::{field_errors, push_field_error, AppError, AppResult};
use crate::forms::valid_username;
use crate::middleware::AuthUser;
use crate::models::UserModel;
use crate::response::ApiResponse;
use crate::services::{auth::AuthService, user::UserService};
use crate::utils::cookie::{build_auth_cookie, build_clear_cookie, ACCESS_TOKEN_COOKIE};
use crate::utils::password::password_problems;
use anyhow::anyhow;
use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username (1-150 characters: letters, digits and @/./+/-/_)
    #[validate(length(min = 1, max = 150), custom(function = "valid_username"))]
    pub username: String,
    /// Password: at least 8 characters, not all digits, unlike the username
    pub password: String,
}

impl RegisterRequest {
    /// Username rules and the password policy, reported together.
    fn check(&self) -> AppResult<()> {
        let mut errors = self.validate().err().map(field_errors).unwrap_or_default();
        for problem in password_problems(&self.password, &self.username) {
            push_field_error(&mut errors, "password", problem);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// JWT access token
    pub token: String,
    pub user_id: i32,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    /// user or admin
    pub role: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 409, description = "Username already exists", body = AppError),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    payload.check()?;

    let service = AuthService::new(db);
    let (user, access_token) = service
        .register(&payload.username, &payload.password)
        .await?;

    let response = AuthResponse {
        token: access_token.clone(),
        user_id: user.id,
        username: user.username,
    };

    let mut http_response =
        ApiResponse::with_message(response, "Registration successful.").into_response();
    set_auth_cookie(&mut http_response, &access_token)?;
    Ok(http_response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let (user, access_token) = service.login(&payload.username, &payload.password).await?;

    let response = AuthResponse {
        token: access_token.clone(),
        user_id: user.id,
        username: user.username,
    };

    let mut http_response = ApiResponse::ok(response).into_response();
    set_auth_cookie(&mut http_response, &access_token)?;
    Ok(http_response)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user retrieved successfully", body = UserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let user = UserService::new(db).get_by_id(auth_user.user_id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

/// Deleting the account removes the user's posts and comments as well.
#[utoipa::path(
    delete,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Account deleted", body = String),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn delete_current_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    UserService::new(db).delete(auth_user.user_id).await?;

    let mut response = ApiResponse::ok("Account deleted").into_response();
    clear_auth_cookie(&mut response)?;
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Logout successful", body = String),
    ),
    tag = "auth"
)]
pub async fn logout() -> AppResult<impl IntoResponse> {
    let mut response = ApiResponse::ok("Logout successful").into_response();
    clear_auth_cookie(&mut response)?;
    Ok(response)
}

fn set_auth_cookie(response: &mut Response, access_token: &str) -> AppResult<()> {
    let max_age = crate::utils::jwt::access_token_expiry()?;
    append_set_cookie(
        response,
        &build_auth_cookie(ACCESS_TOKEN_COOKIE, access_token, max_age),
    )
}

fn clear_auth_cookie(response: &mut Response) -> AppResult<()> {
    append_set_cookie(response, &build_clear_cookie(ACCESS_TOKEN_COOKIE))
}

fn append_set_cookie(response: &mut Response, cookie_value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie_value).map_err(|e| {
        AppError::Internal(anyhow!("Failed to build Set-Cookie header value: {}", e))
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

use crate::{
    error::{AppError, AppResult},
    services::user::UserService,
    utils::{
        cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
        jwt::decode_access_token,
    },
};
use axum::{
    extract::{FromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};

/// The signed-in user, as established by `auth_middleware`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i32,
}

/// JWT authentication middleware
///
/// Accepts `Authorization: Bearer` or the `access_token` cookie, checks the
/// account still exists and adds user info to request extensions.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers)
        .or_else(|| extract_cookie(&headers, ACCESS_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let user_id = decode_access_token(&token).map_err(|_| AppError::Unauthorized)?;

    // A deleted account's token must stop working immediately.
    crate::models::User::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verify the current user has admin role
pub async fn require_admin(db: &DatabaseConnection, auth_user: &AuthUser) -> AppResult<i32> {
    let user = UserService::new(db.clone())
        .get_by_id(auth_user.user_id)
        .await?;
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(user.id)
}

/// Extractor for AuthUser from request extensions
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        assert_eq!(extract_bearer_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn empty_or_foreign_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(extract_bearer_token(&headers), None);
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic Zm9vOmJhcg=="),
        );
        assert_eq!(extract_bearer_token(&headers), None);
    }
}

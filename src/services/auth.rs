use crate::{
    error::{AppError, AppResult},
    models::{
        user::{self, ROLE_USER},
        User, UserModel,
    },
    utils::{encode_access_token, hash_password, password_matches},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

pub const MSG_USERNAME_TAKEN: &str = "A user with that username already exists.";

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a new user.
    /// Returns (user_model, access_token)
    pub async fn register(&self, username: &str, password: &str) -> AppResult<(UserModel, String)> {
        if self.user_exists(username).await? {
            return Err(AppError::constraint("username", MSG_USERNAME_TAKEN));
        }

        let password_hash = hash_password(password)?;

        let new_user = user::ActiveModel {
            username: sea_orm::ActiveValue::Set(username.to_string()),
            password_hash: sea_orm::ActiveValue::Set(password_hash),
            role: sea_orm::ActiveValue::Set(ROLE_USER.to_string()),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        let user = new_user.insert(&self.db).await?;
        let access_token = encode_access_token(user.id)?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        Ok((user, access_token))
    }

    /// Login user
    /// Returns (user_model, access_token)
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(UserModel, String)> {
        let user = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !password_matches(password, &user.password_hash) {
            return Err(AppError::Unauthorized);
        }

        let access_token = encode_access_token(user.id)?;
        Ok((user, access_token))
    }

    async fn user_exists(&self, username: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}

use crate::config::parse_bool_env;
use crate::error::AppResult;
use crate::models::{user, User};
use crate::utils::hash_password;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;

#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub password: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        if !parse_bool_env("BOOTSTRAP_ADMIN_ENABLED", false) {
            return None;
        }

        Some(Self {
            username: env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?,
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
        })
    }
}

/// Make sure an administrator exists at startup:
/// - any admin already present: nothing to do
/// - the configured username exists: promote it
/// - otherwise create it as admin
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };
    ensure_admin(db, &cfg).await
}

pub async fn ensure_admin(db: &DatabaseConnection, cfg: &BootstrapAdminConfig) -> AppResult<()> {
    let admin_exists = User::find()
        .filter(user::Column::Role.eq(user::ROLE_ADMIN))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(user::Column::Username.eq(cfg.username.as_str()))
        .one(db)
        .await?;

    if let Some(found) = existing {
        let user_id = found.id;
        let mut active: user::ActiveModel = found.into();
        active.role = sea_orm::ActiveValue::Set(user::ROLE_ADMIN.to_string());
        active.update(db).await?;
        tracing::info!(user_id, "Promoted bootstrap admin");
        return Ok(());
    }

    let password_hash = hash_password(&cfg.password)?;

    let new_user = user::ActiveModel {
        username: sea_orm::ActiveValue::Set(cfg.username.clone()),
        password_hash: sea_orm::ActiveValue::Set(password_hash),
        role: sea_orm::ActiveValue::Set(user::ROLE_ADMIN.to_string()),
        created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    let admin = new_user.insert(db).await?;
    tracing::info!(user_id = admin.id, "Created bootstrap admin");
    Ok(())
}

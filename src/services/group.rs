use crate::{
    error::{AppError, AppResult},
    models::{group, Group, GroupModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

pub const MSG_SLUG_TAKEN: &str = "Group with this Slug already exists.";

pub struct GroupService {
    db: DatabaseConnection,
}

impl GroupService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<GroupModel>> {
        let groups = Group::find()
            .order_by_asc(group::Column::Title)
            .order_by_asc(group::Column::Id)
            .all(&self.db)
            .await?;
        Ok(groups)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<GroupModel> {
        Group::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(&self, title: &str, slug: &str, description: &str) -> AppResult<GroupModel> {
        // The unique index still guards concurrent inserts; this gives the
        // common case a friendlier message.
        if self.slug_exists(slug).await? {
            return Err(AppError::constraint("slug", MSG_SLUG_TAKEN));
        }

        let new_group = group::ActiveModel {
            title: sea_orm::ActiveValue::Set(title.to_string()),
            slug: sea_orm::ActiveValue::Set(slug.to_string()),
            description: sea_orm::ActiveValue::Set(description.to_string()),
            ..Default::default()
        };

        let group = new_group.insert(&self.db).await?;
        tracing::info!(group_id = group.id, slug = %group.slug, "Group created: {}", group);
        Ok(group)
    }

    /// Title and description only; the slug never changes.
    pub async fn update(&self, slug: &str, title: &str, description: &str) -> AppResult<GroupModel> {
        let existing = self.get_by_slug(slug).await?;

        let mut active: group::ActiveModel = existing.into();
        active.title = sea_orm::ActiveValue::Set(title.to_string());
        active.description = sea_orm::ActiveValue::Set(description.to_string());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Posts of the group survive with their group cleared.
    pub async fn delete(&self, slug: &str) -> AppResult<()> {
        let existing = self.get_by_slug(slug).await?;
        Group::delete_by_id(existing.id).exec(&self.db).await?;
        tracing::info!(group_id = existing.id, slug = %existing.slug, "Group deleted");
        Ok(())
    }

    async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        let count = Group::find()
            .filter(group::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

use crate::{
    error::{AppError, AppResult},
    models::{comment, user, Comment, CommentModel, Post, User},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: CommentModel,
    pub author: String,
}

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Comments of a post, oldest first.
    pub async fn list_by_post(&self, post_id: i32) -> AppResult<Vec<CommentView>> {
        let comments = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::Created)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await?;

        let mut author_ids: Vec<i32> = comments.iter().map(|c| c.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<i32, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(user::Column::Id.is_in(author_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: authors.get(&comment.author_id).cloned().unwrap_or_default(),
                comment,
            })
            .collect())
    }

    pub async fn create(&self, post_id: i32, author_id: i32, text: &str) -> AppResult<CommentModel> {
        if Post::find_by_id(post_id).one(&self.db).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let new_comment = comment::ActiveModel {
            post_id: sea_orm::ActiveValue::Set(post_id),
            author_id: sea_orm::ActiveValue::Set(author_id),
            text: sea_orm::ActiveValue::Set(text.to_string()),
            created: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        let comment = new_comment.insert(&self.db).await?;
        tracing::info!(comment_id = comment.id, post_id, author_id, "Comment created");
        Ok(comment)
    }
}

use crate::{
    error::{AppError, AppResult},
    forms::{CleanPost, ImageChange},
    models::{group, post, user, Group, GroupModel, Post, PostModel, User},
    pagination::{Page, Paginator},
    services::upload::{UploadConfig, UploadService, POST_IMAGES_DIR},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use std::collections::HashMap;

/// A post together with the names it is displayed with.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: PostModel,
    pub author: String,
    pub group: Option<GroupModel>,
}

pub struct PostService {
    db: DatabaseConnection,
    paginator: Paginator,
}

impl PostService {
    pub fn new(db: DatabaseConnection, paginator: Paginator) -> Self {
        Self { db, paginator }
    }

    /// Every post, newest first.
    pub async fn list(&self, page: i64) -> AppResult<Page<PostView>> {
        self.fetch_page(newest_first(Post::find()), page).await
    }

    pub async fn list_by_group(&self, group_id: i32, page: i64) -> AppResult<Page<PostView>> {
        let select = Post::find().filter(post::Column::GroupId.eq(group_id));
        self.fetch_page(newest_first(select), page).await
    }

    pub async fn list_by_author(&self, author_id: i32, page: i64) -> AppResult<Page<PostView>> {
        let select = Post::find().filter(post::Column::AuthorId.eq(author_id));
        self.fetch_page(newest_first(select), page).await
    }

    pub async fn count_by_author(&self, author_id: i32) -> AppResult<u64> {
        let count = Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<PostModel> {
        Post::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_view(&self, id: i32) -> AppResult<PostView> {
        let post = self.get_by_id(id).await?;
        let related = PostRelations::load(&self.db, std::slice::from_ref(&post)).await?;
        Ok(related.view(post))
    }

    /// Persist an already cleaned submission. The image is written before the
    /// row and removed again if the insert fails.
    pub async fn create(
        &self,
        author_id: i32,
        form: CleanPost,
        uploads: &UploadConfig,
    ) -> AppResult<PostModel> {
        let image = store_image(&form, uploads).await?;

        let new_post = post::ActiveModel {
            text: sea_orm::ActiveValue::Set(form.text),
            pub_date: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            group_id: sea_orm::ActiveValue::Set(form.group_id),
            author_id: sea_orm::ActiveValue::Set(author_id),
            image: sea_orm::ActiveValue::Set(image.clone()),
            ..Default::default()
        };

        match new_post.insert(&self.db).await {
            Ok(post) => {
                tracing::info!(post_id = post.id, author_id, post = %post, "Post created");
                Ok(post)
            }
            Err(e) => {
                if let Some(stored) = image {
                    UploadService::remove(uploads, &stored).await;
                }
                Err(e.into())
            }
        }
    }

    /// The post, provided `user_id` wrote it.
    pub async fn get_editable(&self, id: i32, user_id: i32) -> AppResult<PostModel> {
        let post = self.get_by_id(id).await?;
        if post.author_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(post)
    }

    /// Apply a cleaned submission to a post obtained from `get_editable`.
    /// The group is replaced as submitted; the image is kept, replaced or
    /// cleared as the form asks, and a superseded file is removed.
    pub async fn update(
        &self,
        existing: PostModel,
        form: CleanPost,
        uploads: &UploadConfig,
    ) -> AppResult<PostModel> {
        let previous_image = existing.image.clone();
        let clearing = matches!(form.image, ImageChange::Clear);
        let new_image = store_image(&form, uploads).await?;

        let mut active: post::ActiveModel = existing.into();
        active.text = sea_orm::ActiveValue::Set(form.text);
        active.group_id = sea_orm::ActiveValue::Set(form.group_id);
        if new_image.is_some() || clearing {
            active.image = sea_orm::ActiveValue::Set(new_image.clone());
        }

        let updated = match active.update(&self.db).await {
            Ok(post) => post,
            Err(e) => {
                if let Some(stored) = new_image {
                    UploadService::remove(uploads, &stored).await;
                }
                return Err(e.into());
            }
        };

        if new_image.is_some() || clearing {
            if let Some(old) = previous_image {
                UploadService::remove(uploads, &old).await;
            }
        }

        tracing::info!(post_id = updated.id, "Post updated");
        Ok(updated)
    }

    /// Only the author may delete. Comments go with the post.
    pub async fn delete(&self, id: i32, user_id: i32) -> AppResult<()> {
        self.get_editable(id, user_id).await?;

        Post::delete_by_id(id).exec(&self.db).await?;
        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    async fn fetch_page(&self, select: Select<Post>, page: i64) -> AppResult<Page<PostView>> {
        let page = self.paginator.fetch(&self.db, select, page).await?;
        let related = PostRelations::load(&self.db, &page.items).await?;
        Ok(page.map(|post| related.view(post)))
    }
}

/// Reverse chronological; ties keep insertion order reversed.
fn newest_first(select: Select<Post>) -> Select<Post> {
    select
        .order_by_desc(post::Column::PubDate)
        .order_by_desc(post::Column::Id)
}

async fn store_image(form: &CleanPost, uploads: &UploadConfig) -> AppResult<Option<String>> {
    match &form.image {
        ImageChange::Replace(image) => {
            let stored =
                UploadService::save_image(uploads, &image.data, image.format, POST_IMAGES_DIR)
                    .await?;
            Ok(Some(stored))
        }
        ImageChange::Keep | ImageChange::Clear => Ok(None),
    }
}

/// Authors and groups for a batch of posts, fetched with one query each.
struct PostRelations {
    authors: HashMap<i32, String>,
    groups: HashMap<i32, GroupModel>,
}

impl PostRelations {
    async fn load<C: ConnectionTrait>(db: &C, posts: &[PostModel]) -> AppResult<Self> {
        let mut author_ids: Vec<i32> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let mut group_ids: Vec<i32> = posts.iter().filter_map(|p| p.group_id).collect();
        group_ids.sort_unstable();
        group_ids.dedup();

        let authors = if author_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(user::Column::Id.is_in(author_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        let groups = if group_ids.is_empty() {
            HashMap::new()
        } else {
            Group::find()
                .filter(group::Column::Id.is_in(group_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect()
        };

        Ok(Self { authors, groups })
    }

    fn view(&self, post: PostModel) -> PostView {
        let author = self.authors.get(&post.author_id).cloned().unwrap_or_default();
        let group = post.group_id.and_then(|id| self.groups.get(&id).cloned());
        PostView {
            post,
            author,
            group,
        }
    }
}

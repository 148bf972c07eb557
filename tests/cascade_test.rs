mod common;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use yatube::config::pagination::PaginationConfig;
use yatube::forms::{CleanPost, ImageChange};
use yatube::models::{comment, post, Comment, Post};
use yatube::pagination::Paginator;
use yatube::services::{
    auth::AuthService, comment::CommentService, group::GroupService, post::PostService,
    upload::UploadConfig, user::UserService,
};
use yatube::AppError;

struct Fixture {
    db: DatabaseConnection,
    posts: PostService,
    comments: CommentService,
    uploads: UploadConfig,
}

async fn fixture() -> Fixture {
    let db = common::test_database().await;
    Fixture {
        posts: PostService::new(db.clone(), Paginator::new(PaginationConfig::new(10))),
        comments: CommentService::new(db.clone()),
        uploads: UploadConfig {
            upload_dir: std::env::temp_dir()
                .join("yatube-cascade-uploads")
                .to_string_lossy()
                .to_string(),
        },
        db,
    }
}

async fn user(db: &DatabaseConnection, name: &str) -> i32 {
    let (user, _) = AuthService::new(db.clone())
        .register(name, "test_password_123")
        .await
        .unwrap();
    user.id
}

fn text_only(text: &str, group_id: Option<i32>) -> CleanPost {
    CleanPost {
        text: text.to_string(),
        group_id,
        image: ImageChange::Keep,
    }
}

#[tokio::test]
async fn deleting_group_clears_post_group() {
    let f = fixture().await;
    let author = user(&f.db, "grouped").await;
    let groups = GroupService::new(f.db.clone());
    let group = groups.create("Cats", "cats", "").await.unwrap();

    let created = f
        .posts
        .create(author, text_only("meow", Some(group.id)), &f.uploads)
        .await
        .unwrap();

    groups.delete("cats").await.unwrap();

    let reloaded = f.posts.get_by_id(created.id).await.unwrap();
    assert_eq!(reloaded.group_id, None);
    assert_eq!(reloaded.text, "meow");
}

#[tokio::test]
async fn deleting_user_removes_posts_and_comments() {
    let f = fixture().await;
    let leaver = user(&f.db, "leaver").await;
    let stayer = user(&f.db, "stayer").await;

    let leaver_post = f
        .posts
        .create(leaver, text_only("bye", None), &f.uploads)
        .await
        .unwrap();
    let stayer_post = f
        .posts
        .create(stayer, text_only("still here", None), &f.uploads)
        .await
        .unwrap();

    // Comments in both directions.
    f.comments
        .create(leaver_post.id, stayer, "on leaver's post")
        .await
        .unwrap();
    f.comments
        .create(stayer_post.id, leaver, "by leaver")
        .await
        .unwrap();
    f.comments
        .create(stayer_post.id, stayer, "by stayer")
        .await
        .unwrap();

    UserService::new(f.db.clone()).delete(leaver).await.unwrap();

    let leaver_posts = Post::find()
        .filter(post::Column::AuthorId.eq(leaver))
        .count(&f.db)
        .await
        .unwrap();
    assert_eq!(leaver_posts, 0);

    let leaver_comments = Comment::find()
        .filter(comment::Column::AuthorId.eq(leaver))
        .count(&f.db)
        .await
        .unwrap();
    assert_eq!(leaver_comments, 0);

    let on_deleted_post = Comment::find()
        .filter(comment::Column::PostId.eq(leaver_post.id))
        .count(&f.db)
        .await
        .unwrap();
    assert_eq!(on_deleted_post, 0);

    let remaining = f.comments.list_by_post(stayer_post.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].comment.text, "by stayer");
    assert_eq!(remaining[0].author, "stayer");

    assert!(f.posts.get_by_id(stayer_post.id).await.is_ok());
}

#[tokio::test]
async fn deleting_post_removes_its_comments() {
    let f = fixture().await;
    let author = user(&f.db, "author").await;

    let doomed = f
        .posts
        .create(author, text_only("doomed", None), &f.uploads)
        .await
        .unwrap();
    let kept = f
        .posts
        .create(author, text_only("kept", None), &f.uploads)
        .await
        .unwrap();
    f.comments.create(doomed.id, author, "gone soon").await.unwrap();
    f.comments.create(kept.id, author, "stays").await.unwrap();

    f.posts.delete(doomed.id, author).await.unwrap();

    let orphaned = Comment::find()
        .filter(comment::Column::PostId.eq(doomed.id))
        .count(&f.db)
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
    assert_eq!(f.comments.list_by_post(kept.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_author_may_change_post() {
    let f = fixture().await;
    let author = user(&f.db, "owner").await;
    let stranger = user(&f.db, "stranger").await;

    let created = f
        .posts
        .create(author, text_only("original", None), &f.uploads)
        .await
        .unwrap();

    let err = f.posts.get_editable(created.id, stranger).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = f.posts.delete(created.id, stranger).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    assert_eq!(f.posts.get_by_id(created.id).await.unwrap().text, "original");

    let mine = f.posts.get_editable(created.id, author).await.unwrap();
    let updated = f
        .posts
        .update(mine, text_only("changed", None), &f.uploads)
        .await
        .unwrap();
    assert_eq!(updated.text, "changed");
    assert_eq!(updated.pub_date, created.pub_date);
}

#[tokio::test]
async fn post_for_missing_author_is_a_constraint_violation() {
    let f = fixture().await;

    let err = f
        .posts
        .create(424242, text_only("ghost", None), &f.uploads)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConstraintViolation(_)));
    assert_eq!(Post::find().count(&f.db).await.unwrap(), 0);
}

#[tokio::test]
async fn listings_page_through_service() {
    let f = fixture().await;
    let author = user(&f.db, "prolific").await;

    for i in 0..11 {
        f.posts
            .create(author, text_only(&format!("post {i}"), None), &f.uploads)
            .await
            .unwrap();
    }

    let first = f.posts.list_by_author(author, 1).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.items[0].post.text, "post 10");
    assert_eq!(first.items[0].author, "prolific");
    assert!(first.has_next);

    let last = f.posts.list_by_author(author, 2).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(last.is_last());

    assert_eq!(f.posts.count_by_author(author).await.unwrap(), 11);
}

use std::sync::Arc;

use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::comment::{Comment, build_comment_tree};
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostDetail, PostPage};
use tracing::instrument;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 5;
const MIN_TITLE_CHARS: usize = 3;

/// Listing, ownership-checked CRUD and the comment operations.
/// Requester identity is always an explicit parameter; there is no
/// ambient "current user".
#[derive(Clone)]
pub struct PostService<P, C>
where
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    posts: Arc<P>,
    comments: Arc<C>,
}

fn validate_post_fields(title: &str, content: &str) -> Result<(), DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::Validation("title must not be empty".into()));
    }
    if title.chars().count() < MIN_TITLE_CHARS {
        return Err(DomainError::Validation(format!(
            "title must be at least {} characters",
            MIN_TITLE_CHARS
        )));
    }
    if content.trim().is_empty() {
        return Err(DomainError::Validation("content must not be empty".into()));
    }
    Ok(())
}

impl<P, C> PostService<P, C>
where
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    pub fn new(posts: Arc<P>, comments: Arc<C>) -> Self {
        Self { posts, comments }
    }

    /// Paginated listing, newest-created first. Pages are 1-indexed;
    /// a page past the end yields empty items with the correct total.
    pub async fn list(&self, filter: Option<&str>, page: u32) -> Result<PostPage, DomainError> {
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(DEFAULT_PAGE_SIZE);

        let total_count = self.posts.count(filter).await?;
        let items = self
            .posts
            .list(filter, i64::from(DEFAULT_PAGE_SIZE), offset)
            .await?;

        Ok(PostPage {
            items,
            total_count,
            page,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Unpaginated, unfiltered dump for the export endpoint.
    pub async fn list_all(&self) -> Result<Vec<Post>, DomainError> {
        self.posts.list_all().await
    }

    #[instrument(skip(self))]
    pub async fn create_post(
        &self,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> Result<Post, DomainError> {
        validate_post_fields(&title, &content)?;
        let post = Post::new(author_id, title, content);
        self.posts.create(post).await
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PostNotFound(id))
    }

    /// The post together with its materialized comment tree.
    pub async fn get_detail(&self, id: Uuid) -> Result<PostDetail, DomainError> {
        let post = self.get_post(id).await?;
        let comments = self.comments.list_for_post(id).await?;
        Ok(PostDetail {
            post,
            comments: build_comment_tree(comments),
        })
    }

    #[instrument(skip(self, title, content))]
    pub async fn update_post(
        &self,
        post_id: Uuid,
        requester_id: Uuid,
        title: String,
        content: String,
    ) -> Result<Post, DomainError> {
        let existing = self.get_post(post_id).await?;
        if existing.author_id != requester_id {
            return Err(DomainError::Forbidden);
        }
        validate_post_fields(&title, &content)?;

        // the update is still scoped to the author, so a concurrent
        // delete surfaces as NotFound rather than a silent write
        match self
            .posts
            .update(post_id, requester_id, title, content)
            .await?
        {
            Some(post) => Ok(post),
            None => Err(DomainError::PostNotFound(post_id)),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, post_id: Uuid, requester_id: Uuid) -> Result<(), DomainError> {
        let existing = self.get_post(post_id).await?;
        if existing.author_id != requester_id {
            return Err(DomainError::Forbidden);
        }
        self.posts.delete_with_comments(post_id).await
    }

    /// Persists a new leaf comment. The parent, if given, must be an
    /// existing comment of the same post, which keeps the stored
    /// parent relation acyclic by construction.
    #[instrument(skip(self, text))]
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        text: String,
        parent_id: Option<Uuid>,
    ) -> Result<Comment, DomainError> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::PostNotFound(post_id));
        }
        if text.trim().is_empty() {
            return Err(DomainError::Validation(
                "comment text must not be empty".into(),
            ));
        }
        if let Some(parent_id) = parent_id {
            let parent = self.comments.find_by_id(parent_id).await?.ok_or_else(|| {
                DomainError::Validation(format!("parent comment {} does not exist", parent_id))
            })?;
            if parent.post_id != post_id {
                return Err(DomainError::Validation(
                    "parent comment belongs to a different post".into(),
                ));
            }
        }

        self.comments
            .insert(Comment::new(post_id, text, parent_id))
            .await
    }
}

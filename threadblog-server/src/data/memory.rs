//! In-memory repository implementations backing the service tests.
//! Entities are appended in creation order, which keeps the ordering
//! semantics of the SQL implementations without a running database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::user::User;

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    posts: Mutex<Vec<Post>>,
    comments: Mutex<Vec<Comment>>,
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[derive(Clone)]
pub struct MemoryUserRepository {
    store: Arc<MemoryStore>,
}

impl MemoryUserRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut users = self.store.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(DomainError::UserAlreadyExists(
                "username already taken".to_string(),
            ));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let users = self.store.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let users = self.store.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[derive(Clone)]
pub struct MemoryPostRepository {
    store: Arc<MemoryStore>,
}

impl MemoryPostRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

fn title_matches(post: &Post, filter: Option<&str>) -> bool {
    match filter {
        Some(needle) => post.title.contains(needle),
        None => true,
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        self.store.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        let posts = self.store.posts.lock().unwrap();
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list(
        &self,
        filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, DomainError> {
        let posts = self.store.posts.lock().unwrap();
        Ok(posts
            .iter()
            .rev() // appended in creation order, so newest first
            .filter(|p| title_matches(p, filter))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: Option<&str>) -> Result<u64, DomainError> {
        let posts = self.store.posts.lock().unwrap();
        Ok(posts.iter().filter(|p| title_matches(p, filter)).count() as u64)
    }

    async fn list_all(&self) -> Result<Vec<Post>, DomainError> {
        let posts = self.store.posts.lock().unwrap();
        Ok(posts.iter().rev().cloned().collect())
    }

    async fn update(
        &self,
        id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> Result<Option<Post>, DomainError> {
        let mut posts = self.store.posts.lock().unwrap();
        match posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
        {
            Some(post) => {
                post.title = title;
                post.content = content;
                post.updated_at = Utc::now();
                Ok(Some(post.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_with_comments(&self, id: Uuid) -> Result<(), DomainError> {
        // comments first, then the post, as the transactional
        // implementation orders it
        let mut comments = self.store.comments.lock().unwrap();
        comments.retain(|c| c.post_id != id);
        drop(comments);

        self.store.posts.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemoryCommentRepository {
    store: Arc<MemoryStore>,
}

impl MemoryCommentRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn insert(&self, comment: Comment) -> Result<Comment, DomainError> {
        self.store.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DomainError> {
        let comments = self.store.comments.lock().unwrap();
        Ok(comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        let comments = self.store.comments.lock().unwrap();
        Ok(comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<u64, DomainError> {
        let mut comments = self.store.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| c.post_id != post_id);
        Ok((before - comments.len()) as u64)
    }
}

use crate::domain::error::DomainError;
use crate::domain::post::Post;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError>;
    /// Newest-created first. `filter` is a case-sensitive substring
    /// match on the title.
    async fn list(
        &self,
        filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, DomainError>;
    async fn count(&self, filter: Option<&str>) -> Result<u64, DomainError>;
    /// Full dump for the unpaginated export endpoint.
    async fn list_all(&self) -> Result<Vec<Post>, DomainError>;
    /// Scoped to the author; returns `None` when no row matched.
    async fn update(
        &self,
        id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> Result<Option<Post>, DomainError>;
    /// Removes the post's comments, then the post, in one transaction.
    /// Comments go first so no comment ever references a deleted post.
    async fn delete_with_comments(&self, id: Uuid) -> Result<(), DomainError>;
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to create post: {}", e);
            DomainError::Internal(format!("database error: {}", e))
        })?;

        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, created_at, updated_at
            FROM posts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find_by_id {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn list(
        &self,
        filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, DomainError> {
        // strpos instead of LIKE so the needle is taken literally
        // (no % or _ escaping), and the match stays case-sensitive
        // regardless of collation.
        let query = match filter {
            Some(needle) => sqlx::query_as::<_, Post>(
                r#"
                SELECT id, author_id, title, content, created_at, updated_at
                FROM posts
                WHERE strpos(title, $1) > 0
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(needle.to_string())
            .bind(limit)
            .bind(offset),
            None => sqlx::query_as::<_, Post>(
                r#"
                SELECT id, author_id, title, content, created_at, updated_at
                FROM posts
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset),
        };

        query.fetch_all(&self.pool).await.map_err(|e| {
            error!("db error while listing posts: {}", e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn count(&self, filter: Option<&str>) -> Result<u64, DomainError> {
        let query = match filter {
            Some(needle) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE strpos(title, $1) > 0")
                    .bind(needle.to_string())
            }
            None => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts"),
        };

        let total = query.fetch_one(&self.pool).await.map_err(|e| {
            error!("db error while counting posts: {}", e);
            DomainError::Internal(e.to_string())
        })?;
        Ok(total as u64)
    }

    async fn list_all(&self) -> Result<Vec<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, created_at, updated_at
            FROM posts
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while dumping posts: {}", e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn update(
        &self,
        id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> Result<Option<Post>, DomainError> {
        let now = Utc::now();
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $1, content = $2, updated_at = $3
            WHERE id = $4 AND author_id = $5
            RETURNING id, author_id, title, content, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to update post {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })?;

        if post.is_some() {
            info!(post_id = %id, "post updated");
        }

        Ok(post)
    }

    async fn delete_with_comments(&self, id: Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("failed to begin delete transaction for post {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })?;

        let comments = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("failed to delete comments for post {}: {}", id, e);
                DomainError::Internal(e.to_string())
            })?;

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("failed to delete post {}: {}", id, e);
                DomainError::Internal(e.to_string())
            })?;

        tx.commit().await.map_err(|e| {
            error!("failed to commit delete of post {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })?;

        info!(
            post_id = %id,
            comments_removed = comments.rows_affected(),
            "post deleted"
        );
        Ok(())
    }
}

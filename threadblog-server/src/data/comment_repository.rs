use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: Comment) -> Result<Comment, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DomainError>;
    /// All comments of a post, flat, in insertion order. Tree assembly
    /// happens in the domain layer.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError>;
    /// Removes every comment of the post. Idempotent; returns the
    /// number of rows removed.
    ///
    /// The SQL post repository does not call this during post
    /// deletion: there the same DELETE runs inlined in
    /// `PostRepository::delete_with_comments` so that comments and
    /// post go in one transaction.
    async fn delete_for_post(&self, post_id: Uuid) -> Result<u64, DomainError>;
}

#[derive(Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn insert(&self, comment: Comment) -> Result<Comment, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, parent_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to insert comment: {}", e);
            DomainError::Internal(format!("database error: {}", e))
        })?;

        info!(comment_id = %comment.id, post_id = %comment.post_id, "comment added");
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DomainError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, parent_id, text, created_at
            FROM comments WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find comment {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, parent_id, text, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error listing comments for post {}: {}", post_id, e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to delete comments for post {}: {}", post_id, e);
                DomainError::Internal(e.to_string())
            })?;

        Ok(result.rows_affected())
    }
}

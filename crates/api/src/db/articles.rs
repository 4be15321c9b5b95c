//! Article repository.

use sqlx::PgPool;

use loomi_core::ArticleId;

use super::RepositoryError;
use crate::models::Article;

const ARTICLE_COLUMNS: &str =
    "id, title, excerpt, content, image_url, published, created_at, updated_at";

/// Fields of an article write; on update `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ArticleFields {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<bool>,
}

/// Repository for editorial articles.
pub struct ArticleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ArticleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published articles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(&self) -> Result<Vec<Article>, RepositoryError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE published \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Get a published article.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published(&self, id: ArticleId) -> Result<Option<Article>, RepositoryError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND published");
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create an article. `title` and `content` must be set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, fields: &ArticleFields) -> Result<Article, RepositoryError> {
        let sql = format!(
            "INSERT INTO articles (title, excerpt, content, image_url, published) \
             VALUES ($1, $2, $3, $4, COALESCE($5, TRUE)) RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(fields.title.as_deref())
            .bind(fields.excerpt.as_deref())
            .bind(fields.content.as_deref())
            .bind(fields.image_url.as_deref())
            .bind(fields.published)
            .fetch_one(self.pool)
            .await?)
    }

    /// Update an article.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the article doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ArticleId,
        fields: &ArticleFields,
    ) -> Result<Article, RepositoryError> {
        let sql = format!(
            "UPDATE articles SET \
                title = COALESCE($2, title), \
                excerpt = COALESCE($3, excerpt), \
                content = COALESCE($4, content), \
                image_url = COALESCE($5, image_url), \
                published = COALESCE($6, published), \
                updated_at = now() \
             WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(fields.title.as_deref())
            .bind(fields.excerpt.as_deref())
            .bind(fields.content.as_deref())
            .bind(fields.image_url.as_deref())
            .bind(fields.published)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete an article.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the article doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: ArticleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Blog repository
//!
//! Database operations for blog posts. Reads join `users` so every returned
//! post carries its author's username.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Blog, BlogQuery, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{
    bind_mysql, bind_mysql_scalar, bind_sqlite, bind_sqlite_scalar, mysql_pool, sqlite_pool,
    SqlValue, WhereClause,
};

const BLOG_SELECT: &str = "SELECT b.id, b.title, b.content, b.author_id, u.username AS author_name, \
     b.published, b.published_at, b.created_at, b.updated_at \
     FROM blogs b LEFT JOIN users u ON u.id = b.author_id";

/// Blog repository trait
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn create(&self, blog: &Blog) -> Result<Blog>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>>;

    async fn update(&self, blog: &Blog) -> Result<Blog>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Newest first, with the total matching count
    async fn list(&self, query: &BlogQuery, params: &ListParams) -> Result<(Vec<Blog>, i64)>;
}

/// SQLx-based blog repository implementation
pub struct SqlxBlogRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogRepository> {
        Arc::new(Self::new(pool))
    }
}

fn blog_where(query: &BlogQuery) -> WhereClause {
    let mut clause = WhereClause::new();
    if let Some(author_id) = query.author_id {
        clause.push("b.author_id = ?", [SqlValue::Int(author_id)]);
    }
    match query.include_drafts_of {
        Some(viewer) => clause.push(
            "(b.published = ? OR b.author_id = ?)",
            [SqlValue::Bool(true), SqlValue::Int(viewer)],
        ),
        None => clause.push("b.published = ?", [SqlValue::Bool(true)]),
    }
    clause
}

#[async_trait]
impl BlogRepository for SqlxBlogRepository {
    async fn create(&self, blog: &Blog) -> Result<Blog> {
        let sql = r#"
            INSERT INTO blogs (title, content, author_id, published, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&blog.title)
                .bind(&blog.content)
                .bind(blog.author_id)
                .bind(blog.published)
                .bind(blog.published_at)
                .bind(blog.created_at)
                .bind(blog.updated_at)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .context("Failed to create blog post")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&blog.title)
                .bind(&blog.content)
                .bind(blog.author_id)
                .bind(blog.published)
                .bind(blog.published_at)
                .bind(blog.created_at)
                .bind(blog.updated_at)
                .execute(mysql_pool(&self.pool)?)
                .await
                .context("Failed to create blog post")?
                .last_insert_id() as i64,
        };

        // Re-read so author_name is populated
        self.get_by_id(id)
            .await?
            .context("Blog post vanished after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>> {
        let sql = format!("{} WHERE b.id = ?", BLOG_SELECT);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite_pool(&self.pool)?)
                    .await
                    .context("Failed to get blog post by ID")?;
                Ok(row.as_ref().map(row_to_blog_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql_pool(&self.pool)?)
                    .await
                    .context("Failed to get blog post by ID")?;
                Ok(row.as_ref().map(row_to_blog_mysql))
            }
        }
    }

    async fn update(&self, blog: &Blog) -> Result<Blog> {
        let sql = r#"
            UPDATE blogs
            SET title = ?, content = ?, published = ?, published_at = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&blog.title)
                    .bind(&blog.content)
                    .bind(blog.published)
                    .bind(blog.published_at)
                    .bind(blog.updated_at)
                    .bind(blog.id)
                    .execute(sqlite_pool(&self.pool)?)
                    .await
                    .context("Failed to update blog post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&blog.title)
                    .bind(&blog.content)
                    .bind(blog.published)
                    .bind(blog.published_at)
                    .bind(blog.updated_at)
                    .bind(blog.id)
                    .execute(mysql_pool(&self.pool)?)
                    .await
                    .context("Failed to update blog post")?;
            }
        }
        Ok(blog.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM blogs WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite_pool(&self.pool)?)
                .await
                .context("Failed to delete blog post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql_pool(&self.pool)?)
                .await
                .context("Failed to delete blog post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(&self, query: &BlogQuery, params: &ListParams) -> Result<(Vec<Blog>, i64)> {
        let clause = blog_where(query);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_blogs_sqlite(sqlite_pool(&self.pool)?, &clause, params).await,
            DatabaseDriver::Mysql => list_blogs_mysql(mysql_pool(&self.pool)?, &clause, params).await,
        }
    }
}

async fn list_blogs_sqlite(
    pool: &SqlitePool,
    clause: &WhereClause,
    params: &ListParams,
) -> Result<(Vec<Blog>, i64)> {
    let count_sql = format!("SELECT COUNT(*) FROM blogs b{}", clause.sql());
    let total: i64 = bind_sqlite_scalar(sqlx::query_scalar(&count_sql), clause.values())
        .fetch_one(pool)
        .await
        .context("Failed to count blog posts")?;

    let list_sql = format!(
        "{}{} ORDER BY b.created_at DESC, b.id DESC LIMIT ? OFFSET ?",
        BLOG_SELECT,
        clause.sql()
    );
    let rows = bind_sqlite(sqlx::query(&list_sql), clause.values())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list blog posts")?;

    Ok((rows.iter().map(row_to_blog_sqlite).collect(), total))
}

async fn list_blogs_mysql(
    pool: &MySqlPool,
    clause: &WhereClause,
    params: &ListParams,
) -> Result<(Vec<Blog>, i64)> {
    let count_sql = format!("SELECT COUNT(*) FROM blogs b{}", clause.sql());
    let total: i64 = bind_mysql_scalar(sqlx::query_scalar(&count_sql), clause.values())
        .fetch_one(pool)
        .await
        .context("Failed to count blog posts")?;

    let list_sql = format!(
        "{}{} ORDER BY b.created_at DESC, b.id DESC LIMIT ? OFFSET ?",
        BLOG_SELECT,
        clause.sql()
    );
    let rows = bind_mysql(sqlx::query(&list_sql), clause.values())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list blog posts")?;

    Ok((rows.iter().map(row_to_blog_mysql).collect(), total))
}

fn row_to_blog_sqlite(row: &sqlx::sqlite::SqliteRow) -> Blog {
    Blog {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        published: row.get("published"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_blog_mysql(row: &sqlx::mysql::MySqlRow) -> Blog {
    Blog {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        published: row.get("published"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

//! Blog service

use crate::db::repositories::BlogRepository;
use crate::models::{Blog, BlogQuery, CreateBlogInput, ListParams, PagedResult, UpdateBlogInput, User};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub const TITLE_MAX_LEN: usize = 200;

/// Error types for blog service operations
#[derive(Debug, thiserror::Error)]
pub enum BlogServiceError {
    /// Missing, or an unpublished post the caller may not see
    #[error("Blog post not found: {0}")]
    NotFound(i64),

    #[error("Only the author can modify this post")]
    Forbidden,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Blog service
pub struct BlogService {
    repo: Arc<dyn BlogRepository>,
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Create a post. Posts are published unless the input says otherwise.
    pub async fn create(&self, author: &User, input: CreateBlogInput) -> Result<Blog, BlogServiceError> {
        let title = validate_title(&input.title)?;
        let content = validate_content(&input.content)?;

        let blog = Blog::new(title, content, author.id, input.published.unwrap_or(true));
        let created = self.repo.create(&blog).await.context("Failed to create blog post")?;
        tracing::debug!(blog_id = created.id, author_id = author.id, "Created blog post");
        Ok(created)
    }

    /// Fetch a post. Drafts are only visible to their author and admins.
    pub async fn get(&self, viewer: Option<&User>, id: i64) -> Result<Blog, BlogServiceError> {
        let blog = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get blog post")?
            .ok_or(BlogServiceError::NotFound(id))?;

        if !blog.published && !viewer.is_some_and(|v| v.can_access(blog.author_id)) {
            return Err(BlogServiceError::NotFound(id));
        }
        Ok(blog)
    }

    /// List posts newest first.
    ///
    /// With `mine` the viewer's own posts are listed, drafts included.
    pub async fn list(
        &self,
        viewer: Option<&User>,
        author_id: Option<i64>,
        mine: bool,
        params: &ListParams,
    ) -> Result<PagedResult<Blog>, BlogServiceError> {
        let query = match viewer {
            Some(user) if mine => BlogQuery {
                author_id: Some(user.id),
                include_drafts_of: Some(user.id),
            },
            Some(user) => BlogQuery {
                author_id,
                include_drafts_of: Some(user.id),
            },
            None if mine => {
                return Err(BlogServiceError::ValidationError(
                    "Sign in to list your own posts".to_string(),
                ))
            }
            None => BlogQuery {
                author_id,
                include_drafts_of: None,
            },
        };

        let (posts, total) = self
            .repo
            .list(&query, params)
            .await
            .context("Failed to list blog posts")?;
        Ok(PagedResult::new(posts, total, params))
    }

    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateBlogInput,
    ) -> Result<Blog, BlogServiceError> {
        if !input.has_changes() {
            return Err(BlogServiceError::ValidationError(
                "No fields to update".to_string(),
            ));
        }
        let mut blog = self.editable(actor, id).await?;

        if let Some(title) = input.title.as_deref() {
            blog.title = validate_title(title)?;
        }
        if let Some(content) = input.content.as_deref() {
            blog.content = validate_content(content)?;
        }
        let now = Utc::now();
        if let Some(published) = input.published {
            blog.set_published(published, now);
        }
        blog.updated_at = now;

        let updated = self.repo.update(&blog).await.context("Failed to update blog post")?;
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), BlogServiceError> {
        self.editable(actor, id).await?;
        self.repo.delete(id).await.context("Failed to delete blog post")?;
        tracing::debug!(blog_id = id, by = actor.id, "Deleted blog post");
        Ok(())
    }

    async fn editable(&self, actor: &User, id: i64) -> Result<Blog, BlogServiceError> {
        let blog = self.get(Some(actor), id).await?;
        if !actor.can_access(blog.author_id) {
            return Err(BlogServiceError::Forbidden);
        }
        Ok(blog)
    }
}

fn validate_title(title: &str) -> Result<String, BlogServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BlogServiceError::ValidationError("Title is required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(BlogServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            TITLE_MAX_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> Result<String, BlogServiceError> {
    if content.trim().is_empty() {
        return Err(BlogServiceError::ValidationError("Content is required".to_string()));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxBlogRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn setup() -> (BlogService, User, User, User) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let mut created = Vec::new();
        for (name, role) in [("alice", UserRole::User), ("bob", UserRole::User), ("root", UserRole::Admin)] {
            created.push(
                users
                    .create(&User::new(
                        name.to_string(),
                        format!("{}@example.com", name),
                        "hash".to_string(),
                        role,
                    ))
                    .await
                    .unwrap(),
            );
        }
        let admin = created.pop().unwrap();
        let bob = created.pop().unwrap();
        let alice = created.pop().unwrap();
        (BlogService::new(SqlxBlogRepository::boxed(pool)), alice, bob, admin)
    }

    #[tokio::test]
    async fn test_create_requires_title_and_content() {
        let (service, alice, _, _) = setup().await;
        for bad in [CreateBlogInput::new("", "body"), CreateBlogInput::new("title", "  ")] {
            assert!(matches!(
                service.create(&alice, bad).await,
                Err(BlogServiceError::ValidationError(_))
            ));
        }

        let post = service
            .create(&alice, CreateBlogInput::new("Hello", "First post"))
            .await
            .unwrap();
        assert!(post.published);
        assert_eq!(post.author_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_draft_visibility() {
        let (service, alice, bob, admin) = setup().await;
        let draft = service
            .create(&alice, CreateBlogInput::new("WIP", "...").draft())
            .await
            .unwrap();

        assert!(service.get(Some(&alice), draft.id).await.is_ok());
        assert!(service.get(Some(&admin), draft.id).await.is_ok());
        assert!(matches!(
            service.get(Some(&bob), draft.id).await,
            Err(BlogServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get(None, draft.id).await,
            Err(BlogServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_edits() {
        let (service, alice, bob, admin) = setup().await;
        let post = service
            .create(&alice, CreateBlogInput::new("Mine", "text"))
            .await
            .unwrap();

        let change = UpdateBlogInput {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&bob, post.id, change.clone()).await,
            Err(BlogServiceError::Forbidden)
        ));
        assert!(matches!(
            service.delete(&bob, post.id).await,
            Err(BlogServiceError::Forbidden)
        ));

        let updated = service.update(&admin, post.id, change).await.unwrap();
        assert_eq!(updated.title, "Hijacked");

        service.delete(&alice, post.id).await.unwrap();
        assert!(matches!(
            service.get(Some(&alice), post.id).await,
            Err(BlogServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_draft() {
        let (service, alice, _, _) = setup().await;
        let draft = service
            .create(&alice, CreateBlogInput::new("Later", "soon").draft())
            .await
            .unwrap();
        assert!(draft.published_at.is_none());

        let live = service
            .update(
                &alice,
                draft.id,
                UpdateBlogInput {
                    published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(live.published);
        assert!(live.published_at.is_some());
        assert!(service.get(None, draft.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_modes() {
        let (service, alice, bob, _) = setup().await;
        service.create(&alice, CreateBlogInput::new("a1", "x")).await.unwrap();
        service.create(&alice, CreateBlogInput::new("a2", "x").draft()).await.unwrap();
        service.create(&bob, CreateBlogInput::new("b1", "x")).await.unwrap();
        service.create(&bob, CreateBlogInput::new("b2", "x").draft()).await.unwrap();

        let params = ListParams::default();
        assert_eq!(service.list(None, None, false, &params).await.unwrap().total, 2);
        assert_eq!(service.list(None, Some(bob.id), false, &params).await.unwrap().total, 1);

        let mine = service.list(Some(&alice), None, true, &params).await.unwrap();
        assert_eq!(mine.total, 2);
        assert!(mine.items.iter().all(|b| b.author_id == alice.id));

        // Signed-in viewers see public posts plus their own drafts
        assert_eq!(service.list(Some(&alice), None, false, &params).await.unwrap().total, 3);

        assert!(matches!(
            service.list(None, None, true, &params).await,
            Err(BlogServiceError::ValidationError(_))
        ));
    }
}

//! Blog post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blog post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    /// Unique identifier
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Author user ID
    pub author_id: i64,
    /// Author username, filled in by list and get queries
    #[serde(default)]
    pub author_name: Option<String>,
    /// Whether the post is visible to everyone
    pub published: bool,
    /// Set the first time the post is published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub fn new(title: String, content: String, author_id: i64, published: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by database
            title,
            content,
            author_id,
            author_name: None,
            published,
            published_at: published.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Publish or unpublish, stamping `published_at` on first publication
    pub fn set_published(&mut self, published: bool, now: DateTime<Utc>) {
        if published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.published = published;
    }
}

/// Input for creating a new blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBlogInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Defaults to published
    #[serde(default)]
    pub published: Option<bool>,
}

impl CreateBlogInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            published: None,
        }
    }

    pub fn draft(mut self) -> Self {
        self.published = Some(false);
        self
    }
}

/// Input for updating a blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBlogInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

impl UpdateBlogInput {
    pub fn has_changes(&self) -> bool {
        self.title.is_some() || self.content.is_some() || self.published.is_some()
    }
}

/// Listing criteria for blog posts
#[derive(Debug, Clone, Default)]
pub struct BlogQuery {
    /// Restrict to one author
    pub author_id: Option<i64>,
    /// Also include unpublished posts written by this user
    pub include_drafts_of: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_published_blog_has_timestamp() {
        let blog = Blog::new("T".into(), "C".into(), 1, true);
        assert!(blog.published);
        assert!(blog.published_at.is_some());

        let draft = Blog::new("T".into(), "C".into(), 1, false);
        assert!(draft.published_at.is_none());
    }

    #[test]
    fn test_set_published_keeps_first_timestamp() {
        let mut blog = Blog::new("T".into(), "C".into(), 1, false);
        let first = Utc::now();
        blog.set_published(true, first);
        assert_eq!(blog.published_at, Some(first));

        blog.set_published(false, first + chrono::Duration::hours(1));
        blog.set_published(true, first + chrono::Duration::hours(2));
        assert_eq!(blog.published_at, Some(first));
        assert!(blog.published);
    }

    #[test]
    fn test_update_has_changes() {
        assert!(!UpdateBlogInput::default().has_changes());
        let update = UpdateBlogInput {
            published: Some(false),
            ..Default::default()
        };
        assert!(update.has_changes());
    }
}

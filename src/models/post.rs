//! Blog post model for the portfolio CMS

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{SortColumns, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub tags: Vec<String>,
    /// Stamped the first time the post is published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(slug: String, title: String, content: String, content_html: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            excerpt: None,
            content,
            content_html,
            cover_image: None,
            status: PostStatus::Draft,
            tags: Vec::new(),
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `Published`, keeping the original publication time on re-publish
    pub fn publish(&mut self, at: DateTime<Utc>) {
        self.status = PostStatus::Published;
        if self.published_at.is_none() {
            self.published_at = Some(at);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostFilter {
    pub status: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

pub const POST_SORT_COLUMNS: SortColumns = SortColumns {
    fields: &[
        ("id", "id"),
        ("title", "title"),
        ("slug", "slug"),
        ("status", "status"),
        ("publishedAt", "published_at"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
    default_column: "created_at",
    default_order: SortOrder::Desc,
};

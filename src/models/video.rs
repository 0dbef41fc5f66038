//! YouTube content model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::pagination::{SortColumns, SortOrder};

static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub youtube_id: String,
    /// Canonical watch URL
    pub url: String,
    pub description: Option<String>,
    pub channel: Option<String>,
    pub duration_seconds: Option<i64>,
    pub tags: Vec<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn new(title: String, youtube_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            url: watch_url(&youtube_id),
            title,
            youtube_id,
            description: None,
            channel: None,
            duration_seconds: None,
            tags: Vec::new(),
            published: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Extract the 11-character video ID from a watch, short, embed or
/// youtu.be URL. A bare ID is accepted as-is.
pub fn parse_youtube_id(input: &str) -> Option<String> {
    let input = input.trim();
    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }
    VIDEO_URL
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn watch_url(youtube_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", youtube_id)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoInput {
    pub title: String,
    /// Watch URL or bare video ID
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateVideoInput {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub channel: Option<String>,
    pub duration_seconds: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoFilter {
    pub published: Option<bool>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

pub const VIDEO_SORT_COLUMNS: SortColumns = SortColumns {
    fields: &[
        ("id", "id"),
        ("title", "title"),
        ("channel", "channel"),
        ("durationSeconds", "duration_seconds"),
        ("published", "published"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
    default_column: "created_at",
    default_order: SortOrder::Desc,
};

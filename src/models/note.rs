//! Study note model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;
use super::pagination::{SortColumns, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyNote {
    pub id: i64,
    pub title: String,
    /// Markdown source
    pub content: String,
    pub content_html: String,
    /// Video the note was taken for, if any
    pub video_id: Option<i64>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudyNote {
    pub fn new(title: String, content: String, content_html: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            content,
            content_html,
            video_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub video_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// `null` detaches the note from its video
    #[serde(default, deserialize_with = "double_option")]
    pub video_id: Option<Option<i64>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteFilter {
    pub video_id: Option<i64>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

pub const NOTE_SORT_COLUMNS: SortColumns = SortColumns {
    fields: &[
        ("id", "id"),
        ("title", "title"),
        ("videoId", "video_id"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
    default_column: "updated_at",
    default_order: SortOrder::Desc,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let absent: UpdateNoteInput = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(absent.video_id, None);

        let detach: UpdateNoteInput = serde_json::from_str(r#"{"videoId":null}"#).unwrap();
        assert_eq!(detach.video_id, Some(None));

        let attach: UpdateNoteInput = serde_json::from_str(r#"{"videoId":7}"#).unwrap();
        assert_eq!(attach.video_id, Some(Some(7)));
    }
}

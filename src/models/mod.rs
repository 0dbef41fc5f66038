//! Data models
//!
//! Records stored by the admin backend, the inputs that create and
//! update them, and the list parameters shared by every collection.

mod app_module;
mod audit_log;
mod dashboard;
mod note;
mod pagination;
mod post;
mod test_series;
mod user;
mod video;

use serde::{Deserialize, Deserializer};

pub use app_module::{AppModule, CreateModuleInput, ModuleFilter, UpdateModuleInput, MODULE_SORT_COLUMNS};
pub use audit_log::{AuditAction, AuditFilter, AuditLog, NewAuditLog, AUDIT_SORT_COLUMNS};
pub use dashboard::{DashboardStats, EntityCounts, RuntimeMetrics, RECENT_ACTIVITY_LIMIT};
pub use note::{CreateNoteInput, NoteFilter, StudyNote, UpdateNoteInput, NOTE_SORT_COLUMNS};
pub use pagination::{total_pages, ListParams, PageQuery, PagedResult, SortColumns, SortOrder};
pub use post::{CreatePostInput, Post, PostFilter, PostStatus, UpdatePostInput, POST_SORT_COLUMNS};
pub use test_series::{
    CreateTestSeriesInput, Question, QuestionInput, QuestionView, TestSeries, TestSeriesDetail,
    TestSeriesSummary, TEST_SERIES_SORT_COLUMNS,
};
pub use user::{CreateUserInput, UpdateUserInput, User, UserFilter, UserRole, UserStatus, USER_SORT_COLUMNS};
pub use video::{
    parse_youtube_id, watch_url, CreateVideoInput, UpdateVideoInput, Video, VideoFilter,
    VIDEO_SORT_COLUMNS,
};

/// Deserialize a field that distinguishes "absent" (`None`) from
/// explicit `null` (`Some(None)`). Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

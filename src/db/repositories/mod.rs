//! Database repositories
//!
//! One repository per entity. Each trait has a `Sqlx*` implementation that
//! dispatches to SQLite or MySQL depending on the pool's driver.

pub mod app_module;
pub mod audit_log;
pub mod note;
pub mod post;
pub mod query;
pub mod test_series;
pub mod user;
pub mod video;

pub use app_module::{ModuleRepository, SqlxModuleRepository};
pub use audit_log::{AuditLogRepository, SqlxAuditLogRepository};
pub use note::{NoteRepository, SqlxNoteRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use test_series::{SqlxTestSeriesRepository, TestSeriesRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use video::{SqlxVideoRepository, VideoRepository};

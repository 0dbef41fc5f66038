//! Services layer - Business logic
//!
//! Services validate input, coordinate repositories and the cache, and
//! record an audit entry after every successful mutation. They return
//! [`ServiceError`] so the API layer can map failures to status codes.

pub mod app_module;
pub mod audit;
pub mod dashboard;
pub mod error;
pub mod markdown;
pub mod note;
pub mod password;
pub mod post;
pub mod practice;
pub mod slug;
pub mod user;
pub mod validation;
pub mod video;

pub use app_module::ModuleService;
pub use audit::{AuditService, ChangeRecorder};
pub use dashboard::{DashboardService, DashboardSources, DASHBOARD_CACHE_KEY, DASHBOARD_CACHE_PATTERN};
pub use error::{ServiceError, ServiceResult};
pub use markdown::MarkdownRenderer;
pub use note::NoteService;
pub use password::{hash_password, verify_password};
pub use post::PostService;
pub use practice::PracticeService;
pub use slug::{generate_slug, is_valid_slug};
pub use user::UserService;
pub use video::VideoService;

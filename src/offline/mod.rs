//! Offline-first client cache
//!
//! Mirrors remote collections (videos, notes, posts) into a local SQLite
//! file. Reads are served from the local copy whenever it has data and
//! refreshed in the background; the remote is only awaited when the local
//! copy is empty.

pub mod cache;
pub mod remote;
pub mod store;

pub use cache::OfflineCache;
pub use remote::{HttpRemote, RemoteSource};
pub use store::{open_local_pool, LocalStore, SqliteLocalStore};

use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Post, StudyNote, Video};

/// A record that can be mirrored locally
pub trait OfflineRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable identifier within its collection
    fn record_id(&self) -> String;
}

impl OfflineRecord for Video {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

impl OfflineRecord for StudyNote {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

impl OfflineRecord for Post {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Remote reported an error: {0}")]
    Remote(String),

    #[error("Local store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Invalid record payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type OfflineResult<T> = Result<T, OfflineError>;

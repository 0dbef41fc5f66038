//! Remote collection source

use async_trait::async_trait;
use serde::Deserialize;
use std::marker::PhantomData;
use std::time::Duration;

use super::{OfflineError, OfflineRecord, OfflineResult};
use crate::config::OfflineConfig;
use crate::models::PagedResult;

#[async_trait]
pub trait RemoteSource<T: OfflineRecord>: Send + Sync {
    /// Fetch every record of the collection, in server order
    async fn fetch_all(&self) -> OfflineResult<Vec<T>>;
}

/// Pages through `GET {base}/api/{collection}` on an adminhub server
pub struct HttpRemote<T> {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    page_size: u32,
    _record: PhantomData<fn() -> T>,
}

#[derive(Debug, Deserialize)]
struct Envelope<D> {
    success: bool,
    data: Option<D>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl<T> HttpRemote<T> {
    pub fn new(client: reqwest::Client, base_url: &str, collection: &str, page_size: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            page_size: page_size.max(1),
            _record: PhantomData,
        }
    }

    /// Build a client from the offline configuration
    pub fn client(config: &OfflineConfig) -> OfflineResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent(concat!("adminhub-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?)
    }

    pub fn from_config(client: reqwest::Client, config: &OfflineConfig, collection: &str) -> Self {
        Self::new(client, &config.remote_url, collection, config.page_size)
    }

    fn page_url(&self, page: u32) -> String {
        format!(
            "{}/api/{}?page={}&limit={}",
            self.base_url, self.collection, page, self.page_size
        )
    }
}

#[async_trait]
impl<T: OfflineRecord> RemoteSource<T> for HttpRemote<T> {
    async fn fetch_all(&self) -> OfflineResult<Vec<T>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let url = self.page_url(page);
            tracing::debug!(%url, "Fetching remote page");
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                    .ok()
                    .and_then(|e| e.error)
                    .map(|e| e.message)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
                return Err(OfflineError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let envelope: Envelope<PagedResult<T>> = serde_json::from_str(&body)?;
            let data = match envelope {
                Envelope {
                    success: true,
                    data: Some(data),
                    ..
                } => data,
                Envelope { error: Some(e), .. } => {
                    return Err(OfflineError::Remote(format!("{}: {}", e.code, e.message)))
                }
                _ => return Err(OfflineError::Remote("response carried no data".to_string())),
            };

            let received = data.items.len();
            records.extend(data.items);
            if received == 0 || page >= data.total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!(collection = %self.collection, count = records.len(), "Fetched remote collection");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Video;

    #[test]
    fn test_page_url() {
        let remote: HttpRemote<Video> =
            HttpRemote::new(reqwest::Client::new(), "http://localhost:8080/", "videos", 50);
        assert_eq!(remote.page_url(2), "http://localhost:8080/api/videos?page=2&limit=50");
    }

    #[test]
    fn test_page_size_at_least_one() {
        let remote: HttpRemote<Video> = HttpRemote::new(reqwest::Client::new(), "http://x", "notes", 0);
        assert!(remote.page_url(1).ends_with("limit=1"));
    }

    #[test]
    fn test_error_envelope_parses() {
        let body = r#"{"success":false,"error":{"code":"NOT_FOUND","message":"gone"}}"#;
        let envelope: Envelope<PagedResult<Video>> = serde_json::from_str(body).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.unwrap().code, "NOT_FOUND");
    }

    /// Serve `total` videos in pages over a real socket
    async fn spawn_server(total: usize, fail: bool) -> String {
        use axum::extract::Query;
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::{json, Value};
        use std::collections::HashMap;

        let handler = move |Query(q): Query<HashMap<String, u32>>| async move {
            if fail {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": { "code": "INTERNAL_ERROR", "message": "boom" } })),
                );
            }
            let page = q.get("page").copied().unwrap_or(1) as usize;
            let limit = q.get("limit").copied().unwrap_or(10) as usize;
            let items: Vec<Value> = (0..total)
                .skip((page - 1) * limit)
                .take(limit)
                .map(|i| {
                    let mut v = Video::new(format!("Video {}", i), "dQw4w9WgXcQ".to_string());
                    v.id = i as i64 + 1;
                    serde_json::to_value(v).unwrap()
                })
                .collect();
            let total_pages = total.div_ceil(limit);
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "data": { "items": items, "total": total, "page": page, "limit": limit, "totalPages": total_pages }
                })),
            )
        };

        let app = Router::new().route("/api/videos", get(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_all_pages_through() {
        let base = spawn_server(7, false).await;
        let remote: HttpRemote<Video> = HttpRemote::new(reqwest::Client::new(), &base, "videos", 3);
        let videos = remote.fetch_all().await.unwrap();
        assert_eq!(videos.len(), 7);
        assert_eq!(videos[0].id, 1);
        assert_eq!(videos[6].title, "Video 6");
    }

    #[tokio::test]
    async fn test_fetch_all_empty_collection() {
        let base = spawn_server(0, false).await;
        let remote: HttpRemote<Video> = HttpRemote::new(reqwest::Client::new(), &base, "videos", 3);
        assert!(remote.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_reports_status() {
        let base = spawn_server(3, true).await;
        let remote: HttpRemote<Video> = HttpRemote::new(reqwest::Client::new(), &base, "videos", 3);
        match remote.fetch_all().await {
            Err(OfflineError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected status error, got {:?}", other.map(|v| v.len())),
        }
    }
}

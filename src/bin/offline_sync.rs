//! adminhub-sync - mirror remote collections into the local offline store
//!
//! Usage: `adminhub-sync [config.yml]`

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adminhub::config::{Config, OfflineConfig};
use adminhub::models::{Post, StudyNote, Video};
use adminhub::offline::{
    open_local_pool, HttpRemote, LocalStore, OfflineCache, OfflineRecord, SqliteLocalStore,
};

struct SyncReport {
    collection: &'static str,
    result: Result<usize, String>,
    local: usize,
    last_synced_at: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adminhub=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yml"));
    let config = Config::load_with_env(&config_path)?;
    let offline = &config.offline;

    tracing::info!(
        remote = %offline.remote_url,
        local = %offline.local_path.display(),
        "Starting offline sync"
    );

    let pool = open_local_pool(&offline.local_path).await?;
    let client = HttpRemote::<Video>::client(offline)?;

    let reports = vec![
        sync_collection::<Video>(&client, offline, &pool, "videos").await?,
        sync_collection::<StudyNote>(&client, offline, &pool, "notes").await?,
        sync_collection::<Post>(&client, offline, &pool, "posts").await?,
    ];

    let mut failed = false;
    for report in &reports {
        let synced = report
            .last_synced_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        match &report.result {
            Ok(count) => println!("{:<8} synced {:>5} records (last sync {})", report.collection, count, synced),
            Err(e) => {
                failed = true;
                println!(
                    "{:<8} FAILED: {} ({} local records kept, last sync {})",
                    report.collection, e, report.local, synced
                );
            }
        }
    }

    pool.close().await;
    if failed {
        anyhow::bail!("One or more collections failed to sync");
    }
    Ok(())
}

async fn sync_collection<T: OfflineRecord>(
    client: &reqwest::Client,
    config: &OfflineConfig,
    pool: &SqlitePool,
    collection: &'static str,
) -> Result<SyncReport> {
    let store = Arc::new(SqliteLocalStore::<T>::new(pool.clone(), collection));
    let remote = Arc::new(HttpRemote::<T>::from_config(client.clone(), config, collection));
    let cache: OfflineCache<T> = OfflineCache::new(collection, remote, store.clone());

    let result = cache.refresh().await.map_err(|e| {
        tracing::warn!(collection, "Sync failed: {}", e);
        e.to_string()
    });

    Ok(SyncReport {
        collection,
        result,
        local: store.read_all().await?.len(),
        last_synced_at: store.last_synced_at().await?,
    })
}

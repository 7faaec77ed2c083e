//! Storage backends for monitors and their metric log
//!
//! This module provides a trait-based abstraction over the two collections
//! the scheduler persists: monitor definitions (with cached status) and the
//! append-only log of probe outcomes.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio tasks
//! - **Narrow**: insert, find, update, count and delete with typed filters
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database with migrations
//! - **In-Memory**: No persistence, for testing or `backend = "none"`
//!
//! ## Usage
//!
//! ```no_run
//! use pulsewatch::config::StorageConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = pulsewatch::storage::open(&StorageConfig::default()).await?;
//!     println!("{}", backend.get_stats().await?);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::{MetricCount, MetricQuery, MonitorFilter, SortOrder, StatusPatch};

/// Open the backend selected by the storage configuration
pub async fn open(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory storage, data will not survive a restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path, .. } => Ok(Arc::new(sqlite::SqliteBackend::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::ConnectionFailed(
            "sqlite storage requested but the storage-sqlite feature is disabled".to_string(),
        )),
    }
}

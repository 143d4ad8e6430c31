use async_trait::async_trait;

use crate::models::{CallRecord, Load, LoadFilter};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("call record {0} already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait LoadStore: Send + Sync {
    async fn get_by_id(&self, load_id: i64) -> Result<Option<Load>, StoreError>;

    async fn search(&self, filter: &LoadFilter) -> Result<Vec<Load>, StoreError>;
}

#[async_trait]
pub trait CallStore: Send + Sync {
    async fn insert(&self, record: &CallRecord) -> Result<(), StoreError>;

    async fn all(&self) -> Result<Vec<CallRecord>, StoreError>;
}

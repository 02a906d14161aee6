use crate::shared::error::AppError;
use async_trait::async_trait;

/// Keeps the "was offline" flag across restarts.
#[async_trait]
pub trait NetworkStateStore: Send + Sync {
    async fn load_was_offline(&self) -> Result<Option<bool>, AppError>;
    async fn save_was_offline(&self, was_offline: bool) -> Result<(), AppError>;
}

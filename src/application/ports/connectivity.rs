use async_trait::async_trait;

/// Live connectivity signal from the host.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

use async_trait::async_trait;
use fieldsync::application::ports::{
    RemoteApi, RemoteMethod, RemoteRequest, RemoteResponse, UploadRequest,
};
use fieldsync::AppError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Send,
    Upload,
    Context,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub method: RemoteMethod,
    pub path: String,
    pub body: Value,
}

impl RecordedCall {
    pub fn mentions(&self, needle: &str) -> bool {
        self.path.contains(needle) || self.body.to_string().contains(needle)
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    created: u64,
    uploaded: u64,
    fail_all: bool,
    failing_prefixes: Vec<String>,
    missing_prefixes: Vec<String>,
    contexts: HashMap<String, Value>,
    latency: Option<Duration>,
}

/// Records every call; creates answer `srv-N`, uploads answer `file-N`.
#[derive(Debug, Clone, Default)]
pub struct MockRemoteApi {
    state: Arc<RwLock<MockState>>,
}

impl MockRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_all(&self, fail: bool) {
        self.state.write().await.fail_all = fail;
    }

    pub async fn fail_path_prefix(&self, prefix: &str) {
        self.state
            .write()
            .await
            .failing_prefixes
            .push(prefix.to_string());
    }

    /// Calls under `prefix` answer as if the entity were gone.
    pub async fn missing_path_prefix(&self, prefix: &str) {
        self.state
            .write()
            .await
            .missing_prefixes
            .push(prefix.to_string());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.fail_all = false;
        state.failing_prefixes.clear();
        state.missing_prefixes.clear();
    }

    pub async fn set_context(&self, path: &str, context: Value) {
        self.state
            .write()
            .await
            .contexts
            .insert(path.to_string(), context);
    }

    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = Some(latency);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn sends(&self) -> Vec<RecordedCall> {
        self.calls_of(CallKind::Send).await
    }

    pub async fn uploads(&self) -> Vec<RecordedCall> {
        self.calls_of(CallKind::Upload).await
    }

    async fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn calls_mentioning(&self, needle: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.mentions(needle))
            .count()
    }

    async fn record(&self, call: RecordedCall) -> Result<(), AppError> {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;
        let failing = state.fail_all
            || state
                .failing_prefixes
                .iter()
                .any(|prefix| call.path.starts_with(prefix.as_str()));
        let missing = state
            .missing_prefixes
            .iter()
            .any(|prefix| call.path.starts_with(prefix.as_str()));
        let path = call.path.clone();
        state.calls.push(call);

        if missing {
            Err(AppError::NotFound(path))
        } else if failing {
            Err(AppError::SyncFailed(format!("Remote error (500): {path}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError> {
        self.record(RecordedCall {
            kind: CallKind::Send,
            method: request.route.method,
            path: request.route.path.clone(),
            body: request.body.clone(),
        })
        .await?;

        if request.action.is_create() {
            let mut state = self.state.write().await;
            state.created += 1;
            Ok(RemoteResponse::from_body(
                json!({ "id": format!("srv-{}", state.created) }),
            ))
        } else {
            Ok(RemoteResponse::from_body(json!({ "ok": true })))
        }
    }

    async fn upload(&self, request: UploadRequest) -> Result<String, AppError> {
        self.record(RecordedCall {
            kind: CallKind::Upload,
            method: request.route.method,
            path: request.route.path.clone(),
            body: json!({
                "fileName": request.file_name,
                "mimeType": request.mime_type,
                "parentId": request.parent_id,
                "size": request.data.len(),
            }),
        })
        .await?;

        let mut state = self.state.write().await;
        state.uploaded += 1;
        Ok(format!("file-{}", state.uploaded))
    }

    async fn fetch_context(&self, path: &str) -> Result<Value, AppError> {
        self.record(RecordedCall {
            kind: CallKind::Context,
            method: RemoteMethod::Get,
            path: path.to_string(),
            body: Value::Null,
        })
        .await?;

        let state = self.state.read().await;
        Ok(state.contexts.get(path).cloned().unwrap_or_else(|| json!({})))
    }
}

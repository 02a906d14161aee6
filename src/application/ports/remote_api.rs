use crate::domain::value_objects::{EntityClass, SyncAction};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RemoteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteMethod::Get => "GET",
            RemoteMethod::Post => "POST",
            RemoteMethod::Put => "PUT",
            RemoteMethod::Patch => "PATCH",
            RemoteMethod::Delete => "DELETE",
        }
    }
}

/// Endpoint a record is replayed against, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRoute {
    pub method: RemoteMethod,
    pub path: String,
}

impl RemoteRoute {
    pub fn new(method: RemoteMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub entity_class: EntityClass,
    pub action: SyncAction,
    pub route: RemoteRoute,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    /// Server-assigned id, when the endpoint returns one.
    pub id: Option<String>,
    pub body: Value,
}

impl RemoteResponse {
    pub fn from_body(body: Value) -> Self {
        let id = extract_id(&body);
        Self { id, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub entity_class: EntityClass,
    pub route: RemoteRoute,
    /// Owning entity, only when it already has a server id.
    pub parent_id: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// `{ "id": ... }` or `{ "data": { "id": ... } }`, string or number.
pub fn extract_id(body: &Value) -> Option<String> {
    let raw = body
        .get("id")
        .or_else(|| body.get("data").and_then(|data| data.get("id")))?;
    match raw {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Request/response contract of the backend.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError>;
    /// Returns the server id of the uploaded file.
    async fn upload(&self, request: UploadRequest) -> Result<String, AppError>;
    /// Canonical server-side fields of a referenced resource.
    async fn fetch_context(&self, path: &str) -> Result<Value, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_ids_from_common_shapes() {
        assert_eq!(extract_id(&json!({"id": "abc"})), Some("abc".to_string()));
        assert_eq!(extract_id(&json!({"id": 17})), Some("17".to_string()));
        assert_eq!(
            extract_id(&json!({"data": {"id": "nested"}})),
            Some("nested".to_string())
        );
        assert_eq!(extract_id(&json!({"id": ""})), None);
        assert_eq!(extract_id(&json!({"ok": true})), None);
    }
}

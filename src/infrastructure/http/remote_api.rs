use crate::application::ports::{
    RemoteApi, RemoteMethod, RemoteRequest, RemoteResponse, UploadRequest,
};
use crate::application::ports::remote_api::extract_id;
use crate::shared::config::ApiConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// `RemoteApi` over HTTP with JSON bodies.
pub struct ReqwestRemoteApi {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl ReqwestRemoteApi {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn builder(&self, method: RemoteMethod, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(to_method(method), build_url(&self.base_url, path));
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn to_method(method: RemoteMethod) -> Method {
    match method {
        RemoteMethod::Get => Method::GET,
        RemoteMethod::Post => Method::POST,
        RemoteMethod::Put => Method::PUT,
        RemoteMethod::Patch => Method::PATCH,
        RemoteMethod::Delete => Method::DELETE,
    }
}

fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

async fn request_json(builder: reqwest::RequestBuilder) -> Result<Value, AppError> {
    let response = builder
        .send()
        .await
        .map_err(|err| AppError::Network(err.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| AppError::Network(err.to_string()))?;

    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("Remote error ({status}): {body}")));
    }
    if !status.is_success() {
        return Err(AppError::SyncFailed(format!("Remote error ({status}): {body}")));
    }
    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|err| AppError::DeserializationError(err.to_string()))
}

#[async_trait]
impl RemoteApi for ReqwestRemoteApi {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError> {
        tracing::debug!(
            target: "sync::orchestrator",
            method = request.route.method.as_str(),
            path = %request.route.path,
            "sending record"
        );

        let mut builder = self.builder(request.route.method, &request.route.path);
        if request.route.method != RemoteMethod::Delete && !request.body.is_null() {
            builder = builder.json(&request.body);
        }

        let body = request_json(builder).await?;
        Ok(RemoteResponse::from_body(body))
    }

    async fn upload(&self, request: UploadRequest) -> Result<String, AppError> {
        let mut body = json!({
            "fileName": request.file_name,
            "mimeType": request.mime_type,
            "data": STANDARD.encode(&request.data),
        });
        if let Some(parent_id) = request.parent_id {
            body["parentId"] = Value::String(parent_id);
        }

        let builder = self
            .builder(request.route.method, &request.route.path)
            .json(&body);
        let response = request_json(builder).await?;

        extract_id(&response).ok_or_else(|| {
            AppError::SyncFailed(format!(
                "Upload to {} returned no id",
                request.route.path
            ))
        })
    }

    async fn fetch_context(&self, path: &str) -> Result<Value, AppError> {
        let builder = self.builder(RemoteMethod::Get, path);
        request_json(builder).await
    }
}

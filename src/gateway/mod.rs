//! Remote data gateway: list/get/create/update/delete against a resource's
//! endpoints. Bodies travel as JSON values so the trait stays object safe;
//! the list controller decodes them into typed records.
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::resource::{Descriptor, UpdateMethod};
use crate::store::Filters;

pub mod model;

pub use model::ListPage;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(String),
    /// Session missing or expired; the hosting application sends the user to login.
    #[error("unauthorized")]
    Unauthorized,
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Message shown to the user; `fallback` covers errors without a server message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            GatewayError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            GatewayError::Unauthorized => "Session expired, please log in again".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }
}

/// Parameters of one list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
    pub filters: Filters,
}

impl ListQuery {
    /// `page`, `limit` and `search` always; filters only when applied.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("search".to_string(), self.search.clone()),
        ];
        pairs.extend(
            self.filters
                .applied()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        pairs
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list(&self, descriptor: &Descriptor, query: &ListQuery) -> Result<ListPage<Value>, GatewayError>;

    async fn get(&self, descriptor: &Descriptor, id: &str) -> Result<Value, GatewayError>;

    async fn create(&self, descriptor: &Descriptor, body: Value) -> Result<Value, GatewayError>;

    async fn update(&self, descriptor: &Descriptor, id: &str, body: Value) -> Result<Value, GatewayError>;

    async fn delete(&self, descriptor: &Descriptor, id: &str) -> Result<(), GatewayError>;
}

#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn from_config(cfg: &Config) -> Result<Self, GatewayError> {
        let base_url = Url::parse(cfg.api.base_url.trim()).map_err(|e| GatewayError::Url(e.to_string()))?;
        Self::new(
            base_url,
            cfg.token().map(str::to_string),
            Duration::from_secs(cfg.api.timeout_seconds),
            &cfg.api.user_agent,
        )
    }

    pub fn new(
        mut base_url: Url,
        token: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, GatewayError> {
        // Url::join drops the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::Url(e.to_string()))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(path)?;
        let mut builder = self
            .http
            .request(method, url)
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        Ok(builder)
    }

    pub fn build_list_request(&self, descriptor: &Descriptor, query: &ListQuery) -> Result<reqwest::Request, GatewayError> {
        Ok(self
            .request(Method::GET, &descriptor.list_path())?
            .query(&query.to_query_pairs())
            .build()?)
    }

    pub fn build_get_request(&self, descriptor: &Descriptor, id: &str) -> Result<reqwest::Request, GatewayError> {
        Ok(self.request(Method::GET, &descriptor.detail_path(id))?.build()?)
    }

    pub fn build_create_request(&self, descriptor: &Descriptor, body: &Value) -> Result<reqwest::Request, GatewayError> {
        Ok(self
            .request(Method::POST, &descriptor.create_path())?
            .json(body)
            .build()?)
    }

    pub fn build_update_request(
        &self,
        descriptor: &Descriptor,
        id: &str,
        body: &Value,
    ) -> Result<reqwest::Request, GatewayError> {
        let method = match descriptor.update_method {
            UpdateMethod::Put => Method::PUT,
            UpdateMethod::Patch => Method::PATCH,
        };
        Ok(self
            .request(method, &descriptor.update_path(id))?
            .json(body)
            .build()?)
    }

    pub fn build_delete_request(&self, descriptor: &Descriptor, id: &str) -> Result<reqwest::Request, GatewayError> {
        Ok(self.request(Method::DELETE, &descriptor.delete_path(id))?.build()?)
    }

    /// Send `request`; an empty success body decodes to `Value::Null`.
    async fn execute(&self, request: reqwest::Request) -> Result<Value, GatewayError> {
        info!(method = %request.method(), url = %request.url(), "api request");
        for (name, value) in request.headers() {
            if name.as_str().eq_ignore_ascii_case("authorization") {
                debug!("  {}: Bearer [REDACTED]", name);
            } else {
                debug!("  {}: {}", name, value.to_str().unwrap_or("[invalid]"));
            }
        }

        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;
        interpret_response(status, &body)
    }
}

/// Map a status and raw body to the JSON value or the matching error.
fn interpret_response(status: StatusCode, body: &str) -> Result<Value, GatewayError> {
    if status == StatusCode::UNAUTHORIZED {
        warn!("api rejected credentials (401)");
        return Err(GatewayError::Unauthorized);
    }
    if !status.is_success() {
        warn!(status = status.as_u16(), %body, "api error");
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message: model::error_message(body),
        });
    }

    debug!(status = status.as_u16(), bytes = body.len(), "api response");
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(format!("invalid JSON: {}", e)))
}

#[async_trait]
impl Gateway for HttpGateway {
    #[instrument(skip_all, fields(resource = %descriptor.kind, page = query.page))]
    async fn list(&self, descriptor: &Descriptor, query: &ListQuery) -> Result<ListPage<Value>, GatewayError> {
        let request = self.build_list_request(descriptor, query)?;
        let body = self.execute(request).await?;
        ListPage::from_body(body, descriptor.collection_key)
    }

    #[instrument(skip_all, fields(resource = %descriptor.kind, id = %id))]
    async fn get(&self, descriptor: &Descriptor, id: &str) -> Result<Value, GatewayError> {
        let request = self.build_get_request(descriptor, id)?;
        self.execute(request).await
    }

    #[instrument(skip_all, fields(resource = %descriptor.kind))]
    async fn create(&self, descriptor: &Descriptor, body: Value) -> Result<Value, GatewayError> {
        let request = self.build_create_request(descriptor, &body)?;
        self.execute(request).await
    }

    #[instrument(skip_all, fields(resource = %descriptor.kind, id = %id))]
    async fn update(&self, descriptor: &Descriptor, id: &str, body: Value) -> Result<Value, GatewayError> {
        let request = self.build_update_request(descriptor, id, &body)?;
        self.execute(request).await
    }

    #[instrument(skip_all, fields(resource = %descriptor.kind, id = %id))]
    async fn delete(&self, descriptor: &Descriptor, id: &str) -> Result<(), GatewayError> {
        let request = self.build_delete_request(descriptor, id)?;
        self.execute(request).await.map(|_| ())
    }
}

//! Downstream RPC channels.
//!
//! One long-lived channel per downstream service, built once at startup and
//! held in a [`ChannelRegistry`] for the life of the process. Calls never
//! reconnect implicitly; teardown is explicit via [`ChannelRegistry::shutdown`].
//!
//! The wire format is JSON over HTTP: `POST {base}/rpc/{call}` with body
//! `{"subject_id": .., "payload": ..}`. The service's status code and JSON
//! body come back as an [`RpcResponse`]; server-side failure statuses are
//! surfaced as [`DownstreamError::Status`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info};

use zyra_core::{ServiceName, SubjectId};

use crate::config::ServiceEndpoints;
use crate::dispatch::DownstreamError;

/// A call to a downstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Downstream call name, e.g. `BlockUser`.
    #[serde(skip)]
    pub call: String,

    /// Admitted caller, if the route required one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,

    pub payload: JsonValue,
}

/// A completed downstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl RpcResponse {
    pub fn ok(body: JsonValue) -> Self {
        Self { status: 200, body }
    }
}

#[async_trait]
pub trait RpcChannel: Send + Sync + core::fmt::Debug {
    async fn call(&self, request: RpcRequest) -> Result<RpcResponse, DownstreamError>;

    /// Release the channel's resources. Calls after close fail.
    async fn close(&self) {}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no channel registered for service '{0}'")]
    NotRegistered(ServiceName),

    #[error("invalid endpoint for service '{service}': {reason}")]
    InvalidEndpoint { service: ServiceName, reason: String },

    #[error("failed to build client: {0}")]
    Client(String),
}

/// JSON-over-HTTP channel to one service.
#[derive(Debug)]
pub struct HttpRpcChannel {
    service: ServiceName,
    base_url: String,
    client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpRpcChannel {
    pub fn connect(service: ServiceName, base_url: &str) -> Result<Self, ChannelError> {
        let base_url = normalize_base_url(service, base_url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ChannelError::Client(e.to_string()))?;

        Ok(Self {
            service,
            base_url,
            client,
            closed: AtomicBool::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn normalize_base_url(service: ServiceName, raw: &str) -> Result<String, ChannelError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ChannelError::InvalidEndpoint {
            service,
            reason: "empty".to_string(),
        });
    }

    // Bare host:port, as the original service URLs are written.
    let url = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    reqwest::Url::parse(&url).map_err(|e| ChannelError::InvalidEndpoint {
        service,
        reason: e.to_string(),
    })?;
    Ok(url)
}

#[async_trait]
impl RpcChannel for HttpRpcChannel {
    async fn call(&self, request: RpcRequest) -> Result<RpcResponse, DownstreamError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DownstreamError::Transport("channel closed".to_string()));
        }

        let url = format!("{}/rpc/{}", self.base_url, request.call);
        debug!(service = %self.service, call = %request.call, "forwarding rpc");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DownstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownstreamError::Transport(e.to_string()))?;

        if status.is_server_error() {
            return Err(DownstreamError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| DownstreamError::InvalidResponse(e.to_string()))?
        };

        Ok(RpcResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Process-wide set of downstream channels.
#[derive(Debug, Default, Clone)]
pub struct ChannelRegistry {
    channels: HashMap<ServiceName, Arc<dyn RpcChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, service: ServiceName, channel: Arc<dyn RpcChannel>) -> Self {
        self.channels.insert(service, channel);
        self
    }

    /// Build one HTTP channel per configured service.
    pub fn connect_http(endpoints: &ServiceEndpoints) -> Result<Self, ChannelError> {
        let mut registry = Self::new();
        for service in ServiceName::ALL {
            let channel = HttpRpcChannel::connect(service, endpoints.get(service))?;
            info!(%service, base_url = %channel.base_url(), "downstream channel ready");
            registry = registry.with_channel(service, Arc::new(channel));
        }
        Ok(registry)
    }

    pub fn get(&self, service: ServiceName) -> Result<Arc<dyn RpcChannel>, ChannelError> {
        self.channels
            .get(&service)
            .cloned()
            .ok_or(ChannelError::NotRegistered(service))
    }

    /// Close every channel. In-flight calls are not awaited.
    pub async fn shutdown(&self) {
        for (service, channel) in &self.channels {
            channel.close().await;
            info!(%service, "downstream channel closed");
        }
    }
}

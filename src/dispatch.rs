//! Batch delivery to the external collector.
//!
//! Each flush hands a [`BatchPayload`] to a [`BatchSink`]. The HTTP sink
//! serializes it on the caller's thread and POSTs it from a background task,
//! so the tick path never waits on the network. Failed deliveries are logged
//! and dropped.

use crate::config::Config;
use crate::core::ChangeEvent;
use crate::stats::SharedStats;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};

/// Collector endpoint configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Full URL batches are POSTed to
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl DispatchConfig {
    /// Create a configuration with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from the recorder configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint.clone()).with_timeout(config.request_timeout)
    }
}

/// Dispatcher error types.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// HTTP client or runtime could not be created
    #[error("dispatcher setup error: {0}")]
    Runtime(String),
    /// Network/transport error
    #[error("collector network error: {0}")]
    Network(String),
    /// Collector answered with a non-success status
    #[error("collector returned status {status}")]
    Server { status: u16 },
    /// JSON serialization error
    #[error("payload serialization error: {0}")]
    Serialization(String),
}

/// Wire payload: `{"session": ..., "info": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPayload {
    /// Session identifier
    pub session: String,
    /// Change events in detection order
    pub info: Vec<ChangeEvent>,
}

impl BatchPayload {
    pub fn new(session: impl Into<String>, info: Vec<ChangeEvent>) -> Self {
        Self {
            session: session.into(),
            info,
        }
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn to_json(&self) -> Result<String, DispatchError> {
        serde_json::to_string(self).map_err(|e| DispatchError::Serialization(e.to_string()))
    }
}

/// Destination for flushed batches.
///
/// `submit` must return without waiting for delivery.
pub trait BatchSink: Send + Sync {
    fn submit(&self, payload: BatchPayload);
}

impl<S: BatchSink + ?Sized> BatchSink for Arc<S> {
    fn submit(&self, payload: BatchPayload) {
        (**self).submit(payload)
    }
}

/// Fire-and-forget HTTP sink.
pub struct HttpDispatcher {
    config: DispatchConfig,
    client: reqwest::Client,
    handle: Handle,
    runtime: Option<Runtime>,
    stats: Option<SharedStats>,
}

impl HttpDispatcher {
    /// Create a dispatcher that spawns deliveries onto an existing runtime.
    pub fn new(config: DispatchConfig, handle: Handle) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::Runtime(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            handle,
            runtime: None,
            stats: None,
        })
    }

    /// Create a dispatcher that owns its runtime, for synchronous hosts.
    pub fn with_runtime(config: DispatchConfig) -> Result<Self, DispatchError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("varbit-dispatch")
            .enable_all()
            .build()
            .map_err(|e| DispatchError::Runtime(format!("Failed to create runtime: {e}")))?;

        let mut dispatcher = Self::new(config, runtime.handle().clone())?;
        dispatcher.runtime = Some(runtime);
        Ok(dispatcher)
    }

    /// Count deliveries and failures in `stats`.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// POST a serialized batch and wait for the status line.
    pub async fn send(
        client: &reqwest::Client,
        endpoint: &str,
        body: String,
    ) -> Result<(), DispatchError> {
        let response = client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| DispatchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Server {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl BatchSink for HttpDispatcher {
    fn submit(&self, payload: BatchPayload) {
        let body = match payload.to_json() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Dropping batch: {}", e);
                return;
            }
        };

        let events = payload.len() as u64;
        let client = self.client.clone();
        let endpoint = self.config.endpoint.clone();
        let stats = self.stats.clone();

        tracing::debug!(session = %payload.session, events, "dispatching batch");

        self.handle.spawn(async move {
            match HttpDispatcher::send(&client, &endpoint, body).await {
                Ok(()) => {
                    if let Some(stats) = stats {
                        stats.record_batch_dispatched(events);
                    }
                }
                Err(e) => {
                    tracing::warn!("Batch of {} events dropped: {}", events, e);
                    if let Some(stats) = stats {
                        stats.record_transport_failure();
                    }
                }
            }
        });
    }
}

impl Drop for HttpDispatcher {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Sink that keeps every submitted payload in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    payloads: Mutex<Vec<BatchPayload>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything submitted so far.
    pub fn take(&self) -> Vec<BatchPayload> {
        std::mem::take(&mut *self.payloads.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BatchSink for MemorySink {
    fn submit(&self, payload: BatchPayload) {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload);
    }
}

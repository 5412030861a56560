//! The page side of the relay.
//!
//! Requests go to the background task over a channel; replies come back on a
//! second channel and are routed to the waiting caller by request id. A
//! caller never waits longer than the relay timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use super::background::RelayHandler;
use super::protocol::{RelayAction, RelayRequest, RelayResponse};
use crate::error::{AstraError, Result};
use crate::types::{AnalysisPayload, AnalysisResult};

pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);
/// Extra time the relay waits beyond the background's own HTTP timeout, so a
/// slow backend comes back as the background's Timeout reply.
pub const TRANSPORT_MARGIN: Duration = Duration::from_secs(5);
const CHANNEL_CAPACITY: usize = 32;

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<RelayResponse>>>>;

#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Upper bound on one request/response exchange.
    pub request_timeout: Duration,
    /// How long to wait for the background task's ready signal.
    pub ready_timeout: Duration,
}

impl RelayOptions {
    /// Options for a relay fronting a transport that already enforces
    /// `request_timeout` itself.
    pub fn over_transport(self) -> Self {
        Self {
            request_timeout: self.request_timeout + TRANSPORT_MARGIN,
            ..self
        }
    }
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_RELAY_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct Relay {
    request_tx: mpsc::Sender<RelayRequest>,
    pending: Pending,
    request_timeout: Duration,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("pending", &self.pending.lock().len())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Relay {
    /// Starts a background task serving requests with `handler` and waits
    /// for it to signal readiness.
    pub async fn spawn(handler: Arc<dyn RelayHandler>, options: RelayOptions) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::channel::<RelayRequest>(CHANNEL_CAPACITY);
        let (response_tx, response_rx) = mpsc::channel::<RelayResponse>(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = ready_tx.send(());
            while let Some(request) = request_rx.recv().await {
                let handler = handler.clone();
                let response_tx = response_tx.clone();
                tokio::spawn(async move {
                    let response = handler.handle(request).await;
                    if response_tx.send(response).await.is_err() {
                        debug!("relay response dropped; caller side closed");
                    }
                });
            }
            debug!("relay background task stopped");
        });

        match timeout(options.ready_timeout, ready_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(AstraError::communication(
                    "background service exited before signalling readiness",
                ))
            }
            Err(_) => {
                return Err(AstraError::communication(format!(
                    "background service not ready after {:?}",
                    options.ready_timeout
                )))
            }
        }

        Ok(Self::connect(request_tx, response_rx, options.request_timeout))
    }

    /// Wires a relay onto existing channels. Responses arriving on
    /// `response_rx` are matched to callers by id.
    pub fn connect(
        request_tx: mpsc::Sender<RelayRequest>,
        mut response_rx: mpsc::Receiver<RelayResponse>,
        request_timeout: Duration,
    ) -> Self {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let router_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                let waiter = router_pending.lock().remove(&response.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => {
                        warn!(id = %response.id, "dropping relay response with no waiting request")
                    }
                }
            }
            // Receiver side is gone; fail every outstanding call now.
            router_pending.lock().clear();
        });

        Self {
            request_tx,
            pending,
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Sends one request and waits for its response.
    pub async fn send(&self, action: RelayAction, data: Value) -> Result<Value> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let request = RelayRequest {
            id: id.clone(),
            action: action.as_str().to_string(),
            data,
        };
        debug!(%action, %id, "relay request");

        let exchange = async {
            self.request_tx
                .send(request)
                .await
                .map_err(|_| AstraError::communication("background service is not running"))?;
            rx.await.map_err(|_| {
                AstraError::communication("background service closed without responding")
            })
        };

        let outcome = timeout(self.request_timeout, exchange).await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                self.pending.lock().remove(&id);
                return Err(err);
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(AstraError::communication(format!(
                    "no response from background service within {:?}",
                    self.request_timeout
                )));
            }
        };

        response.into_result()
    }

    async fn send_typed<T: DeserializeOwned>(&self, action: RelayAction, data: Value) -> Result<T> {
        let value = self.send(action, data).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn health_check(&self) -> Result<Value> {
        self.send(RelayAction::HealthCheck, Value::Null).await
    }

    pub async fn ai_analysis(&self, payload: &AnalysisPayload) -> Result<AnalysisResult> {
        self.send_typed(RelayAction::AiAnalysis, serde_json::to_value(payload)?)
            .await
    }

    pub async fn analyze_design(&self, payload: &AnalysisPayload) -> Result<AnalysisResult> {
        self.send_typed(RelayAction::AnalyzeDesign, serde_json::to_value(payload)?)
            .await
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The Webhook Manager: HMAC-SHA256-signed delivery of [`corsair_events::Event`]s
//! to registered endpoints, with exponential-backoff retry and dead-lettering.
//!
//! Delivery state lives in an in-process, at-least-once queue keyed by
//! delivery id; each row's `attempts`/`next_retry_at`/`status` triple is
//! the unit of locking, matching the single-writer-per-row resource model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::Mutex;
use uuid::Uuid;

use corsair_events::{Event, EventType};

type HmacSha256 = Hmac<Sha256>;

/// Network deadline for a single webhook delivery attempt.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the HMAC-SHA256 signature, unless an endpoint
/// configures a different one.
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Corsair-Signature";

/// How a delivery's retry schedule is computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct RetryPolicy {
    /// Maximum delivery attempts before the row is marked `exhausted`.
    pub max_retries: u32,
    /// Base backoff in milliseconds; attempt `n`'s delay is
    /// `retry_backoff_ms * 2^(n-1)`, jittered.
    pub retry_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Jittered backoff before attempt `attempt` (1-indexed), in
    /// milliseconds: `retry_backoff_ms * 2^(attempt-1)`, scaled by a
    /// uniform random factor in `[0.5, 1.5)`.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.retry_backoff_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(32));
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// A registered delivery target.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebhookEndpoint {
    /// Endpoint id.
    pub id: Uuid,
    /// Delivery URL.
    pub url: String,
    /// Shared secret used to HMAC-sign delivered bodies. Never logged.
    pub secret: String,
    /// Event types this endpoint receives; empty means all event types.
    pub events: Vec<EventType>,
    /// Whether this endpoint currently receives deliveries.
    pub active: bool,
    /// When this endpoint was registered.
    pub created_at: DateTime<Utc>,
    /// Header name the HMAC signature is attached under.
    #[serde(default = "default_signature_header")]
    pub signature_header: String,
    /// Retry schedule for this endpoint's deliveries.
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

fn default_signature_header() -> String {
    DEFAULT_SIGNATURE_HEADER.to_string()
}

impl WebhookEndpoint {
    /// Register a new endpoint with default retry policy and signature
    /// header.
    #[must_use]
    pub fn new(url: impl Into<String>, secret: impl Into<String>, events: Vec<EventType>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            secret: secret.into(),
            events,
            active: true,
            created_at: Utc::now(),
            signature_header: default_signature_header(),
            retry_policy: RetryPolicy::default(),
        }
    }

    fn wants(&self, event_type: EventType) -> bool {
        self.events.is_empty() || self.events.contains(&event_type)
    }
}

/// Lifecycle state of a single delivery attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Waiting for its next attempt.
    Pending,
    /// Delivered with a 2xx response.
    Delivered,
    /// A 4xx (other than 408/429) response was returned; not retried.
    Failed,
    /// `max_retries` attempts were exhausted without success.
    Exhausted,
}

/// One delivery row: an event destined for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeliveryRow {
    /// Delivery id.
    pub id: Uuid,
    /// The endpoint this delivery targets.
    pub endpoint_id: Uuid,
    /// The event being delivered.
    pub event: Event,
    /// Attempts made so far.
    pub attempts: u32,
    /// When this row is next eligible for an attempt.
    pub next_retry_at: DateTime<Utc>,
    /// Current status.
    pub status: DeliveryStatus,
    /// The most recent failure's message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("{:x}", mac.finalize().into_bytes())
}

/// Whether an HTTP status should be retried (transport errors are always
/// retried by the caller; this only classifies a received response).
#[must_use]
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status.as_u16() == 408 || status.as_u16() == 429
}

/// Registers endpoints, fans out events to matching active ones, and
/// drives delivery with retry and dead-lettering.
pub struct WebhookManager {
    client: reqwest::Client,
    endpoints: Mutex<HashMap<Uuid, WebhookEndpoint>>,
    queue: Mutex<Vec<DeliveryRow>>,
    dead_letter: Mutex<Vec<DeliveryRow>>,
}

impl WebhookManager {
    /// Build a manager with a dedicated HTTP client bound to the
    /// delivery deadline.
    ///
    /// # Panics
    ///
    /// Panics if the underlying TLS backend fails to initialize, which
    /// does not happen with the compiled-in `rustls` backend.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .expect("reqwest client with rustls-tls always builds");
        Self {
            client,
            endpoints: Mutex::new(HashMap::new()),
            queue: Mutex::new(Vec::new()),
            dead_letter: Mutex::new(Vec::new()),
        }
    }

    /// Register `endpoint`, returning its id.
    pub async fn register(&self, endpoint: WebhookEndpoint) -> Uuid {
        let id = endpoint.id;
        self.endpoints.lock().await.insert(id, endpoint);
        id
    }

    /// Deactivate an endpoint; already-queued deliveries for it still run.
    pub async fn deactivate(&self, endpoint_id: Uuid) {
        if let Some(endpoint) = self.endpoints.lock().await.get_mut(&endpoint_id) {
            endpoint.active = false;
        }
    }

    /// Fan `event` out to every active endpoint subscribed to its type,
    /// enqueuing one [`DeliveryRow`] per match, immediately eligible.
    pub async fn publish(&self, event: Event) -> Vec<Uuid> {
        let endpoints = self.endpoints.lock().await;
        let now = Utc::now();
        let mut queue = self.queue.lock().await;
        let mut ids = Vec::new();
        for endpoint in endpoints.values().filter(|e| e.active && e.wants(event.event_type)) {
            let row = DeliveryRow {
                id: Uuid::new_v4(),
                endpoint_id: endpoint.id,
                event: event.clone(),
                attempts: 0,
                next_retry_at: now,
                status: DeliveryStatus::Pending,
                last_error: None,
            };
            ids.push(row.id);
            queue.push(row);
        }
        ids
    }

    /// Attempt every queued row whose `next_retry_at` has passed. Rows
    /// that succeed or reach a terminal state are removed from the
    /// queue (terminal rows move to the dead-letter store for
    /// [`Self::redeliver`]).
    pub async fn process_due(&self) -> Vec<DeliveryRow> {
        let now = Utc::now();
        let due: Vec<DeliveryRow> = {
            let mut queue = self.queue.lock().await;
            let (due, pending): (Vec<_>, Vec<_>) = queue.drain(..).partition(|r| r.next_retry_at <= now);
            *queue = pending;
            due
        };

        let mut finished = Vec::with_capacity(due.len());
        for mut row in due {
            let endpoint = self.endpoints.lock().await.get(&row.endpoint_id).cloned();
            let Some(endpoint) = endpoint else {
                row.status = DeliveryStatus::Failed;
                row.last_error = Some("endpoint no longer registered".to_string());
                finished.push(row);
                continue;
            };

            row.attempts += 1;
            match self.deliver_once(&endpoint, &row.event).await {
                Ok(()) => {
                    row.status = DeliveryStatus::Delivered;
                    finished.push(row);
                }
                Err(DeliveryError::Terminal(msg)) => {
                    row.status = DeliveryStatus::Failed;
                    row.last_error = Some(msg);
                    self.dead_letter.lock().await.push(row.clone());
                    finished.push(row);
                }
                Err(DeliveryError::Retryable(msg)) => {
                    row.last_error = Some(msg);
                    if row.attempts >= endpoint.retry_policy.max_retries {
                        row.status = DeliveryStatus::Exhausted;
                        self.dead_letter.lock().await.push(row.clone());
                        finished.push(row);
                    } else {
                        row.next_retry_at = Utc::now()
                            + chrono::Duration::from_std(endpoint.retry_policy.backoff_for_attempt(row.attempts))
                                .unwrap_or_default();
                        self.queue.lock().await.push(row);
                    }
                }
            }
        }
        finished
    }

    async fn deliver_once(&self, endpoint: &WebhookEndpoint, event: &Event) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(event).map_err(|e| DeliveryError::Terminal(e.to_string()))?;
        let signature = sign_body(&endpoint.secret, &body);

        let response = self
            .client
            .post(&endpoint.url)
            .header("Content-Type", "application/json")
            .header(endpoint.signature_header.as_str(), signature)
            .header("X-Corsair-Event", event.event_type.to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Retryable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if is_retryable_status(status) {
            Err(DeliveryError::Retryable(format!("status {status}")))
        } else {
            Err(DeliveryError::Terminal(format!("status {status}")))
        }
    }

    /// Move a dead-lettered delivery back onto the queue for immediate
    /// retry, resetting its attempt count. This is the "external
    /// re-enqueue" the spec allows after exhaustion.
    ///
    /// Returns `true` if `delivery_id` was found in the dead-letter store.
    pub async fn redeliver(&self, delivery_id: Uuid) -> bool {
        let mut dead_letter = self.dead_letter.lock().await;
        let Some(pos) = dead_letter.iter().position(|r| r.id == delivery_id) else {
            return false;
        };
        let mut row = dead_letter.remove(pos);
        row.attempts = 0;
        row.status = DeliveryStatus::Pending;
        row.next_retry_at = Utc::now();
        self.queue.lock().await.push(row);
        true
    }
}

impl Default for WebhookManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum DeliveryError {
    Retryable(String),
    Terminal(String),
}

// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Event Hooks: the lifecycle event contract dispatched to the Webhook
//! Manager, plus the per-`jti` ordering guarantee (`signed` before any
//! `score.changed`/`drift.detected`; `expired`/`revoked` last).

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol version stamped on every emitted event.
pub const API_VERSION: &str = "1";

/// The fixed set of lifecycle event types Corsair emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A CPOE was signed.
    #[serde(rename = "cpoe.signed")]
    CpoeSigned,
    /// A CPOE was verified (any verdict).
    #[serde(rename = "cpoe.verified")]
    CpoeVerified,
    /// A CPOE's `exp` has passed.
    #[serde(rename = "cpoe.expired")]
    CpoeExpired,
    /// A CPOE was explicitly revoked.
    #[serde(rename = "cpoe.revoked")]
    CpoeRevoked,
    /// A CPOE's score changed relative to a prior run.
    #[serde(rename = "score.changed")]
    ScoreChanged,
    /// A CPOE's score regressed relative to a prior run.
    #[serde(rename = "score.degraded")]
    ScoreDegraded,
    /// A drift finding was detected during ingestion.
    #[serde(rename = "drift.detected")]
    DriftDetected,
    /// The issuer's signing key was rotated.
    #[serde(rename = "key.rotated")]
    KeyRotated,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CpoeSigned => "cpoe.signed",
            Self::CpoeVerified => "cpoe.verified",
            Self::CpoeExpired => "cpoe.expired",
            Self::CpoeRevoked => "cpoe.revoked",
            Self::ScoreChanged => "score.changed",
            Self::ScoreDegraded => "score.degraded",
            Self::DriftDetected => "drift.detected",
            Self::KeyRotated => "key.rotated",
        };
        f.write_str(s)
    }
}

/// A single dispatched lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    /// UUIDv4 event identifier.
    pub id: Uuid,
    /// The event's type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// ISO-8601 dispatch timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event-specific payload.
    pub data: serde_json::Value,
    /// Protocol version.
    pub api_version: String,
}

/// Build a new event of `event_type` carrying `data`, stamped with a fresh
/// id and the current time.
#[must_use]
pub fn new_event(event_type: EventType, data: serde_json::Value) -> Event {
    Event {
        id: Uuid::new_v4(),
        event_type,
        timestamp: Utc::now(),
        data,
        api_version: API_VERSION.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Start,
    Mid,
    Terminal,
}

fn stage_of(event_type: EventType) -> Stage {
    match event_type {
        EventType::CpoeSigned => Stage::Start,
        EventType::CpoeExpired | EventType::CpoeRevoked => Stage::Terminal,
        EventType::CpoeVerified
        | EventType::ScoreChanged
        | EventType::ScoreDegraded
        | EventType::DriftDetected
        | EventType::KeyRotated => Stage::Mid,
    }
}

/// An event was submitted to a [`LifecycleTracker`] out of the required
/// per-`jti` lifecycle order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event '{event_type}' for jti '{jti}' violates lifecycle order: {reason}")]
pub struct OrderingViolation {
    /// The `jti` the violating event was emitted for.
    pub jti: String,
    /// The event type that violated ordering.
    pub event_type: EventType,
    /// Human-readable reason.
    pub reason: String,
}

/// Enforces the per-`jti` lifecycle ordering guarantee across a sequence
/// of emitted events: `cpoe.signed` must come first; `cpoe.expired`/
/// `cpoe.revoked` are terminal and admit no further events for that
/// `jti`. Carries no other state — independent `jti`s never interact.
#[derive(Debug, Clone, Default)]
pub struct LifecycleTracker {
    last_stage: HashMap<String, Stage>,
}

impl LifecycleTracker {
    /// Build an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `event_type` is about to be emitted for `jti`, checking
    /// it against every event already recorded for that `jti`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingViolation`] if `event_type` is not `cpoe.signed`
    /// but no prior event is recorded for `jti`, if `jti` already reached
    /// a terminal event, or if `event_type`'s stage regresses the
    /// lifecycle order already observed.
    pub fn record(&mut self, jti: &str, event_type: EventType) -> Result<(), OrderingViolation> {
        let stage = stage_of(event_type);
        match self.last_stage.get(jti).copied() {
            None if stage != Stage::Start => {
                return Err(OrderingViolation {
                    jti: jti.to_string(),
                    event_type,
                    reason: "no cpoe.signed event recorded yet for this jti".to_string(),
                });
            }
            Some(Stage::Terminal) => {
                return Err(OrderingViolation {
                    jti: jti.to_string(),
                    event_type,
                    reason: "jti already reached a terminal lifecycle event".to_string(),
                });
            }
            Some(prev) if stage < prev => {
                return Err(OrderingViolation {
                    jti: jti.to_string(),
                    event_type,
                    reason: "event stage regresses the lifecycle order already observed".to_string(),
                });
            }
            _ => {}
        }
        self.last_stage.insert(jti.to_string(), stage);
        Ok(())
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output rendering for the Corsair CLI.
//!
//! Mirrors the shape of a multi-format text renderer: one [`OutputFormat`]
//! selects between machine-readable JSON and a handful of human-facing
//! text styles, and a [`Formatter`] dispatches each domain type to the
//! matching renderer.

use std::fmt;
use std::str::FromStr;

use corsair_diff::CpoeDiff;
use corsair_transparency::{LogEntry, TrustTxt};
use corsair_verify::{IssuerTier, Verdict, VerificationOutcome};

/// How a command renders its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single-line, compact JSON.
    Json,
    /// Indented, human-readable JSON.
    JsonPretty,
    /// Multi-line plain text, one field per line.
    Text,
    /// Single-line summary suitable for log aggregation.
    Compact,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Text => "text",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Renders Corsair domain types in the format selected by `--format`/`--json`.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Build a formatter for `format`.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a verification outcome.
    #[must_use]
    pub fn format_verification(&self, outcome: &VerificationOutcome) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(&verification_json(outcome)).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&verification_json(outcome)).unwrap_or_default(),
            OutputFormat::Text => format_verification_text(outcome),
            OutputFormat::Compact => format_verification_compact(outcome),
        }
    }

    /// Render a CPOE diff.
    #[must_use]
    pub fn format_diff(&self, diff: &CpoeDiff) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(diff).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(diff).unwrap_or_default(),
            OutputFormat::Text => format_diff_text(diff),
            OutputFormat::Compact => format_diff_compact(diff),
        }
    }

    /// Render a transparency log entry.
    #[must_use]
    pub fn format_log_entry(&self, entry: &LogEntry) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                serde_json::json!({ "id": entry.id }).to_string()
            }
            OutputFormat::Text => format!("registered: {}", entry.id),
            OutputFormat::Compact => entry.id.clone(),
        }
    }

    /// Render a `trust.txt` document.
    #[must_use]
    pub fn format_trust_txt(&self, trust: &TrustTxt) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => serde_json::json!({
                "cpoe": trust.cpoe,
                "scitt": trust.scitt,
                "policy": trust.policy,
                "frameworks": trust.frameworks,
            })
            .to_string(),
            OutputFormat::Text | OutputFormat::Compact => corsair_transparency::render_trust_txt(trust),
        }
    }

    /// Render a fatal error message.
    #[must_use]
    pub fn format_error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                serde_json::json!({ "error": message }).to_string()
            }
            OutputFormat::Text | OutputFormat::Compact => format!("error: {message}"),
        }
    }
}

fn verdict_str(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Accepted => "accepted",
        Verdict::BadSignature => "bad-signature",
        Verdict::Expired => "expired",
        Verdict::Rejected { .. } => "rejected",
    }
}

fn issuer_tier_str(tier: IssuerTier) -> &'static str {
    match tier {
        IssuerTier::CoreVerified => "core-verified",
        IssuerTier::SelfSigned => "self-signed",
        IssuerTier::Unverifiable => "unverifiable",
    }
}

fn verification_json(outcome: &VerificationOutcome) -> serde_json::Value {
    let mut value = serde_json::json!({
        "verdict": verdict_str(&outcome.verdict),
        "issuerTier": issuer_tier_str(outcome.issuer_tier),
        "issuer": outcome.payload.iss,
        "subject": outcome.payload.sub,
        "jti": outcome.payload.jti,
    });
    if let Verdict::Rejected { policy, reason } = &outcome.verdict {
        value["policy"] = serde_json::Value::String(policy.clone());
        if let Some(reason) = reason {
            value["reason"] = serde_json::Value::String(reason.clone());
        }
    }
    value
}

fn format_verification_text(outcome: &VerificationOutcome) -> String {
    let mut lines = vec![
        format!("verdict:     {}", verdict_str(&outcome.verdict)),
        format!("issuer:      {}", outcome.payload.iss),
        format!("issuer tier: {}", issuer_tier_str(outcome.issuer_tier)),
        format!("subject:     {}", outcome.payload.sub),
        format!("jti:         {}", outcome.payload.jti),
    ];
    if let Verdict::Rejected { policy, reason } = &outcome.verdict {
        lines.push(format!("policy:      {policy}"));
        if let Some(reason) = reason {
            lines.push(format!("reason:      {reason}"));
        }
    }
    lines.join("\n")
}

fn format_verification_compact(outcome: &VerificationOutcome) -> String {
    match &outcome.verdict {
        Verdict::Rejected { policy, .. } => {
            format!("{} {} policy={policy}", verdict_str(&outcome.verdict), outcome.payload.iss)
        }
        _ => format!("{} {}", verdict_str(&outcome.verdict), outcome.payload.iss),
    }
}

fn format_diff_text(diff: &CpoeDiff) -> String {
    let mut lines = vec![
        format!("score:      {} -> {} ({:+})", diff.previous_score, diff.current_score, diff.score_delta),
        format!("regression: {}", diff.has_regression),
    ];
    if let Some((from, to)) = &diff.changed_scope {
        lines.push(format!("scope:      {from} -> {to}"));
    }
    if !diff.new_failures.is_empty() {
        lines.push("new failures:".to_string());
        for c in &diff.new_failures {
            lines.push(format!("  - {}/{}", c.framework, c.control_id));
        }
    }
    if !diff.resolved_failures.is_empty() {
        lines.push("resolved failures:".to_string());
        for c in &diff.resolved_failures {
            lines.push(format!("  - {}/{}", c.framework, c.control_id));
        }
    }
    lines.join("\n")
}

fn format_diff_compact(diff: &CpoeDiff) -> String {
    format!(
        "score_delta={} regression={} new_failures={} resolved_failures={}",
        diff.score_delta,
        diff.has_regression,
        diff.new_failures.len(),
        diff.resolved_failures.len()
    )
}

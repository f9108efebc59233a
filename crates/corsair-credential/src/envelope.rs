// SPDX-License-Identifier: MIT OR Apache-2.0
//! The "v1" JSON envelope: the same signed bytes as the JWT-VC compact
//! serialization, wrapped as a JSON object for legacy verifiers that
//! don't parse dot-joined compact tokens.
//!
//! CORSAIR only ever *issues* the JWT-VC form (see the decision recorded
//! alongside this module in the project's design notes), but the
//! verifier must still accept a presented envelope: the three fields
//! below are exactly the JWT's three segments, base64url-encoded the
//! same way, just carried as named JSON properties instead of
//! dot-concatenated.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use corsair_error::{CorsairError, ErrorCode};

/// A CPOE in its legacy, non-compact wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JsonEnvelope {
    /// `base64url(header)`, identical to the JWT's first segment.
    pub header: String,
    /// `base64url(payload)`, identical to the JWT's second segment.
    pub payload: String,
    /// `base64url(signature)`, identical to the JWT's third segment.
    pub signature: String,
}

/// Parse a JSON envelope document and rewrite it as a JWT-VC compact
/// string, so callers can hand the result to the same decode/verify
/// pipeline that handles the compact form directly.
///
/// # Errors
///
/// Returns [`CorsairError`] if `envelope_json` is not a valid
/// [`JsonEnvelope`] document.
pub fn envelope_to_compact(envelope_json: &str) -> Result<String, CorsairError> {
    let envelope: JsonEnvelope = serde_json::from_str(envelope_json)
        .map_err(|e| CorsairError::new(ErrorCode::InputMalformedJwt, format!("malformed JSON envelope: {e}")))?;
    Ok(format!("{}.{}.{}", envelope.header, envelope.payload, envelope.signature))
}

/// Encode a JWT-VC compact string as the equivalent JSON envelope, for
/// callers that need to emit the legacy wire shape.
///
/// # Errors
///
/// Returns [`CorsairError`] if `compact` is not exactly three
/// dot-separated segments.
pub fn compact_to_envelope(compact: &str) -> Result<JsonEnvelope, CorsairError> {
    let mut parts = compact.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CorsairError::new(
            ErrorCode::InputMalformedJwt,
            "expected exactly three dot-separated segments",
        ));
    };
    Ok(JsonEnvelope {
        header: header.to_string(),
        payload: payload.to_string(),
        signature: signature.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_compact() {
        let compact = "aGVhZGVy.cGF5bG9hZA.c2ln";
        let envelope = compact_to_envelope(compact).unwrap();
        assert_eq!(envelope.header, "aGVhZGVy");
        assert_eq!(envelope_to_compact(&serde_json::to_string(&envelope).unwrap()).unwrap(), compact);
    }

    #[test]
    fn malformed_envelope_json_rejected() {
        assert!(envelope_to_compact("not json").is_err());
        assert!(envelope_to_compact(r#"{"header":"h","payload":"p"}"#).is_err());
    }

    #[test]
    fn compact_with_wrong_segment_count_rejected() {
        assert!(compact_to_envelope("a.b").is_err());
        assert!(compact_to_envelope("a.b.c.d").is_err());
    }
}

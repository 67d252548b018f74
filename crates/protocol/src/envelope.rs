//! Envelope-Rahmen `{"t": <tag>, "d": <payload>}`
//!
//! Ein eingehender Frame wird zuerst nur in Tag und rohen Payload zerlegt.
//! Die typisierte Dekodierung passiert danach in [`crate::inbound`], damit
//! ein fehlerhafter Payload genau diesen einen Frame betrifft.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Protokoll-Version im `ready`-Snapshot
pub const PROTO: i64 = 1;

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// RohEnvelope
// ---------------------------------------------------------------------------

/// Envelope vor der Payload-Validierung
#[derive(Debug, Clone, Deserialize)]
pub struct RohEnvelope {
    /// Nachrichten-Tag
    pub t: String,
    /// Tag-spezifischer Payload (fehlt bei payload-losen Nachrichten)
    #[serde(default)]
    pub d: Option<Value>,
}

impl RohEnvelope {
    /// Zerlegt einen Text-Frame in Tag und rohen Payload
    pub fn aus_text(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text).map_err(ProtocolError::UngueltigesJson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_mit_payload() {
        let env = RohEnvelope::aus_text(r#"{"t":"setAway","d":{"away":true}}"#).unwrap();
        assert_eq!(env.t, "setAway");
        assert!(env.d.is_some());
    }

    #[test]
    fn envelope_ohne_payload() {
        let env = RohEnvelope::aus_text(r#"{"t":"voiceStop"}"#).unwrap();
        assert_eq!(env.t, "voiceStop");
        assert!(env.d.is_none());
    }

    #[test]
    fn kaputtes_json_wird_abgelehnt() {
        assert!(matches!(
            RohEnvelope::aus_text("{\"t\":"),
            Err(ProtocolError::UngueltigesJson(_))
        ));
        assert!(RohEnvelope::aus_text(r#"{"d":{}}"#).is_err());
    }
}

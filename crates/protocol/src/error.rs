//! Fehlertypen des Envelope-Codecs

use thiserror::Error;

/// Result-Alias fuer Codec-Operationen
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Fehler beim Dekodieren oder Kodieren eines Envelopes
///
/// Jeder dieser Fehler betrifft genau einen Frame. Die Verbindung bleibt
/// offen, der Frame wird verworfen.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Frame ist kein gueltiges JSON-Envelope: {0}")]
    UngueltigesJson(#[source] serde_json::Error),

    #[error("Unbekannter Tag: {0}")]
    UnbekannterTag(String),

    #[error("Payload fehlt fuer Tag '{0}'")]
    PayloadFehlt(&'static str),

    #[error("Ungueltiger Payload fuer Tag '{tag}': {quelle}")]
    UngueltigerPayload {
        tag: &'static str,
        #[source]
        quelle: serde_json::Error,
    },

    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[source] serde_json::Error),
}

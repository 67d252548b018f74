//! Eingehende Nachrichten (Client -> Server)
//!
//! [`Inbound::dekodieren`] ist die Dispatch-Tabelle: jeder bekannte Tag wird
//! explizit auf seinen Payload-Typ abgebildet und dabei validiert.

use murmur_core::{ChannelId, ConnectionId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::envelope::RohEnvelope;
use crate::error::{ProtocolError, ProtocolResult};

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

pub const TAG_START: &str = "start";
pub const TAG_TYPING: &str = "typing";
pub const TAG_FILE_CHUNK_OWNED: &str = "fileChunkOwned";
pub const TAG_FILE_CHUNK_LOST: &str = "fileChunkLost";
pub const TAG_FILE_CHUNK_GET: &str = "fileChunkGet";
pub const TAG_FILE_CHUNK_RTC: &str = "fileChunkRtc";
pub const TAG_VOICE_START: &str = "voiceStart";
pub const TAG_VOICE_STOP: &str = "voiceStop";
pub const TAG_VOICE_RTC: &str = "voiceRtc";
pub const TAG_SET_AWAY: &str = "setAway";

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Handshake einer frischen Verbindung
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    /// Session-Token (fehlend = leer, fuehrt zu `reset`)
    #[serde(default)]
    pub token: String,
    /// Bereits gehaltene Chunk-Hashes
    #[serde(default)]
    pub file_chunks: Vec<String>,
    /// Voice-Kanal fuer automatischen Beitritt (`""` = keiner)
    #[serde(default, deserialize_with = "leere_id_als_none")]
    pub voice_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub away: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub channel_id: ChannelId,
}

/// Payload fuer `fileChunkOwned`, `fileChunkLost` und `fileChunkGet`
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkPayload {
    pub hash: String,
}

/// WebRTC-Signal fuer einen Chunk-Transfer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRtcPayload {
    pub hash: String,
    /// Ziel-Verbindung
    pub socket_id: ConnectionId,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub payload_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStartPayload {
    pub channel_id: ChannelId,
}

/// WebRTC-Signal fuer Voice
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRtcPayload {
    /// Ziel-Benutzer
    pub user_id: UserId,
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAwayPayload {
    pub away: bool,
}

fn leere_id_als_none<'de, D>(deserializer: D) -> Result<Option<ChannelId>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    match text.as_deref() {
        None | Some("") => Ok(None),
        Some(t) => ChannelId::dekodieren(t)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Alle eingehenden Nachrichtenarten
#[derive(Debug, Clone)]
pub enum Inbound {
    Start(StartPayload),
    Typing(TypingPayload),
    FileChunkOwned(ChunkPayload),
    FileChunkLost(ChunkPayload),
    FileChunkGet(ChunkPayload),
    FileChunkRtc(ChunkRtcPayload),
    VoiceStart(VoiceStartPayload),
    VoiceStop,
    VoiceRtc(VoiceRtcPayload),
    SetAway(SetAwayPayload),
}

impl Inbound {
    /// Dekodiert einen kompletten Text-Frame
    pub fn aus_text(text: &str) -> ProtocolResult<Self> {
        Self::dekodieren(RohEnvelope::aus_text(text)?)
    }

    /// Bildet Tag und rohen Payload auf die typisierte Nachricht ab
    pub fn dekodieren(roh: RohEnvelope) -> ProtocolResult<Self> {
        let RohEnvelope { t, d } = roh;
        let nachricht = match t.as_str() {
            TAG_START => Self::Start(payload(TAG_START, d)?),
            TAG_TYPING => Self::Typing(payload(TAG_TYPING, d)?),
            TAG_FILE_CHUNK_OWNED => Self::FileChunkOwned(payload(TAG_FILE_CHUNK_OWNED, d)?),
            TAG_FILE_CHUNK_LOST => Self::FileChunkLost(payload(TAG_FILE_CHUNK_LOST, d)?),
            TAG_FILE_CHUNK_GET => Self::FileChunkGet(payload(TAG_FILE_CHUNK_GET, d)?),
            TAG_FILE_CHUNK_RTC => Self::FileChunkRtc(payload(TAG_FILE_CHUNK_RTC, d)?),
            TAG_VOICE_START => Self::VoiceStart(payload(TAG_VOICE_START, d)?),
            TAG_VOICE_STOP => Self::VoiceStop,
            TAG_VOICE_RTC => Self::VoiceRtc(payload(TAG_VOICE_RTC, d)?),
            TAG_SET_AWAY => Self::SetAway(payload(TAG_SET_AWAY, d)?),
            _ => return Err(ProtocolError::UnbekannterTag(t)),
        };
        Ok(nachricht)
    }

    /// Wire-Tag dieser Nachricht
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Start(_) => TAG_START,
            Self::Typing(_) => TAG_TYPING,
            Self::FileChunkOwned(_) => TAG_FILE_CHUNK_OWNED,
            Self::FileChunkLost(_) => TAG_FILE_CHUNK_LOST,
            Self::FileChunkGet(_) => TAG_FILE_CHUNK_GET,
            Self::FileChunkRtc(_) => TAG_FILE_CHUNK_RTC,
            Self::VoiceStart(_) => TAG_VOICE_START,
            Self::VoiceStop => TAG_VOICE_STOP,
            Self::VoiceRtc(_) => TAG_VOICE_RTC,
            Self::SetAway(_) => TAG_SET_AWAY,
        }
    }
}

fn payload<T: DeserializeOwned>(tag: &'static str, d: Option<Value>) -> ProtocolResult<T> {
    let wert = d.ok_or(ProtocolError::PayloadFehlt(tag))?;
    serde_json::from_value(wert).map_err(|quelle| ProtocolError::UngueltigerPayload { tag, quelle })
}

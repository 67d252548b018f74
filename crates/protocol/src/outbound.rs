//! Ausgehende Nachrichten (Server -> Client)
//!
//! Jede Variante serialisiert als `{"t": <tag>, "d": <payload>}`.
//! Payload-lose Varianten (`reset`, `voiceReset`) lassen `d` weg.

use murmur_core::{ChannelId, ConnectionId, MessageId, SessionId, Status, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};
use crate::ready::{KanalEintrag, ReadyPayload};

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Alle ausgehenden Nachrichtenarten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "d", rename_all = "camelCase")]
pub enum Outbound {
    Ready(ReadyPayload),
    /// Erzwingt einen neuen Handshake; die Verbindung wird danach geschlossen
    Reset,

    // Eigenes Profil
    SetUsername(SetUsername),
    SetName(SetName),
    SetAvatarId(SetAvatarId),
    SetTotpEnabled(SetTotpEnabled),
    SetColorTheme(SetColorTheme),
    SetTypingEvents(SetTypingEvents),
    SetWantStatus(SetWantStatus),

    // Sessions
    SessionCreate(SessionCreate),
    SessionDelete(IdPayload<SessionId>),
    SessionStart(SessionStart),

    // Freunde
    FriendCreate(FriendCreate),
    FriendDelete(IdPayload<UserId>),
    FriendAccept(FriendAccept),

    // Kanaele
    ChannelCreate(KanalEintrag),
    ChannelDelete(IdPayload<ChannelId>),
    ChannelSetName(ChannelSetName),
    ChannelSetAvatarId(ChannelSetAvatarId),
    ChannelSetOwner(ChannelSetOwner),
    ChannelUserCreate(ChannelUserCreate),
    ChannelUserSetHidden(ChannelUserSetHidden),
    ChannelUserSetInVoice(ChannelUserSetInVoice),
    ChannelUserTyping(ChannelUserTyping),

    // Nachrichten
    MessageCreate(MessageCreate),
    MessageDelete(MessageDelete),

    // Fremde Benutzer
    ForeignUserSetUsername(ForeignUserSetUsername),
    ForeignUserSetName(ForeignUserSetName),
    ForeignUserSetAvatarId(ForeignUserSetAvatarId),
    ForeignUserSetStatus(ForeignUserSetStatus),

    // Swarm
    FileChunkRequest(FileChunkRequest),
    FileChunkRtc(FileChunkRtc),

    // Voice
    VoiceReset,
    VoiceRtc(VoiceRtc),
}

impl Outbound {
    /// Serialisiert die Nachricht fuer den Draht
    pub fn kodieren(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(ProtocolError::Serialisierung)
    }

    /// `reset` schliesst die Verbindung nach dem Senden
    pub fn ist_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload das nur eine ID enthaelt (`sessionDelete`, `friendDelete`, `channelDelete`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdPayload<T> {
    pub id: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetUsername {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAvatarId {
    pub avatar_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTotpEnabled {
    pub totp_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetColorTheme {
    pub color_theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTypingEvents {
    pub typing_events: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWantStatus {
    pub want_status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreate {
    pub id: SessionId,
    pub agent: String,
    pub ip: String,
    pub created: i64,
}

/// Eine bestehende Session wurde auf einem Geraet erneut gestartet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    pub id: SessionId,
    pub agent: String,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendCreate {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_id: String,
    pub accepted: bool,
    pub can_accept: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendAccept {
    pub id: UserId,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSetName {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSetAvatarId {
    pub id: ChannelId,
    pub avatar_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSetOwner {
    pub id: ChannelId,
    pub owner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUserCreate {
    pub id: UserId,
    pub channel_id: ChannelId,
    pub username: String,
    pub name: String,
    pub avatar_id: String,
    pub public_key: String,
    pub in_voice: bool,
    pub hidden: bool,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUserSetHidden {
    pub id: UserId,
    pub channel_id: ChannelId,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUserSetInVoice {
    pub id: UserId,
    pub channel_id: ChannelId,
    pub in_voice: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUserTyping {
    pub id: UserId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCreate {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub body: String,
    pub key: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelete {
    pub id: MessageId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignUserSetUsername {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignUserSetName {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignUserSetAvatarId {
    pub id: UserId,
    pub avatar_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignUserSetStatus {
    pub id: UserId,
    pub status: Status,
}

/// Aufforderung an einen Halter, dem Anfragenden einen Chunk zu liefern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunkRequest {
    pub hash: String,
    /// Verbindung des Anfragenden
    pub socket_id: ConnectionId,
}

/// Weitergeleitetes Chunk-Signal, `socket_id` ist der Absender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunkRtc {
    pub hash: String,
    pub socket_id: ConnectionId,
    pub payload: String,
    pub payload_type: String,
}

/// Weitergeleitetes Voice-Signal, `user_id` ist der Absender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRtc {
    pub user_id: UserId,
    pub payload: String,
}

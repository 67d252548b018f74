//! Initialer Sync-Snapshot (`ready`) und die davon geteilten Eintraege
//!
//! Binaere Werte (Avatar-IDs, Public Keys, Nachrichteninhalte) sind bereits
//! base64url-kodiert. Ein fehlender Wert ist der leere String.

use murmur_core::{ChannelId, KanalTyp, SessionId, Status, UserId};
use serde::{Deserialize, Serialize};

/// Payload von `ready`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub proto: i64,
    pub user: ReadyUser,
    pub friends: Vec<ReadyFriend>,
    pub channels: Vec<KanalEintrag>,
    pub sessions: Vec<ReadySession>,
}

/// Eigene Identitaet des Betrachters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyUser {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_id: String,
    pub totp_enabled: bool,
    pub created: i64,
    pub auth_key_updated: i64,
    pub color_theme: String,
    pub typing_events: bool,
    pub want_status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyFriend {
    /// ID des Gegenuebers (nicht des Betrachters)
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_id: String,
    pub accepted: bool,
    /// Nur der Empfaenger einer offenen Anfrage darf annehmen
    pub can_accept: bool,
    pub status: Status,
}

/// Kanal aus Sicht des Betrachters, auch Payload von `channelCreate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanalEintrag {
    pub id: ChannelId,
    pub name: String,
    pub avatar_id: String,
    #[serde(rename = "type")]
    pub typ: KanalTyp,
    pub created: i64,
    /// Betrachter ist Besitzer des Kanals
    pub owner: bool,
    /// Alle anderen Mitglieder (ohne den Betrachter)
    pub users: Vec<KanalMitglied>,
    pub last_message: LetzteNachricht,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanalMitglied {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub avatar_id: String,
    pub public_key: String,
    pub in_voice: bool,
    pub hidden: bool,
    pub status: Status,
}

/// Vorschau der letzten Nachricht; alle Felder leer wenn keine existiert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetzteNachricht {
    pub id: String,
    pub user_id: String,
    pub body: String,
    /// Schluessel-Eintrag des Betrachters
    pub key: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadySession {
    pub id: SessionId,
    pub agent: String,
    pub ip: String,
    pub created: i64,
    pub last_start: i64,
    /// Session dieser Verbindung
    #[serde(rename = "self")]
    pub ist_selbst: bool,
}

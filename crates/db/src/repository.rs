//! Repository-Trait-Definitionen
//!
//! Der Echtzeit-Kern liest Identitaeten, Sessions, Freundschaften, Kanaele
//! und Nachrichten nur ueber diese Schnittstellen. Die Persistenz selbst
//! liegt ausserhalb des Kerns.

use async_trait::async_trait;
use murmur_core::{ChannelId, UserId};

use crate::error::DbResult;
use crate::models::{
    BenutzerRecord, FreundRecord, KanalRecord, NachrichtRecord, SessionAktivierung, SessionRecord,
};

/// Repository fuer Sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loest einen Token auf und frischt dabei agent, ip und last_start auf
    async fn session_starten(
        &self,
        token: &str,
        agent: &str,
        ip: &str,
    ) -> DbResult<Option<SessionAktivierung>>;

    /// Alle aktiven Sessions eines Benutzers
    async fn sessions_fuer_user(&self, user: UserId) -> DbResult<Vec<SessionRecord>>;
}

/// Repository fuer Benutzer-Identitaeten
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn benutzer_laden(&self, id: UserId) -> DbResult<Option<BenutzerRecord>>;
}

/// Repository fuer Freundschaftsbeziehungen
#[async_trait]
pub trait FriendRepository: Send + Sync {
    /// Alle Beziehungen in beiden Richtungen, angenommen oder offen
    async fn freunde_fuer_user(&self, user: UserId) -> DbResult<Vec<FreundRecord>>;

    /// Beziehung zwischen zwei Benutzern, unabhaengig von der Richtung
    async fn freundschaft(&self, a: UserId, b: UserId) -> DbResult<Option<FreundRecord>>;
}

/// Repository fuer Kanaele und Mitgliedschaften
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn kanal_laden(&self, id: ChannelId) -> DbResult<Option<KanalRecord>>;

    /// Kanaele in denen der Benutzer nicht verstecktes Mitglied ist
    async fn kanaele_fuer_user(&self, user: UserId) -> DbResult<Vec<KanalRecord>>;
}

/// Repository fuer Nachrichten
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Neueste Nachricht des Kanals mit `created >= seit`
    async fn letzte_nachricht(
        &self,
        channel: ChannelId,
        seit: i64,
    ) -> DbResult<Option<NachrichtRecord>>;
}

/// Alle Collaborators die der Echtzeit-Kern benoetigt
pub trait Store:
    SessionRepository + UserRepository + FriendRepository + ChannelRepository + MessageRepository + 'static
{
}

impl<T> Store for T where
    T: SessionRepository
        + UserRepository
        + FriendRepository
        + ChannelRepository
        + MessageRepository
        + 'static
{
}

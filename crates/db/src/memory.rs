//! In-Memory-Implementierung aller Repositories
//!
//! Wird vom Entwicklungsserver und von den Tests genutzt. Optional laesst
//! sich der Store aus einer JSON-Seed-Datei befuellen.

use std::path::Path;

use async_trait::async_trait;
use murmur_core::{jetzt_millis, ChannelId, UserId};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{DbError, DbResult};
use crate::models::{
    BenutzerRecord, FreundRecord, KanalRecord, NachrichtRecord, SessionAktivierung, SessionRecord,
};
use crate::repository::{
    ChannelRepository, FriendRepository, MessageRepository, SessionRepository, UserRepository,
};

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// Inhalt einer Seed-Datei
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub users: Vec<BenutzerRecord>,
    pub sessions: Vec<SessionRecord>,
    pub friends: Vec<FreundRecord>,
    pub channels: Vec<KanalRecord>,
    pub messages: Vec<NachrichtRecord>,
}

#[derive(Debug, Default)]
struct Daten {
    benutzer: Vec<BenutzerRecord>,
    sessions: Vec<SessionRecord>,
    freunde: Vec<FreundRecord>,
    kanaele: Vec<KanalRecord>,
    nachrichten: Vec<NachrichtRecord>,
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Thread-sicherer In-Memory-Store
#[derive(Debug, Default)]
pub struct MemoryStore {
    daten: RwLock<Daten>,
}

impl MemoryStore {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt einen Store aus einem bereits geparsten Seed
    pub fn aus_seed(seed: Seed) -> DbResult<Self> {
        for session in &seed.sessions {
            if session.token.is_empty() {
                return Err(DbError::UngueltigeDaten(format!(
                    "Session {} hat keinen Token",
                    session.id
                )));
            }
        }
        Ok(Self {
            daten: RwLock::new(Daten {
                benutzer: seed.users,
                sessions: seed.sessions,
                freunde: seed.friends,
                kanaele: seed.channels,
                nachrichten: seed.messages,
            }),
        })
    }

    /// Laedt einen Seed aus einer JSON-Datei
    pub fn aus_datei(pfad: impl AsRef<Path>) -> DbResult<Self> {
        let pfad = pfad.as_ref();
        let text = std::fs::read_to_string(pfad)?;
        let seed: Seed = serde_json::from_str(&text)?;
        tracing::info!(
            pfad = %pfad.display(),
            benutzer = seed.users.len(),
            kanaele = seed.channels.len(),
            "Seed-Datei geladen"
        );
        Self::aus_seed(seed)
    }

    pub fn benutzer_einfuegen(&self, benutzer: BenutzerRecord) {
        self.daten.write().benutzer.push(benutzer);
    }

    pub fn session_einfuegen(&self, session: SessionRecord) {
        self.daten.write().sessions.push(session);
    }

    /// Fuegt eine Beziehung ein oder ersetzt die bestehende zwischen denselben Benutzern
    pub fn freundschaft_einfuegen(&self, freund: FreundRecord) {
        let mut daten = self.daten.write();
        daten
            .freunde
            .retain(|f| !f.betrifft(freund.user1_id, freund.user2_id));
        daten.freunde.push(freund);
    }

    pub fn kanal_einfuegen(&self, kanal: KanalRecord) {
        self.daten.write().kanaele.push(kanal);
    }

    pub fn nachricht_einfuegen(&self, nachricht: NachrichtRecord) {
        self.daten.write().nachrichten.push(nachricht);
    }

    /// Setzt das Hidden-Flag einer Mitgliedschaft, `false` wenn nicht gefunden
    pub fn mitglied_verstecken(&self, kanal: ChannelId, user: UserId, hidden: bool) -> bool {
        let mut daten = self.daten.write();
        let mitglied = daten
            .kanaele
            .iter_mut()
            .find(|k| k.id == kanal)
            .and_then(|k| k.users.iter_mut().find(|m| m.id == user));
        match mitglied {
            Some(m) => {
                m.hidden = hidden;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn session_starten(
        &self,
        token: &str,
        agent: &str,
        ip: &str,
    ) -> DbResult<Option<SessionAktivierung>> {
        if token.is_empty() {
            return Ok(None);
        }
        let mut daten = self.daten.write();
        let Some(session) = daten.sessions.iter_mut().find(|s| s.token == token) else {
            return Ok(None);
        };
        let erstmals = session.last_start == session.created;
        session.agent = agent.to_string();
        session.ip = ip.to_string();
        // Zwei Starts in derselben Millisekunde duerfen nicht als Erststart gelten
        session.last_start = jetzt_millis().max(session.created + 1);
        Ok(Some(SessionAktivierung {
            session: session.clone(),
            erstmals,
        }))
    }

    async fn sessions_fuer_user(&self, user: UserId) -> DbResult<Vec<SessionRecord>> {
        Ok(self
            .daten
            .read()
            .sessions
            .iter()
            .filter(|s| s.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn benutzer_laden(&self, id: UserId) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.daten.read().benutzer.iter().find(|b| b.id == id).cloned())
    }
}

#[async_trait]
impl FriendRepository for MemoryStore {
    async fn freunde_fuer_user(&self, user: UserId) -> DbResult<Vec<FreundRecord>> {
        Ok(self
            .daten
            .read()
            .freunde
            .iter()
            .filter(|f| f.user1_id == user || f.user2_id == user)
            .cloned()
            .collect())
    }

    async fn freundschaft(&self, a: UserId, b: UserId) -> DbResult<Option<FreundRecord>> {
        Ok(self.daten.read().freunde.iter().find(|f| f.betrifft(a, b)).cloned())
    }
}

#[async_trait]
impl ChannelRepository for MemoryStore {
    async fn kanal_laden(&self, id: ChannelId) -> DbResult<Option<KanalRecord>> {
        Ok(self.daten.read().kanaele.iter().find(|k| k.id == id).cloned())
    }

    async fn kanaele_fuer_user(&self, user: UserId) -> DbResult<Vec<KanalRecord>> {
        Ok(self
            .daten
            .read()
            .kanaele
            .iter()
            .filter(|k| k.ist_sichtbares_mitglied(user))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn letzte_nachricht(
        &self,
        channel: ChannelId,
        seit: i64,
    ) -> DbResult<Option<NachrichtRecord>> {
        Ok(self
            .daten
            .read()
            .nachrichten
            .iter()
            .filter(|n| n.channel_id == channel && n.created >= seit)
            .max_by_key(|n| n.created)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::{KanalTyp, MessageId, SessionId};

    use crate::models::KanalMitgliedRecord;

    fn session(user: UserId, token: &str, created: i64, last_start: i64) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(),
            user_id: user,
            token: token.into(),
            agent: String::new(),
            ip: String::new(),
            created,
            last_start,
        }
    }

    #[tokio::test]
    async fn erster_start_und_folgestart() {
        let store = MemoryStore::neu();
        let user = UserId::new();
        store.session_einfuegen(session(user, "tok", 100, 100));

        let erste = store.session_starten("tok", "firefox", "10.0.0.1").await.unwrap().unwrap();
        assert!(erste.erstmals);
        assert_eq!(erste.session.agent, "firefox");
        assert_ne!(erste.session.last_start, erste.session.created);

        let zweite = store.session_starten("tok", "chrome", "10.0.0.2").await.unwrap().unwrap();
        assert!(!zweite.erstmals);
        assert_eq!(zweite.session.ip, "10.0.0.2");
    }

    #[tokio::test]
    async fn unbekannter_oder_leerer_token() {
        let store = MemoryStore::neu();
        store.session_einfuegen(session(UserId::new(), "tok", 1, 1));
        assert!(store.session_starten("anders", "", "").await.unwrap().is_none());
        assert!(store.session_starten("", "", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn letzte_nachricht_ab_wasserzeichen() {
        let store = MemoryStore::neu();
        let kanal = ChannelId::new();
        for created in [10, 20, 30] {
            store.nachricht_einfuegen(NachrichtRecord {
                id: MessageId::new(),
                channel_id: kanal,
                user_id: UserId::new(),
                typ: "text".into(),
                body: vec![created as u8],
                created,
                keys: vec![],
            });
        }
        let n = store.letzte_nachricht(kanal, 15).await.unwrap().unwrap();
        assert_eq!(n.created, 30);
        assert!(store.letzte_nachricht(kanal, 31).await.unwrap().is_none());
        assert!(store.letzte_nachricht(ChannelId::new(), 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn kanaele_nur_sichtbare_mitgliedschaften() {
        let store = MemoryStore::neu();
        let user = UserId::new();
        let kanal = ChannelId::new();
        store.kanal_einfuegen(KanalRecord {
            id: kanal,
            typ: KanalTyp::Group,
            name: "g".into(),
            avatar_id: vec![],
            created: 0,
            users: vec![KanalMitgliedRecord { id: user, added: 0, owner: true, hidden: false }],
        });
        assert_eq!(store.kanaele_fuer_user(user).await.unwrap().len(), 1);

        assert!(store.mitglied_verstecken(kanal, user, true));
        assert!(store.kanaele_fuer_user(user).await.unwrap().is_empty());
        assert!(!store.mitglied_verstecken(kanal, UserId::new(), true));
    }

    #[tokio::test]
    async fn freundschaft_wird_ersetzt() {
        let store = MemoryStore::neu();
        let (a, b) = (UserId::new(), UserId::new());
        store.freundschaft_einfuegen(FreundRecord { user1_id: a, user2_id: b, accepted: false, created: 0 });
        store.freundschaft_einfuegen(FreundRecord { user1_id: a, user2_id: b, accepted: true, created: 0 });

        assert_eq!(store.freunde_fuer_user(a).await.unwrap().len(), 1);
        assert!(store.freundschaft(b, a).await.unwrap().unwrap().accepted);
    }

    #[test]
    fn seed_ohne_token_wird_abgelehnt() {
        let seed = Seed {
            sessions: vec![session(UserId::new(), "", 0, 0)],
            ..Seed::default()
        };
        assert!(matches!(MemoryStore::aus_seed(seed), Err(DbError::UngueltigeDaten(_))));
    }
}

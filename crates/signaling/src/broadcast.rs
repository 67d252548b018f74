//! Broadcast-Router – Fan-out von Nachrichten an Empfaengergruppen
//!
//! Jede Operation serialisiert die Nachricht genau einmal, bestimmt die
//! Empfaenger aus der Registry und den Collaborators und reiht den Frame in
//! deren Send-Queues ein. Es werden nur bereite Verbindungen beliefert.
//!
//! ## Empfaengergruppen
//! - Ein Benutzer: `an_user`
//! - Eine Session: `an_session`
//! - Alle sichtbaren Kanalmitglieder: `an_channel`
//! - Alle sichtbaren Kanalmitglieder ausser einem: `an_channel_ausser`
//! - Freunde und Kanal-Mitmitglieder: `an_verwandte`
//!
//! Der Rueckgabewert ist die Anzahl erreichter Verbindungen.

use murmur_core::{ChannelId, ConnectionId, SessionId, UserId};
use murmur_db::{KanalRecord, Store};
use murmur_protocol::Outbound;
use std::collections::HashSet;
use std::sync::Arc;

use crate::connection::Ausgang;
use crate::registry::VerbindungsRegistry;

pub struct BroadcastRouter<S: Store> {
    registry: VerbindungsRegistry,
    store: Arc<S>,
}

impl<S: Store> Clone for BroadcastRouter<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> BroadcastRouter<S> {
    pub fn neu(registry: VerbindungsRegistry, store: Arc<S>) -> Self {
        Self { registry, store }
    }

    // -----------------------------------------------------------------------
    // Direkte Ziele
    // -----------------------------------------------------------------------

    /// An alle bereiten Verbindungen eines Benutzers
    pub fn an_user(&self, user: UserId, nachricht: &Outbound) -> usize {
        match Ausgang::aus_nachricht(nachricht) {
            Some(ausgang) => self.ausgang_an_user(user, &ausgang),
            None => 0,
        }
    }

    /// An alle bereiten Verbindungen einer Session
    pub fn an_session(&self, session: SessionId, nachricht: &Outbound) -> usize {
        let Some(ausgang) = Ausgang::aus_nachricht(nachricht) else {
            return 0;
        };
        self.registry
            .fuer_session(session)
            .iter()
            .filter(|v| v.einreihen(ausgang.clone()))
            .count()
    }

    /// An genau eine Verbindung, sofern sie bereit ist
    pub fn an_verbindung(&self, id: ConnectionId, nachricht: &Outbound) -> bool {
        match self.registry.holen(id) {
            Some(v) if v.ist_bereit() => v.senden(nachricht),
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Kanaele
    // -----------------------------------------------------------------------

    /// An alle nicht versteckten Mitglieder eines Kanals
    pub async fn an_channel(&self, kanal: ChannelId, nachricht: &Outbound) -> usize {
        match self.kanal_laden(kanal).await {
            Some(k) => self.an_mitglieder(&k, None, nachricht),
            None => 0,
        }
    }

    /// Wie `an_channel`, ohne die Verbindungen von `ausser`
    pub async fn an_channel_ausser(
        &self,
        kanal: ChannelId,
        ausser: UserId,
        nachricht: &Outbound,
    ) -> usize {
        match self.kanal_laden(kanal).await {
            Some(k) => self.an_mitglieder(&k, Some(ausser), nachricht),
            None => 0,
        }
    }

    /// Fan-out auf einen bereits geladenen Kanal
    pub fn an_mitglieder(
        &self,
        kanal: &KanalRecord,
        ausser: Option<UserId>,
        nachricht: &Outbound,
    ) -> usize {
        let Some(ausgang) = Ausgang::aus_nachricht(nachricht) else {
            return 0;
        };
        kanal
            .sichtbare_mitglieder()
            .filter(|m| Some(m.id) != ausser)
            .map(|m| self.ausgang_an_user(m.id, &ausgang))
            .sum()
    }

    // -----------------------------------------------------------------------
    // Verwandte
    // -----------------------------------------------------------------------

    /// An alle Benutzer die den Status von `user` sehen
    ///
    /// Das sind Freunde in beiden Richtungen (angenommen oder offen) und alle
    /// Mitmitglieder der Kanaele, in denen `user` sichtbares Mitglied ist.
    /// Jeder Benutzer wird genau einmal beliefert, `user` selbst nie.
    pub async fn an_verwandte(&self, user: UserId, nachricht: &Outbound) -> usize {
        let Some(ausgang) = Ausgang::aus_nachricht(nachricht) else {
            return 0;
        };
        self.verwandte(user)
            .await
            .into_iter()
            .map(|ziel| self.ausgang_an_user(ziel, &ausgang))
            .sum()
    }

    /// Menge der verwandten Benutzer ohne `user` selbst
    pub async fn verwandte(&self, user: UserId) -> HashSet<UserId> {
        let mut ziele = HashSet::new();

        match self.store.freunde_fuer_user(user).await {
            Ok(freunde) => ziele.extend(freunde.iter().map(|f| f.gegenueber(user))),
            Err(e) => {
                tracing::warn!(user_id = %user, fehler = %e, "Freunde nicht ladbar");
            }
        }

        match self.store.kanaele_fuer_user(user).await {
            Ok(kanaele) => {
                for kanal in &kanaele {
                    ziele.extend(kanal.users.iter().map(|m| m.id));
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user, fehler = %e, "Kanaele nicht ladbar");
            }
        }

        ziele.remove(&user);
        ziele
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    fn ausgang_an_user(&self, user: UserId, ausgang: &Ausgang) -> usize {
        self.registry
            .fuer_user(user)
            .iter()
            .filter(|v| v.einreihen(ausgang.clone()))
            .count()
    }

    async fn kanal_laden(&self, kanal: ChannelId) -> Option<KanalRecord> {
        match self.store.kanal_laden(kanal).await {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!(channel_id = %kanal, fehler = %e, "Kanal nicht ladbar");
                None
            }
        }
    }
}

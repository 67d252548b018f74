//! Voice-Tabelle – hoechstens eine autoritative Voice-Verbindung pro Benutzer
//!
//! Alle Zustandswechsel laufen ueber atomare DashMap-Operationen auf dem
//! Eintrag des Benutzers. Zwei gleichzeitige Beitritte desselben Benutzers
//! sehen sich deshalb immer gegenseitig als Vorgaenger.

use dashmap::DashMap;
use murmur_core::{ChannelId, ConnectionId, UserId};
use std::sync::Arc;

/// Autoritative Voice-Verbindung eines Benutzers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceEintrag {
    pub verbindung: ConnectionId,
    pub kanal: ChannelId,
}

#[derive(Clone, Default)]
pub struct VoiceTabelle {
    inner: Arc<DashMap<UserId, VoiceEintrag>>,
}

impl VoiceTabelle {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Setzt die autoritative Verbindung und liefert den Vorgaenger
    pub fn setzen(&self, user: UserId, eintrag: VoiceEintrag) -> Option<VoiceEintrag> {
        self.inner.insert(user, eintrag)
    }

    /// Entfernt den Eintrag nur wenn er noch zu dieser Verbindung gehoert
    pub fn entfernen_wenn(&self, user: UserId, verbindung: ConnectionId) -> Option<VoiceEintrag> {
        self.inner
            .remove_if(&user, |_, e| e.verbindung == verbindung)
            .map(|(_, e)| e)
    }

    pub fn holen(&self, user: UserId) -> Option<VoiceEintrag> {
        self.inner.get(&user).map(|e| *e.value())
    }

    /// Voice-Kanal der Verbindung, falls sie fuer den Benutzer autoritativ ist
    pub fn kanal_von(&self, user: UserId, verbindung: ConnectionId) -> Option<ChannelId> {
        self.holen(user)
            .filter(|e| e.verbindung == verbindung)
            .map(|e| e.kanal)
    }

    /// Benutzer ist im angegebenen Kanal in Voice
    pub fn ist_in_kanal(&self, user: UserId, kanal: ChannelId) -> bool {
        self.holen(user).is_some_and(|e| e.kanal == kanal)
    }

    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setzen_liefert_vorgaenger() {
        let tabelle = VoiceTabelle::neu();
        let user = UserId::new();
        let erster = VoiceEintrag {
            verbindung: ConnectionId::new(),
            kanal: ChannelId::new(),
        };
        let zweiter = VoiceEintrag {
            verbindung: ConnectionId::new(),
            kanal: erster.kanal,
        };
        assert!(tabelle.setzen(user, erster).is_none());
        assert_eq!(tabelle.setzen(user, zweiter), Some(erster));
        assert_eq!(tabelle.anzahl(), 1);
    }

    #[test]
    fn fremde_verbindung_entfernt_nicht() {
        let tabelle = VoiceTabelle::neu();
        let user = UserId::new();
        let eintrag = VoiceEintrag {
            verbindung: ConnectionId::new(),
            kanal: ChannelId::new(),
        };
        tabelle.setzen(user, eintrag);

        assert!(tabelle.entfernen_wenn(user, ConnectionId::new()).is_none());
        assert!(tabelle.kanal_von(user, ConnectionId::new()).is_none());
        assert_eq!(tabelle.kanal_von(user, eintrag.verbindung), Some(eintrag.kanal));
        assert!(tabelle.ist_in_kanal(user, eintrag.kanal));

        assert_eq!(tabelle.entfernen_wenn(user, eintrag.verbindung), Some(eintrag));
        assert!(tabelle.holen(user).is_none());
    }
}

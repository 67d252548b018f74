//! Verbindungs-Registry – prozessweite Tabelle aller Live-Verbindungen
//!
//! Abfragen liefern immer einen Snapshot (Vec von Arcs). Waehrend ueber das
//! Ergebnis iteriert und gesendet wird, ist keine Sperre der Map gehalten.

use dashmap::DashMap;
use murmur_core::{ConnectionId, SessionId, UserId};
use std::sync::Arc;

use crate::connection::Verbindung;

/// Thread-safe Registry, Clone teilt den inneren Zustand
#[derive(Clone, Default)]
pub struct VerbindungsRegistry {
    inner: Arc<DashMap<ConnectionId, Arc<Verbindung>>>,
}

impl VerbindungsRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn registrieren(&self, verbindung: Arc<Verbindung>) {
        tracing::debug!(connection_id = %verbindung.id, "Verbindung registriert");
        self.inner.insert(verbindung.id, verbindung);
    }

    /// Entfernt eine Verbindung
    ///
    /// Gibt nur beim ersten Aufruf `Some` zurueck. Der Abbau haengt daran,
    /// damit er genau einmal laeuft.
    pub fn entfernen(&self, id: ConnectionId) -> Option<Arc<Verbindung>> {
        self.inner.remove(&id).map(|(_, v)| v)
    }

    pub fn holen(&self, id: ConnectionId) -> Option<Arc<Verbindung>> {
        self.inner.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Alle registrierten Verbindungen
    pub fn snapshot(&self) -> Vec<Arc<Verbindung>> {
        self.inner.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Alle bereiten Verbindungen eines Benutzers
    pub fn fuer_user(&self, user: UserId) -> Vec<Arc<Verbindung>> {
        self.snapshot()
            .into_iter()
            .filter(|v| v.user_id() == Some(user))
            .collect()
    }

    /// Alle bereiten Verbindungen einer Session
    pub fn fuer_session(&self, session: SessionId) -> Vec<Arc<Verbindung>> {
        self.snapshot()
            .into_iter()
            .filter(|v| v.bindung().is_some_and(|b| b.session_id == session))
            .collect()
    }

    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}

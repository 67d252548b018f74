//! Presence – effektiver Status eines Benutzers
//!
//! Der Status wird nicht gespeichert, sondern bei Bedarf aus dem
//! Wunschstatus und den Live-Verbindungen berechnet:
//!
//! 1. keine bereite Verbindung -> `offline`
//! 2. Wunschstatus `invisible` -> `offline`
//! 3. Wunschstatus `online` und alle Verbindungen away -> `away`
//! 4. sonst der Wunschstatus
//!
//! Fuer einen Betrachter, der kein angenommener Freund ist, ist jeder
//! Benutzer `offline`.

use murmur_core::{Status, UserId};
use murmur_db::Store;
use murmur_protocol::outbound::ForeignUserSetStatus;
use murmur_protocol::Outbound;
use std::sync::Arc;

use crate::connection::Verbindung;
use crate::server_state::SignalingState;

/// Status aus Wunschstatus und den bereiten Verbindungen des Benutzers
pub fn effektiver_status(wunsch: Status, verbindungen: &[Arc<Verbindung>]) -> Status {
    if verbindungen.is_empty() {
        return Status::Offline;
    }
    match wunsch {
        Status::Invisible | Status::Offline => Status::Offline,
        Status::Online if verbindungen.iter().all(|v| v.away()) => Status::Away,
        andere => andere,
    }
}

/// Sicht eines Betrachters auf einen effektiven Status
pub fn status_fuer_betrachter(effektiv: Status, angenommener_freund: bool) -> Status {
    if angenommener_freund {
        effektiv
    } else {
        Status::Offline
    }
}

/// Effektiver Status eines Benutzers, Wunschstatus aus dem Store
pub async fn status_berechnen<S: Store>(state: &SignalingState<S>, user: UserId) -> Status {
    let verbindungen = state.registry.fuer_user(user);
    if verbindungen.is_empty() {
        return Status::Offline;
    }
    match state.store.benutzer_laden(user).await {
        Ok(Some(benutzer)) => effektiver_status(benutzer.want_status, &verbindungen),
        Ok(None) => Status::Offline,
        Err(e) => {
            tracing::warn!(user_id = %user, fehler = %e, "Wunschstatus nicht ladbar");
            Status::Offline
        }
    }
}

/// Sendet den aktuellen Status von `user` an alle Verwandten
pub async fn status_verbreiten<S: Store>(state: &SignalingState<S>, user: UserId) -> usize {
    let status = status_berechnen(state, user).await;
    let n = state
        .router
        .an_verwandte(
            user,
            &Outbound::ForeignUserSetStatus(ForeignUserSetStatus { id: user, status }),
        )
        .await;
    tracing::debug!(user_id = %user, ?status, empfaenger = n, "Status verbreitet");
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{test_verbindung, Bindung};
    use murmur_core::SessionId;

    fn bereit(away: bool) -> Arc<Verbindung> {
        let (v, _rx) = test_verbindung(4);
        v.bereit_setzen(
            Bindung {
                user_id: UserId::new(),
                session_id: SessionId::new(),
            },
            Vec::new(),
            away,
            &Outbound::VoiceReset,
        );
        v
    }

    #[test]
    fn ohne_verbindung_offline() {
        assert_eq!(effektiver_status(Status::Busy, &[]), Status::Offline);
    }

    #[test]
    fn unsichtbar_ist_offline() {
        assert_eq!(effektiver_status(Status::Invisible, &[bereit(false)]), Status::Offline);
    }

    #[test]
    fn away_nur_wenn_alle_verbindungen_away() {
        assert_eq!(
            effektiver_status(Status::Online, &[bereit(true), bereit(false)]),
            Status::Online
        );
        assert_eq!(
            effektiver_status(Status::Online, &[bereit(true), bereit(true)]),
            Status::Away
        );
    }

    #[test]
    fn busy_bleibt_busy_auch_wenn_away() {
        assert_eq!(effektiver_status(Status::Busy, &[bereit(true)]), Status::Busy);
    }

    #[test]
    fn fremde_betrachter_sehen_offline() {
        assert_eq!(status_fuer_betrachter(Status::Busy, false), Status::Offline);
        assert_eq!(status_fuer_betrachter(Status::Busy, true), Status::Busy);
    }
}

//! Verbindung – Zustand einer einzelnen Live-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `Verbindung`. Fremde Tasks
//! (Broadcasts anderer Verbindungen, externe Handler) schreiben nie direkt
//! auf den Transport, sondern reihen Frames in die Send-Queue ein. Genau ein
//! Schreib-Task leert die Queue, dadurch koennen sich Frames nie vermischen.
//!
//! ## State Machine
//! ```text
//! Verbunden --start ok--> Bereit
//!     |                      |
//!     +------ Abbau ---------+
//! ```
//!
//! Veraenderlicher Zustand (Phase, Bindung, Chunks, Away) liegt hinter
//! einem einzigen Mutex.

use murmur_core::{ConnectionId, SessionId, UserId};
use murmur_protocol::Outbound;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Ausgang
// ---------------------------------------------------------------------------

/// Ein Eintrag der Send-Queue
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgang {
    /// Serialisiertes Envelope
    Text(Arc<str>),
    /// Serialisiertes `reset`; der Transport wird nach dem Senden geschlossen
    Reset(Arc<str>),
    /// Keepalive-Probe
    Ping,
}

impl Ausgang {
    /// Serialisiert eine Nachricht genau einmal fuer beliebig viele Empfaenger
    pub fn aus_nachricht(nachricht: &Outbound) -> Option<Self> {
        match nachricht.kodieren() {
            Ok(text) if nachricht.ist_reset() => Some(Self::Reset(text.into())),
            Ok(text) => Some(Self::Text(text.into())),
            Err(e) => {
                tracing::error!(fehler = %e, "Nachricht nicht serialisierbar");
                None
            }
        }
    }

    /// Text-Inhalt, `None` fuer Pings
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) | Self::Reset(t) => Some(t),
            Self::Ping => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Phase des Handshakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Verbunden, noch kein erfolgreicher `start`
    Verbunden,
    /// Handshake abgeschlossen, `ready` gesendet
    Bereit,
}

/// Bindung an eine authentifizierte Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindung {
    pub user_id: UserId,
    pub session_id: SessionId,
}

#[derive(Debug)]
struct Zustand {
    phase: Phase,
    bindung: Option<Bindung>,
    chunks: HashSet<String>,
    away: bool,
}

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

/// Eine registrierte Live-Verbindung
pub struct Verbindung {
    pub id: ConnectionId,
    tx: mpsc::Sender<Ausgang>,
    zustand: Mutex<Zustand>,
    /// Seit der letzten Probe Lebenszeichen empfangen
    lebendig: AtomicBool,
    abbruch: CancellationToken,
    pub verbunden_seit: Instant,
}

impl std::fmt::Debug for Verbindung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verbindung")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Verbindung {
    /// Erstellt eine neue Verbindung im Zustand `Verbunden`
    pub fn neu(id: ConnectionId, tx: mpsc::Sender<Ausgang>) -> Self {
        Self {
            id,
            tx,
            zustand: Mutex::new(Zustand {
                phase: Phase::Verbunden,
                bindung: None,
                chunks: HashSet::new(),
                away: false,
            }),
            lebendig: AtomicBool::new(true),
            abbruch: CancellationToken::new(),
            verbunden_seit: Instant::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Reiht einen Frame nicht-blockierend ein
    ///
    /// Eine volle Queue bedeutet, dass der Client nicht mehr liest. Die
    /// Verbindung wird dann abgebrochen.
    pub fn einreihen(&self, ausgang: Ausgang) -> bool {
        match self.tx.try_send(ausgang) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Send-Queue voll – Verbindung wird getrennt");
                self.abbruch.cancel();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = %self.id, "Send-Queue geschlossen");
                false
            }
        }
    }

    /// Serialisiert und reiht eine einzelne Nachricht ein
    pub fn senden(&self, nachricht: &Outbound) -> bool {
        match Ausgang::aus_nachricht(nachricht) {
            Some(ausgang) => self.einreihen(ausgang),
            None => false,
        }
    }

    pub fn ping_senden(&self) -> bool {
        self.einreihen(Ausgang::Ping)
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.zustand.lock().phase
    }

    pub fn ist_bereit(&self) -> bool {
        self.phase() == Phase::Bereit
    }

    /// Gebundene Session, nur im Zustand `Bereit`
    pub fn bindung(&self) -> Option<Bindung> {
        let z = self.zustand.lock();
        match z.phase {
            Phase::Bereit => z.bindung,
            Phase::Verbunden => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.bindung().map(|b| b.user_id)
    }

    /// Schliesst den Handshake ab und reiht `ready` unter derselben Sperre ein
    ///
    /// Broadcasts sehen die Verbindung erst als `Bereit`, wenn `ready` bereits
    /// in der Queue steht. Gibt `false` zurueck wenn die Verbindung schon
    /// bereit war.
    pub fn bereit_setzen(
        &self,
        bindung: Bindung,
        chunks: impl IntoIterator<Item = String>,
        away: bool,
        ready: &Outbound,
    ) -> bool {
        let Some(ausgang) = Ausgang::aus_nachricht(ready) else {
            return false;
        };
        let mut z = self.zustand.lock();
        if z.phase == Phase::Bereit {
            return false;
        }
        z.phase = Phase::Bereit;
        z.bindung = Some(bindung);
        z.chunks.extend(chunks.into_iter().filter(|h| !h.is_empty()));
        z.away = away;
        self.einreihen(ausgang)
    }

    // -----------------------------------------------------------------------
    // Chunks
    // -----------------------------------------------------------------------

    /// Idempotentes Hinzufuegen, `true` wenn der Hash neu war
    pub fn chunk_hinzufuegen(&self, hash: &str) -> bool {
        self.zustand.lock().chunks.insert(hash.to_string())
    }

    /// Idempotentes Entfernen, `true` wenn der Hash vorhanden war
    pub fn chunk_entfernen(&self, hash: &str) -> bool {
        self.zustand.lock().chunks.remove(hash)
    }

    pub fn haelt_chunk(&self, hash: &str) -> bool {
        self.zustand.lock().chunks.contains(hash)
    }

    pub fn chunk_anzahl(&self) -> usize {
        self.zustand.lock().chunks.len()
    }

    // -----------------------------------------------------------------------
    // Away
    // -----------------------------------------------------------------------

    pub fn away(&self) -> bool {
        self.zustand.lock().away
    }

    /// Setzt das Away-Flag, `true` wenn es sich geaendert hat
    pub fn away_setzen(&self, away: bool) -> bool {
        let mut z = self.zustand.lock();
        let geaendert = z.away != away;
        z.away = away;
        geaendert
    }

    // -----------------------------------------------------------------------
    // Lebenszeichen / Abbruch
    // -----------------------------------------------------------------------

    pub fn lebendig_markieren(&self) {
        self.lebendig.store(true, Ordering::Relaxed);
    }

    /// Prueft und setzt das Lebendig-Flag zurueck
    ///
    /// Gibt `true` zurueck wenn seit der letzten Pruefung ein Lebenszeichen kam.
    pub fn lebendig_pruefen(&self) -> bool {
        self.lebendig.swap(false, Ordering::Relaxed)
    }

    pub fn abbruch(&self) -> &CancellationToken {
        &self.abbruch
    }

    /// Fordert das Trennen der Verbindung an
    pub fn schliessen(&self) {
        self.abbruch.cancel();
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.abbruch.is_cancelled()
    }
}

/// Test-Helfer: Verbindung samt Empfangsseite der Send-Queue
#[cfg(test)]
pub(crate) fn test_verbindung(groesse: usize) -> (Arc<Verbindung>, mpsc::Receiver<Ausgang>) {
    let (tx, rx) = mpsc::channel(groesse);
    (Arc::new(Verbindung::neu(ConnectionId::new(), tx)), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_protocol::outbound::ForeignUserSetStatus;
    use murmur_core::Status;

    fn bindung() -> Bindung {
        Bindung {
            user_id: UserId::new(),
            session_id: SessionId::new(),
        }
    }

    #[test]
    fn neue_verbindung_ist_nicht_bereit() {
        let (v, _rx) = test_verbindung(8);
        assert_eq!(v.phase(), Phase::Verbunden);
        assert!(v.user_id().is_none());
        assert_eq!(v.chunk_anzahl(), 0);
    }

    #[test]
    fn reset_wird_als_reset_eingereiht() {
        let (v, mut rx) = test_verbindung(8);
        assert!(v.senden(&Outbound::Reset));
        assert!(v.senden(&Outbound::VoiceReset));
        assert!(matches!(rx.try_recv().unwrap(), Ausgang::Reset(t) if &*t == r#"{"t":"reset"}"#));
        assert!(matches!(rx.try_recv().unwrap(), Ausgang::Text(_)));
    }

    #[test]
    fn bereit_setzen_nur_einmal() {
        let (v, mut rx) = test_verbindung(8);
        let b = bindung();
        let ready = Outbound::ForeignUserSetStatus(ForeignUserSetStatus {
            id: b.user_id,
            status: Status::Online,
        });
        assert!(v.bereit_setzen(b, vec!["h1".into(), "h1".into(), String::new()], true, &ready));
        assert!(v.ist_bereit());
        assert_eq!(v.user_id(), Some(b.user_id));
        assert_eq!(v.chunk_anzahl(), 1, "Duplikate und leere Hashes werden verworfen");
        assert!(v.away());
        assert!(rx.try_recv().is_ok());

        assert!(!v.bereit_setzen(bindung(), Vec::new(), false, &ready));
        assert_eq!(v.user_id(), Some(b.user_id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn chunks_idempotent() {
        let (v, _rx) = test_verbindung(8);
        assert!(v.chunk_hinzufuegen("abc"));
        assert!(!v.chunk_hinzufuegen("abc"));
        assert_eq!(v.chunk_anzahl(), 1);
        assert!(v.chunk_entfernen("abc"));
        assert!(!v.chunk_entfernen("abc"));
        assert!(!v.haelt_chunk("abc"));
    }

    #[test]
    fn volle_queue_bricht_verbindung_ab() {
        let (v, _rx) = test_verbindung(1);
        assert!(v.ping_senden());
        assert!(!v.ist_geschlossen());
        assert!(!v.ping_senden());
        assert!(v.ist_geschlossen());
    }

    #[test]
    fn lebendig_flag_wird_zurueckgesetzt() {
        let (v, _rx) = test_verbindung(1);
        assert!(v.lebendig_pruefen());
        assert!(!v.lebendig_pruefen());
        v.lebendig_markieren();
        assert!(v.lebendig_pruefen());
    }

    #[test]
    fn away_aenderung_erkannt() {
        let (v, _rx) = test_verbindung(1);
        assert!(!v.away_setzen(false));
        assert!(v.away_setzen(true));
        assert!(v.away());
    }
}

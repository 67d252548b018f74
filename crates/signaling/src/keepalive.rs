//! Keepalive-Supervisor – Lebenszeichen und Handshake-Frist
//!
//! Pro Verbindung laeuft ein Task. In jedem Intervall wird geprueft, ob seit
//! der letzten Probe ein Lebenszeichen (Pong oder beliebiger Frame) kam,
//! dann wird eine neue Probe gesendet. Zusaetzlich muss der Handshake
//! innerhalb der Frist abgeschlossen sein.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::connection::Verbindung;
use crate::dispatcher::AbbauGrund;

/// Ueberwacht eine Verbindung bis sie abgebrochen wird
///
/// Gibt `Some(grund)` zurueck wenn der Supervisor selbst den Abbau
/// ausgeloest hat, `None` wenn die Verbindung anderweitig endete.
pub async fn ueberwachen(
    verbindung: Arc<Verbindung>,
    intervall: Duration,
    handshake_frist: Duration,
) -> Option<AbbauGrund> {
    let mut ticker = interval_at(Instant::now() + intervall, intervall);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let frist = sleep(handshake_frist);
    tokio::pin!(frist);
    let mut frist_aktiv = true;

    let grund = loop {
        tokio::select! {
            _ = verbindung.abbruch().cancelled() => return None,
            _ = &mut frist, if frist_aktiv => {
                frist_aktiv = false;
                if !verbindung.ist_bereit() {
                    break AbbauGrund::HandshakeTimeout;
                }
            }
            _ = ticker.tick() => {
                if !verbindung.lebendig_pruefen() {
                    break AbbauGrund::KeepaliveTimeout;
                }
                verbindung.ping_senden();
            }
        }
    };

    tracing::info!(connection_id = %verbindung.id, %grund, "Verbindung nicht mehr lebendig");
    verbindung.schliessen();
    Some(grund)
}

//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Konfiguration, Collaborators und die prozessweiten Tabellen
//! (Verbindungen, Voice) als Arc-Referenzen, die zwischen tokio-Tasks
//! geteilt werden.

use murmur_core::ConnectionId;
use murmur_db::Store;
use murmur_observability::MurmurMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::broadcast::BroadcastRouter;
use crate::connection::{Ausgang, Verbindung};
use crate::registry::VerbindungsRegistry;
use crate::voice::VoiceTabelle;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Intervall der Keepalive-Probe in Sekunden
    pub keepalive_sek: u64,
    /// Maximale Dauer eines einzelnen Schreibvorgangs in Sekunden
    pub schreib_timeout_sek: u64,
    /// Frist fuer den `start`-Handshake in Sekunden
    pub handshake_timeout_sek: u64,
    /// Maximale Anzahl Halter pro `fileChunkGet`
    pub chunk_fanout: usize,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            schreib_timeout_sek: 60,
            handshake_timeout_sek: 30,
            chunk_fanout: 5,
            send_queue: 256,
        }
    }
}

impl SignalingConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_sek)
    }

    pub fn schreib_timeout(&self) -> Duration {
        Duration::from_secs(self.schreib_timeout_sek)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_sek)
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState<S: Store> {
    pub config: Arc<SignalingConfig>,
    /// Externe Collaborators (Sessions, Identitaeten, Kanaele, ...)
    pub store: Arc<S>,
    pub registry: VerbindungsRegistry,
    pub voice: VoiceTabelle,
    pub router: BroadcastRouter<S>,
    pub metriken: Option<MurmurMetrics>,
    /// Prozessweites Shutdown-Signal fuer alle Sitzungen
    pub shutdown: CancellationToken,
}

impl<S: Store> SignalingState<S> {
    pub fn neu(config: SignalingConfig, store: Arc<S>, metriken: Option<MurmurMetrics>) -> Self {
        let registry = VerbindungsRegistry::neu();
        let router = BroadcastRouter::neu(registry.clone(), Arc::clone(&store));
        Self {
            config: Arc::new(config),
            store,
            registry,
            voice: VoiceTabelle::neu(),
            router,
            metriken,
            shutdown: CancellationToken::new(),
        }
    }

    /// Legt eine neue Verbindung an und registriert sie
    ///
    /// Die Verbindung ist ab hier adressierbar, bekommt Broadcasts aber erst
    /// nach erfolgreichem Handshake.
    pub fn verbindung_registrieren(&self, tx: mpsc::Sender<Ausgang>) -> Arc<Verbindung> {
        let verbindung = Arc::new(Verbindung::neu(ConnectionId::new(), tx));
        self.registry.registrieren(Arc::clone(&verbindung));
        self.metrik(|m| {
            m.connections_total.inc();
            m.connections_active.inc();
        });
        verbindung
    }

    /// Beendet alle laufenden Sitzungen, neue Verbindungen werden sofort getrennt
    pub fn herunterfahren(&self) {
        tracing::info!(verbindungen = self.registry.anzahl(), "Sitzungen werden beendet");
        self.shutdown.cancel();
    }

    /// Fuehrt `f` aus, falls Metriken aktiviert sind
    pub fn metrik(&self, f: impl FnOnce(&MurmurMetrics)) {
        if let Some(m) = &self.metriken {
            f(m);
        }
    }

    /// Gleicht die Voice-Gauge mit der Tabelle ab
    pub(crate) fn voice_gauge_aktualisieren(&self) {
        let anzahl = self.voice.anzahl() as i64;
        self.metrik(|m| m.voice_members_active.set(anzahl));
    }
}

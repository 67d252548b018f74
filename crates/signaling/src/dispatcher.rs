//! Message-Dispatcher – Routet eingehende Frames an die richtigen Handler
//!
//! Der Dispatcher dekodiert einen Text-Frame, prueft den Verbindungszustand
//! und ruft den passenden Handler auf.
//!
//! ## Zustandspruefung
//! - `start` nur im Zustand `Verbunden` (auf bereiten Verbindungen ignoriert)
//! - Alle anderen Tags nur im Zustand `Bereit`, sonst stillschweigend verworfen
//!
//! Ein Fehler betrifft immer nur den einzelnen Frame, ausser
//! [`SignalingError::beendet_verbindung`] liefert `true`.

use murmur_db::Store;
use murmur_protocol::Inbound;
use std::fmt;
use std::sync::Arc;

use crate::connection::Verbindung;
use crate::error::{SignalingError, SignalingResult};
use crate::handlers::{presence_handler, start_handler, swarm_handler, voice_handler};
use crate::presence::status_verbreiten;
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die Transportverbindung
#[derive(Debug, Clone, Default)]
pub struct DispatcherContext {
    /// User-Agent des Upgrade-Requests
    pub agent: String,
    /// Client-Adresse (Forwarded-Header oder Peer-Adresse)
    pub ip: String,
}

/// Grund fuer den Abbau einer Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbbauGrund {
    /// Client hat geschlossen oder der Stream ist zu Ende
    Geschlossen,
    Lesefehler,
    /// Handshake abgelehnt (`reset` gesendet)
    Abgelehnt,
    /// Schreibfehler, Schreib-Timeout oder volle Queue
    Transport,
    KeepaliveTimeout,
    HandshakeTimeout,
    /// Server faehrt herunter
    Shutdown,
}

impl fmt::Display for AbbauGrund {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Geschlossen => "geschlossen",
            Self::Lesefehler => "lesefehler",
            Self::Abgelehnt => "abgelehnt",
            Self::Transport => "transport",
            Self::KeepaliveTimeout => "keepalive_timeout",
            Self::HandshakeTimeout => "handshake_timeout",
            Self::Shutdown => "shutdown",
        };
        f.write_str(text)
    }
}

impl From<&SignalingError> for AbbauGrund {
    fn from(fehler: &SignalingError) -> Self {
        match fehler {
            SignalingError::AuthAbgelehnt(_) => Self::Abgelehnt,
            _ => Self::Transport,
        }
    }
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher<S: Store> {
    state: Arc<SignalingState<S>>,
}

impl<S: Store> Clone for MessageDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Store> MessageDispatcher<S> {
    pub fn neu(state: Arc<SignalingState<S>>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<SignalingState<S>> {
        &self.state
    }

    /// Verarbeitet einen eingehenden Text-Frame
    pub async fn dispatch_text(
        &self,
        verbindung: &Arc<Verbindung>,
        text: &str,
        ctx: &DispatcherContext,
    ) -> SignalingResult<()> {
        let nachricht = match Inbound::aus_text(text) {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(connection_id = %verbindung.id, fehler = %e, "Frame verworfen");
                self.state.metrik(|m| m.frames_dropped_total.inc());
                return Err(e.into());
            }
        };

        let tag = nachricht.tag();
        let ergebnis = self.dispatch(verbindung, nachricht, ctx).await;
        if let Err(e) = &ergebnis {
            if e.beendet_verbindung() {
                tracing::debug!(connection_id = %verbindung.id, tag, fehler = %e, "Frame beendet Verbindung");
            } else if matches!(e, SignalingError::Datenbank(_) | SignalingError::Intern(_)) {
                tracing::warn!(connection_id = %verbindung.id, tag, fehler = %e, "Frame fehlgeschlagen");
            } else {
                tracing::debug!(connection_id = %verbindung.id, tag, fehler = %e, "Frame ohne Wirkung");
            }
        }
        ergebnis
    }

    /// Verarbeitet eine bereits dekodierte Nachricht
    pub async fn dispatch(
        &self,
        verbindung: &Arc<Verbindung>,
        nachricht: Inbound,
        ctx: &DispatcherContext,
    ) -> SignalingResult<()> {
        let state = self.state.as_ref();

        if let Inbound::Start(payload) = nachricht {
            return start_handler::handle_start(state, verbindung, payload, &ctx.agent, &ctx.ip)
                .await;
        }

        let Some(user) = verbindung.user_id() else {
            tracing::trace!(connection_id = %verbindung.id, tag = nachricht.tag(), "Frame vor Handshake ignoriert");
            return Ok(());
        };

        match nachricht {
            Inbound::Start(_) => Ok(()),

            // -------------------------------------------------------------------
            // Presence
            // -------------------------------------------------------------------
            Inbound::Typing(p) => presence_handler::handle_typing(state, verbindung, p.channel_id)
                .await
                .map(|_| ()),
            Inbound::SetAway(p) => presence_handler::handle_set_away(state, verbindung, p.away).await,

            // -------------------------------------------------------------------
            // Swarm
            // -------------------------------------------------------------------
            Inbound::FileChunkOwned(p) => swarm_handler::handle_chunk_owned(verbindung, &p.hash),
            Inbound::FileChunkLost(p) => swarm_handler::handle_chunk_lost(verbindung, &p.hash),
            Inbound::FileChunkGet(p) => {
                swarm_handler::handle_chunk_get(state, verbindung, &p.hash).map(|_| ())
            }
            Inbound::FileChunkRtc(p) => swarm_handler::handle_chunk_rtc(state, verbindung, p),

            // -------------------------------------------------------------------
            // Voice
            // -------------------------------------------------------------------
            Inbound::VoiceStart(p) => {
                voice_handler::handle_voice_start(state, verbindung, p.channel_id).await
            }
            Inbound::VoiceStop => voice_handler::handle_voice_stop(state, verbindung, user).await,
            Inbound::VoiceRtc(p) => voice_handler::handle_voice_rtc(state, verbindung, p),
        }
    }

    /// Baut eine Verbindung ab, genau einmal pro Verbindung
    ///
    /// Reihenfolge: aus der Registry entfernen, impliziter Voice-Austritt,
    /// Status an die Verwandten verbreiten. Weitere Aufrufe sind wirkungslos.
    pub async fn client_cleanup(&self, verbindung: &Verbindung, grund: AbbauGrund) -> bool {
        if self.state.registry.entfernen(verbindung.id).is_none() {
            return false;
        }
        verbindung.schliessen();
        self.state.metrik(|m| m.connections_active.dec());

        let user = verbindung.user_id();
        if let Some(user) = user {
            if let Err(e) = voice_handler::handle_voice_stop(&self.state, verbindung, user).await {
                tracing::warn!(connection_id = %verbindung.id, fehler = %e, "Voice-Austritt beim Abbau fehlgeschlagen");
            }
            status_verbreiten(&self.state, user).await;
        }

        tracing::info!(
            connection_id = %verbindung.id,
            user_id = ?user,
            %grund,
            dauer_sek = verbindung.verbunden_seit.elapsed().as_secs(),
            "Verbindung abgebaut"
        );
        true
    }
}

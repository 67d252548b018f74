//! Start-Handler – bindet eine Verbindung an eine Session
//!
//! Ablauf:
//! 1. Token aufloesen (frischt agent/ip/last_start auf), sonst `reset`
//! 2. Bei einem Folgestart `sessionStart` an die anderen Verbindungen
//! 3. Snapshot bauen und `ready` senden, Verbindung wird bereit
//! 4. Status an alle Verwandten verbreiten
//! 5. Optional automatisch einem Voice-Kanal beitreten

use murmur_db::Store;
use murmur_protocol::inbound::StartPayload;
use murmur_protocol::outbound::SessionStart;
use murmur_protocol::Outbound;
use std::sync::Arc;

use crate::connection::{Bindung, Verbindung};
use crate::error::{SignalingError, SignalingResult};
use crate::handlers::voice_handler;
use crate::presence::status_verbreiten;
use crate::server_state::SignalingState;
use crate::snapshot::ready_bauen;

/// Verarbeitet `start`
///
/// Ein zweites `start` auf einer bereiten Verbindung wird ignoriert.
pub async fn handle_start<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Arc<Verbindung>,
    payload: StartPayload,
    agent: &str,
    ip: &str,
) -> SignalingResult<()> {
    if verbindung.ist_bereit() {
        tracing::debug!(connection_id = %verbindung.id, "Wiederholtes start ignoriert");
        return Ok(());
    }

    let aktivierung = match state.store.session_starten(&payload.token, agent, ip).await {
        Ok(Some(a)) => a,
        Ok(None) => return Err(ablehnen(state, verbindung, "Token unbekannt")),
        Err(e) => {
            tracing::warn!(connection_id = %verbindung.id, fehler = %e, "Session-Aufloesung fehlgeschlagen");
            return Err(ablehnen(state, verbindung, "Session-Store nicht erreichbar"));
        }
    };
    let session = aktivierung.session;
    let user = session.user_id;

    if !aktivierung.erstmals {
        // Diese Verbindung ist noch nicht bereit und bekommt die Meldung nicht
        state.router.an_user(
            user,
            &Outbound::SessionStart(SessionStart {
                id: session.id,
                agent: session.agent.clone(),
                ip: session.ip.clone(),
            }),
        );
    }

    let ready = match ready_bauen(state, &session).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(connection_id = %verbindung.id, user_id = %user, fehler = %e, "Snapshot fehlgeschlagen");
            return Err(ablehnen(state, verbindung, "Snapshot nicht baubar"));
        }
    };

    let bindung = Bindung {
        user_id: user,
        session_id: session.id,
    };
    if !verbindung.bereit_setzen(bindung, payload.file_chunks, payload.away, &Outbound::Ready(ready)) {
        return Err(SignalingError::Transport("ready nicht zustellbar".into()));
    }

    tracing::info!(
        connection_id = %verbindung.id,
        user_id = %user,
        session_id = %session.id,
        erstmals = aktivierung.erstmals,
        "Verbindung bereit"
    );

    status_verbreiten(state, user).await;

    if let Some(kanal) = payload.voice_channel_id {
        if let Err(e) = voice_handler::handle_voice_start(state, verbindung, kanal).await {
            tracing::debug!(connection_id = %verbindung.id, fehler = %e, "Automatischer Voice-Beitritt abgelehnt");
        }
    }
    Ok(())
}

fn ablehnen<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    grund: &str,
) -> SignalingError {
    tracing::info!(connection_id = %verbindung.id, grund, "Handshake abgelehnt");
    verbindung.senden(&Outbound::Reset);
    state.metrik(|m| m.handshakes_rejected_total.inc());
    SignalingError::AuthAbgelehnt(grund.to_string())
}

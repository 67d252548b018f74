//! Swarm-Handler – Chunk-Index und Vermittlung von Chunk-Transfers
//!
//! Jede bereite Verbindung meldet, welche Chunks (Hashes) sie haelt. Eine
//! Anfrage wird an hoechstens `chunk_fanout` zufaellig gewaehlte Halter
//! weitergegeben, die sich dann per `fileChunkRtc` beim Anfragenden melden.

use murmur_core::ConnectionId;
use murmur_db::Store;
use murmur_protocol::inbound::ChunkRtcPayload;
use murmur_protocol::outbound::{FileChunkRequest, FileChunkRtc};
use murmur_protocol::Outbound;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

use crate::connection::{Ausgang, Verbindung};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

fn hash_pruefen(hash: &str) -> SignalingResult<()> {
    if hash.is_empty() {
        return Err(SignalingError::richtlinie("leerer Chunk-Hash"));
    }
    Ok(())
}

/// `fileChunkOwned`, idempotent
pub fn handle_chunk_owned(verbindung: &Verbindung, hash: &str) -> SignalingResult<()> {
    hash_pruefen(hash)?;
    verbindung.chunk_hinzufuegen(hash);
    Ok(())
}

/// `fileChunkLost`, idempotent
pub fn handle_chunk_lost(verbindung: &Verbindung, hash: &str) -> SignalingResult<()> {
    hash_pruefen(hash)?;
    verbindung.chunk_entfernen(hash);
    Ok(())
}

/// Waehlt bis zu `k` Halter gleichverteilt aus
pub fn halter_auswaehlen<T, R: Rng + ?Sized>(mut kandidaten: Vec<T>, k: usize, rng: &mut R) -> Vec<T> {
    kandidaten.shuffle(rng);
    kandidaten.truncate(k);
    kandidaten
}

/// `fileChunkGet`
///
/// Gibt die Anzahl angefragter Halter zurueck. Ohne Halter passiert nichts.
pub fn handle_chunk_get<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    hash: &str,
) -> SignalingResult<usize> {
    hash_pruefen(hash)?;

    let kandidaten: Vec<Arc<Verbindung>> = state
        .registry
        .snapshot()
        .into_iter()
        .filter(|v| v.id != verbindung.id && v.ist_bereit() && v.haelt_chunk(hash))
        .collect();
    let halter = halter_auswaehlen(kandidaten, state.config.chunk_fanout, &mut rand::thread_rng());
    if halter.is_empty() {
        tracing::debug!(connection_id = %verbindung.id, hash, "Kein Halter fuer Chunk");
        return Ok(0);
    }

    let Some(anfrage) = Ausgang::aus_nachricht(&Outbound::FileChunkRequest(FileChunkRequest {
        hash: hash.to_string(),
        socket_id: verbindung.id,
    })) else {
        return Err(SignalingError::intern("fileChunkRequest nicht serialisierbar"));
    };
    let n = halter
        .iter()
        .filter(|h| h.einreihen(anfrage.clone()))
        .count();
    state.metrik(|m| m.chunk_requests_total.inc_by(n as u64));
    tracing::debug!(connection_id = %verbindung.id, hash, halter = n, "Chunk angefragt");
    Ok(n)
}

/// `fileChunkRtc`, Weiterleitung an genau eine Verbindung
pub fn handle_chunk_rtc<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    payload: ChunkRtcPayload,
) -> SignalingResult<()> {
    let ziel: ConnectionId = payload.socket_id;
    let zugestellt = state.router.an_verbindung(
        ziel,
        &Outbound::FileChunkRtc(FileChunkRtc {
            hash: payload.hash,
            socket_id: verbindung.id,
            payload: payload.payload,
            payload_type: payload.payload_type,
        }),
    );
    if !zugestellt {
        return Err(SignalingError::ziel_veraltet(format!("Verbindung {ziel} unbekannt")));
    }
    Ok(())
}

//! Presence-Handler – Tipp-Indikator und Away-Flag

use murmur_core::ChannelId;
use murmur_db::Store;
use murmur_protocol::outbound::ChannelUserTyping;
use murmur_protocol::Outbound;

use crate::connection::Verbindung;
use crate::error::{SignalingError, SignalingResult};
use crate::presence::status_verbreiten;
use crate::server_state::SignalingState;

/// `typing`: an alle anderen sichtbaren Mitglieder des Kanals
pub async fn handle_typing<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    kanal: ChannelId,
) -> SignalingResult<usize> {
    let user = verbindung
        .user_id()
        .ok_or_else(|| SignalingError::intern("typing ohne Bindung"))?;

    let Some(record) = state.store.kanal_laden(kanal).await? else {
        return Err(SignalingError::richtlinie(format!("Kanal {kanal} unbekannt")));
    };
    if !record.ist_sichtbares_mitglied(user) {
        return Err(SignalingError::richtlinie(format!(
            "{user} ist kein Mitglied von {kanal}"
        )));
    }

    Ok(state.router.an_mitglieder(
        &record,
        Some(user),
        &Outbound::ChannelUserTyping(ChannelUserTyping {
            id: user,
            channel_id: kanal,
        }),
    ))
}

/// `setAway`: Flag der Verbindung setzen und Status verbreiten
pub async fn handle_set_away<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    away: bool,
) -> SignalingResult<()> {
    let user = verbindung
        .user_id()
        .ok_or_else(|| SignalingError::intern("setAway ohne Bindung"))?;

    let geaendert = verbindung.away_setzen(away);
    tracing::debug!(connection_id = %verbindung.id, user_id = %user, away, geaendert, "Away gesetzt");
    status_verbreiten(state, user).await;
    Ok(())
}

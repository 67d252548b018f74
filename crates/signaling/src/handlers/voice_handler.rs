//! Voice-Handler – Beitritt, Verlassen und Signal-Weiterleitung
//!
//! Pro Benutzer ist hoechstens eine Verbindung autoritativ in Voice. Ein
//! neuer Beitritt verdraengt die bisherige Verbindung, diese bekommt
//! `voiceReset`. Signale werden nur zwischen Benutzern im selben
//! Voice-Kanal weitergeleitet.

use murmur_core::{ChannelId, UserId};
use murmur_db::Store;
use murmur_protocol::inbound::VoiceRtcPayload;
use murmur_protocol::outbound::{ChannelUserSetInVoice, VoiceRtc};
use murmur_protocol::Outbound;
use std::sync::Arc;

use crate::connection::Verbindung;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;
use crate::voice::VoiceEintrag;

fn in_voice(user: UserId, kanal: ChannelId, in_voice: bool) -> Outbound {
    Outbound::ChannelUserSetInVoice(ChannelUserSetInVoice {
        id: user,
        channel_id: kanal,
        in_voice,
    })
}

/// Verarbeitet `voiceStart`
pub async fn handle_voice_start<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Arc<Verbindung>,
    kanal: ChannelId,
) -> SignalingResult<()> {
    let user = verbindung
        .user_id()
        .ok_or_else(|| SignalingError::intern("voiceStart ohne Bindung"))?;

    let mitglied = match state.store.kanal_laden(kanal).await? {
        Some(k) => k.ist_sichtbares_mitglied(user),
        None => false,
    };
    if !mitglied {
        verbindung.senden(&Outbound::VoiceReset);
        return Err(SignalingError::richtlinie(format!(
            "{user} ist kein Mitglied von {kanal}"
        )));
    }

    let vorgaenger = state.voice.setzen(
        user,
        VoiceEintrag {
            verbindung: verbindung.id,
            kanal,
        },
    );
    state.voice_gauge_aktualisieren();

    if let Some(alt) = vorgaenger {
        // Auch bei derselben Verbindung: der Client baut seine Peers neu auf
        if let Some(v) = state.registry.holen(alt.verbindung) {
            v.senden(&Outbound::VoiceReset);
        }
        if alt.kanal == kanal {
            tracing::debug!(user_id = %user, channel_id = %kanal, "Voice-Verbindung uebernommen");
            return Ok(());
        }
    }

    let n = state
        .router
        .an_channel_ausser(kanal, user, &in_voice(user, kanal, true))
        .await;
    tracing::info!(
        connection_id = %verbindung.id,
        user_id = %user,
        channel_id = %kanal,
        empfaenger = n,
        "Voice beigetreten"
    );
    Ok(())
}

/// Verarbeitet `voiceStop`, ebenso den impliziten Austritt beim Abbau
///
/// Ohne autoritativen Eintrag dieser Verbindung passiert nichts.
pub async fn handle_voice_stop<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    user: UserId,
) -> SignalingResult<()> {
    let Some(eintrag) = state.voice.entfernen_wenn(user, verbindung.id) else {
        return Ok(());
    };
    state.voice_gauge_aktualisieren();

    state
        .router
        .an_channel_ausser(eintrag.kanal, user, &in_voice(user, eintrag.kanal, false))
        .await;
    tracing::info!(
        connection_id = %verbindung.id,
        user_id = %user,
        channel_id = %eintrag.kanal,
        "Voice verlassen"
    );
    Ok(())
}

/// Verarbeitet `voiceRtc`
pub fn handle_voice_rtc<S: Store>(
    state: &SignalingState<S>,
    verbindung: &Verbindung,
    payload: VoiceRtcPayload,
) -> SignalingResult<()> {
    let user = verbindung
        .user_id()
        .ok_or_else(|| SignalingError::intern("voiceRtc ohne Bindung"))?;

    let Some(kanal) = state.voice.kanal_von(user, verbindung.id) else {
        return Err(SignalingError::richtlinie("Absender ist nicht in Voice"));
    };
    let ziel = match state.voice.holen(payload.user_id) {
        Some(e) if e.kanal == kanal => e,
        _ => {
            return Err(SignalingError::ziel_veraltet(format!(
                "{} nicht im Voice-Kanal {kanal}",
                payload.user_id
            )))
        }
    };
    let Some(ziel_verbindung) = state.registry.holen(ziel.verbindung) else {
        return Err(SignalingError::ziel_veraltet("Voice-Verbindung bereits getrennt"));
    };

    ziel_verbindung.senden(&Outbound::VoiceRtc(VoiceRtc {
        user_id: user,
        payload: payload.payload,
    }));
    Ok(())
}

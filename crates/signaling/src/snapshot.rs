//! Aufbau des `ready`-Snapshots aus Sicht eines Betrachters
//!
//! Der Snapshot enthaelt die eigene Identitaet, alle Freundschaften (Feld
//! `id` ist immer das Gegenueber), alle Kanaele mit sichtbarer
//! Mitgliedschaft und alle Sessions des Benutzers. Status-Werte sind
//! betrachterbezogen, siehe [`crate::presence`].

use murmur_core::{binaer_kodieren, UserId};
use murmur_db::{BenutzerRecord, KanalRecord, SessionRecord, Store};
use murmur_protocol::ready::{ReadyFriend, ReadySession, ReadyUser};
use murmur_protocol::{KanalEintrag, KanalMitglied, LetzteNachricht, ReadyPayload, PROTO};
use std::collections::HashMap;

use crate::error::{SignalingError, SignalingResult};
use crate::presence::{effektiver_status, status_fuer_betrachter};
use crate::server_state::SignalingState;

/// Baut den kompletten `ready`-Payload
pub async fn ready_bauen<S: Store>(
    state: &SignalingState<S>,
    session: &SessionRecord,
) -> SignalingResult<ReadyPayload> {
    let betrachter = session.user_id;
    let benutzer = state
        .store
        .benutzer_laden(betrachter)
        .await?
        .ok_or_else(|| SignalingError::AuthAbgelehnt(format!("Benutzer {betrachter} unbekannt")))?;

    let freundschaften = state.store.freunde_fuer_user(betrachter).await?;
    let angenommen: HashMap<UserId, bool> = freundschaften
        .iter()
        .map(|f| (f.gegenueber(betrachter), f.accepted))
        .collect();

    let mut friends = Vec::with_capacity(freundschaften.len());
    for f in &freundschaften {
        let gegenueber = f.gegenueber(betrachter);
        let Some(peer) = benutzer_oder_warnung(state, gegenueber).await? else {
            continue;
        };
        let status = status_fuer_betrachter(live_status(state, &peer), f.accepted);
        friends.push(ReadyFriend {
            id: peer.id,
            username: peer.username,
            name: peer.name,
            avatar_id: binaer_kodieren(&peer.avatar_id),
            accepted: f.accepted,
            can_accept: f.kann_annehmen(betrachter),
            status,
        });
    }

    let kanaele = state.store.kanaele_fuer_user(betrachter).await?;
    let mut channels = Vec::with_capacity(kanaele.len());
    for kanal in &kanaele {
        channels.push(eintrag_mit_freunden(state, kanal, betrachter, &angenommen).await?);
    }

    let sessions = state
        .store
        .sessions_fuer_user(betrachter)
        .await?
        .into_iter()
        .map(|s| ReadySession {
            ist_selbst: s.id == session.id,
            id: s.id,
            agent: s.agent,
            ip: s.ip,
            created: s.created,
            last_start: s.last_start,
        })
        .collect();

    Ok(ReadyPayload {
        proto: PROTO,
        user: ready_user(benutzer),
        friends,
        channels,
        sessions,
    })
}

/// Kanal aus Sicht eines Betrachters, auch fuer `channelCreate`
pub async fn kanal_eintrag<S: Store>(
    state: &SignalingState<S>,
    kanal: &KanalRecord,
    betrachter: UserId,
) -> SignalingResult<KanalEintrag> {
    let angenommen: HashMap<UserId, bool> = state
        .store
        .freunde_fuer_user(betrachter)
        .await?
        .iter()
        .map(|f| (f.gegenueber(betrachter), f.accepted))
        .collect();
    eintrag_mit_freunden(state, kanal, betrachter, &angenommen).await
}

async fn eintrag_mit_freunden<S: Store>(
    state: &SignalingState<S>,
    kanal: &KanalRecord,
    betrachter: UserId,
    angenommen: &HashMap<UserId, bool>,
) -> SignalingResult<KanalEintrag> {
    let eigene = kanal.mitglied(betrachter);
    let owner = eigene.is_some_and(|m| m.owner);
    let wasserzeichen = eigene.map(|m| m.added).unwrap_or(i64::MAX);

    let mut users = Vec::with_capacity(kanal.users.len().saturating_sub(1));
    for m in kanal.users.iter().filter(|m| m.id != betrachter) {
        let Some(peer) = benutzer_oder_warnung(state, m.id).await? else {
            continue;
        };
        let freund = angenommen.get(&m.id).copied().unwrap_or(false);
        users.push(KanalMitglied {
            id: peer.id,
            status: status_fuer_betrachter(live_status(state, &peer), freund),
            username: peer.username,
            name: peer.name,
            avatar_id: binaer_kodieren(&peer.avatar_id),
            public_key: binaer_kodieren(&peer.public_key),
            in_voice: !m.hidden && state.voice.ist_in_kanal(m.id, kanal.id),
            hidden: m.hidden,
        });
    }

    let last_message = match state.store.letzte_nachricht(kanal.id, wasserzeichen).await? {
        Some(n) => LetzteNachricht {
            id: n.id.kodieren(),
            user_id: n.user_id.kodieren(),
            body: binaer_kodieren(&n.body),
            key: binaer_kodieren(n.schluessel_fuer(betrachter)),
            typ: n.typ,
            created: n.created,
        },
        None => LetzteNachricht::default(),
    };

    Ok(KanalEintrag {
        id: kanal.id,
        name: kanal.name.clone(),
        avatar_id: binaer_kodieren(&kanal.avatar_id),
        typ: kanal.typ,
        created: kanal.created,
        owner,
        users,
        last_message,
    })
}

fn ready_user(b: BenutzerRecord) -> ReadyUser {
    ReadyUser {
        id: b.id,
        avatar_id: binaer_kodieren(&b.avatar_id),
        username: b.username,
        name: b.name,
        totp_enabled: b.totp_enabled,
        created: b.created,
        auth_key_updated: b.auth_key_updated,
        color_theme: b.color_theme,
        typing_events: b.typing_events,
        want_status: b.want_status,
    }
}

fn live_status<S: Store>(state: &SignalingState<S>, peer: &BenutzerRecord) -> murmur_core::Status {
    effektiver_status(peer.want_status, &state.registry.fuer_user(peer.id))
}

async fn benutzer_oder_warnung<S: Store>(
    state: &SignalingState<S>,
    id: UserId,
) -> SignalingResult<Option<BenutzerRecord>> {
    let benutzer = state.store.benutzer_laden(id).await?;
    if benutzer.is_none() {
        tracing::warn!(user_id = %id, "Referenzierter Benutzer fehlt im Store");
    }
    Ok(benutzer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use murmur_core::{ChannelId, KanalTyp, MessageId, SessionId, Status};
    use murmur_db::{
        FreundRecord, KanalMitgliedRecord, MemoryStore, NachrichtRecord, NachrichtSchluessel,
    };
    use std::sync::Arc;

    fn session(user: UserId) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(),
            user_id: user,
            token: "t".into(),
            agent: "test".into(),
            ip: "127.0.0.1".into(),
            created: 1,
            last_start: 1,
        }
    }

    #[tokio::test]
    async fn snapshot_aus_sicht_des_betrachters() {
        let store = Arc::new(MemoryStore::neu());
        let ich = BenutzerRecord::neu("ich", "Ich", 1);
        let freund = BenutzerRecord::neu("freund", "Freund", 1);
        let anfrage = BenutzerRecord::neu("anfrage", "Anfrage", 1);
        for b in [&ich, &freund, &anfrage] {
            store.benutzer_einfuegen(b.clone());
        }
        store.freundschaft_einfuegen(FreundRecord {
            user1_id: ich.id,
            user2_id: freund.id,
            accepted: true,
            created: 1,
        });
        store.freundschaft_einfuegen(FreundRecord {
            user1_id: anfrage.id,
            user2_id: ich.id,
            accepted: false,
            created: 1,
        });
        let kanal = ChannelId::new();
        store.kanal_einfuegen(KanalRecord {
            id: kanal,
            typ: KanalTyp::Private,
            name: String::new(),
            avatar_id: Vec::new(),
            created: 1,
            users: vec![
                KanalMitgliedRecord { id: ich.id, added: 100, owner: true, hidden: false },
                KanalMitgliedRecord { id: freund.id, added: 1, owner: false, hidden: false },
            ],
        });
        store.nachricht_einfuegen(NachrichtRecord {
            id: MessageId::new(),
            channel_id: kanal,
            user_id: freund.id,
            typ: "text".into(),
            body: b"alt".to_vec(),
            created: 50,
            keys: Vec::new(),
        });
        store.nachricht_einfuegen(NachrichtRecord {
            id: MessageId::new(),
            channel_id: kanal,
            user_id: freund.id,
            typ: "text".into(),
            body: b"neu".to_vec(),
            created: 150,
            keys: vec![NachrichtSchluessel { user_id: ich.id, key: vec![1, 2, 3] }],
        });

        let state = SignalingState::neu(SignalingConfig::default(), store, None);
        let eigene = session(ich.id);
        let ready = ready_bauen(&state, &eigene).await.unwrap();

        assert_eq!(ready.proto, PROTO);
        assert_eq!(ready.user.id, ich.id);
        assert_eq!(ready.friends.len(), 2);
        let offen = ready.friends.iter().find(|f| f.id == anfrage.id).unwrap();
        assert!(offen.can_accept);
        assert!(!offen.accepted);
        let angenommen = ready.friends.iter().find(|f| f.id == freund.id).unwrap();
        assert!(!angenommen.can_accept);
        assert_eq!(angenommen.status, Status::Offline);

        assert_eq!(ready.channels.len(), 1);
        let k = &ready.channels[0];
        assert!(k.owner);
        assert_eq!(k.users.len(), 1, "Betrachter fehlt in der Mitgliederliste");
        assert_eq!(k.users[0].id, freund.id);
        assert_eq!(k.last_message.body, binaer_kodieren(b"neu"));
        assert_eq!(k.last_message.key, binaer_kodieren(&[1, 2, 3]));

        assert!(ready.sessions.is_empty(), "Session liegt nicht im Store");
    }

    #[tokio::test]
    async fn kanal_eintrag_haengt_vom_betrachter_ab() {
        use crate::connection::{test_verbindung, Bindung};
        use crate::voice::VoiceEintrag;
        use murmur_protocol::Outbound;

        let store = Arc::new(MemoryStore::neu());
        let ich = BenutzerRecord::neu("ich", "Ich", 1);
        let freund = BenutzerRecord::neu("freund", "Freund", 1);
        let fremd = BenutzerRecord::neu("fremd", "Fremd", 1);
        for b in [&ich, &freund, &fremd] {
            store.benutzer_einfuegen(b.clone());
        }
        store.freundschaft_einfuegen(FreundRecord {
            user1_id: freund.id,
            user2_id: ich.id,
            accepted: true,
            created: 1,
        });
        let kanal = KanalRecord {
            id: ChannelId::new(),
            typ: KanalTyp::Group,
            name: "runde".into(),
            avatar_id: Vec::new(),
            created: 1,
            users: vec![
                KanalMitgliedRecord { id: ich.id, added: 1, owner: true, hidden: false },
                KanalMitgliedRecord { id: freund.id, added: 1, owner: false, hidden: false },
                KanalMitgliedRecord { id: fremd.id, added: 1, owner: false, hidden: true },
            ],
        };
        let state = SignalingState::neu(SignalingConfig::default(), store, None);

        // freund und fremd sind online, freund ist in Voice
        let mut verbindungen = Vec::new();
        for user in [freund.id, fremd.id] {
            let (v, rx) = test_verbindung(4);
            v.bereit_setzen(
                Bindung { user_id: user, session_id: SessionId::new() },
                Vec::new(),
                false,
                &Outbound::VoiceReset,
            );
            state.registry.registrieren(Arc::clone(&v));
            verbindungen.push((v, rx));
        }
        state.voice.setzen(
            freund.id,
            VoiceEintrag { verbindung: verbindungen[0].0.id, kanal: kanal.id },
        );
        state.voice.setzen(
            fremd.id,
            VoiceEintrag { verbindung: verbindungen[1].0.id, kanal: kanal.id },
        );

        let aus_meiner_sicht = kanal_eintrag(&state, &kanal, ich.id).await.unwrap();
        assert!(aus_meiner_sicht.owner);
        assert_eq!(aus_meiner_sicht.name, "runde");
        assert_eq!(aus_meiner_sicht.users.len(), 2);
        assert!(aus_meiner_sicht.users.iter().all(|m| m.id != ich.id));
        let f = aus_meiner_sicht.users.iter().find(|m| m.id == freund.id).unwrap();
        assert_eq!(f.status, Status::Online);
        assert!(f.in_voice);
        assert!(!f.hidden);
        let x = aus_meiner_sicht.users.iter().find(|m| m.id == fremd.id).unwrap();
        assert_eq!(x.status, Status::Offline, "kein Freund, daher offline");
        assert!(x.hidden);
        assert!(!x.in_voice, "versteckte Mitglieder sind nie in Voice");
        assert_eq!(aus_meiner_sicht.last_message, LetzteNachricht::default());

        let aus_freundes_sicht = kanal_eintrag(&state, &kanal, freund.id).await.unwrap();
        assert!(!aus_freundes_sicht.owner);
        let i = aus_freundes_sicht.users.iter().find(|m| m.id == ich.id).unwrap();
        assert_eq!(i.status, Status::Offline, "keine bereite Verbindung");
        assert!(aus_freundes_sicht.users.iter().all(|m| m.id != freund.id));
    }

    #[tokio::test]
    async fn unbekannter_benutzer_wird_abgelehnt() {
        let state = SignalingState::neu(
            SignalingConfig::default(),
            Arc::new(MemoryStore::neu()),
            None,
        );
        let fehler = ready_bauen(&state, &session(UserId::new())).await.unwrap_err();
        assert!(matches!(fehler, SignalingError::AuthAbgelehnt(_)));
    }
}

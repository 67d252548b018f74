//! Gemeinsame Test-Helfer fuer die Integrationstests des Echtzeit-Kerns
//!
//! Verbindungen werden ohne Socket betrieben: jede `TestVerbindung` haelt
//! die Empfangsseite ihrer Send-Queue und schickt Frames direkt an den
//! echten Dispatcher.

#![allow(dead_code)]

use murmur_core::{ChannelId, KanalTyp, SessionId, UserId};
use murmur_db::{
    BenutzerRecord, FreundRecord, KanalMitgliedRecord, KanalRecord, MemoryStore, SessionRecord,
};
use murmur_observability::MurmurMetrics;
use murmur_signaling::{
    Ausgang, DispatcherContext, MessageDispatcher, SignalingConfig, SignalingResult,
    SignalingState, Verbindung,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Welt {
    pub store: Arc<MemoryStore>,
    pub dispatcher: MessageDispatcher<MemoryStore>,
    pub metriken: MurmurMetrics,
}

impl Welt {
    pub fn neu() -> Self {
        Self::mit_config(SignalingConfig::default())
    }

    pub fn mit_config(config: SignalingConfig) -> Self {
        let store = Arc::new(MemoryStore::neu());
        let metriken = MurmurMetrics::neu().expect("Metriken konnten nicht erstellt werden");
        let state = SignalingState::neu(config, Arc::clone(&store), Some(metriken.clone()));
        Self {
            store,
            dispatcher: MessageDispatcher::neu(Arc::new(state)),
            metriken,
        }
    }

    pub fn state(&self) -> &SignalingState<MemoryStore> {
        self.dispatcher.state()
    }

    /// Legt einen Benutzer mit einer frischen Session an, liefert (id, token)
    pub fn benutzer(&self, name: &str) -> (UserId, String) {
        let benutzer = BenutzerRecord::neu(name, name, 1);
        let id = benutzer.id;
        self.store.benutzer_einfuegen(benutzer);
        (id, self.session(id))
    }

    /// Weitere frische Session fuer einen bestehenden Benutzer
    pub fn session(&self, user: UserId) -> String {
        let session_id = SessionId::new();
        let token = format!("token-{}", session_id.kodieren());
        self.store.session_einfuegen(SessionRecord {
            id: session_id,
            user_id: user,
            token: token.clone(),
            agent: String::new(),
            ip: String::new(),
            created: 1,
            last_start: 1,
        });
        token
    }

    pub fn kanal(&self, typ: KanalTyp, mitglieder: &[(UserId, bool)]) -> ChannelId {
        let id = ChannelId::new();
        self.store.kanal_einfuegen(KanalRecord {
            id,
            typ,
            name: "kanal".into(),
            avatar_id: Vec::new(),
            created: 1,
            users: mitglieder
                .iter()
                .map(|(user, hidden)| KanalMitgliedRecord {
                    id: *user,
                    added: 1,
                    owner: false,
                    hidden: *hidden,
                })
                .collect(),
        });
        id
    }

    pub fn gruppe(&self, mitglieder: &[UserId]) -> ChannelId {
        let liste: Vec<(UserId, bool)> = mitglieder.iter().map(|u| (*u, false)).collect();
        self.kanal(KanalTyp::Group, &liste)
    }

    pub fn freunde(&self, a: UserId, b: UserId, accepted: bool) {
        self.store.freundschaft_einfuegen(FreundRecord {
            user1_id: a,
            user2_id: b,
            accepted,
            created: 1,
        });
    }

    /// Registrierte Verbindung ohne Handshake
    pub fn roh_verbinden(&self) -> TestVerbindung {
        let (tx, rx) = mpsc::channel(256);
        TestVerbindung {
            verbindung: self.state().verbindung_registrieren(tx),
            rx,
            ctx: DispatcherContext {
                agent: "murmur-test".into(),
                ip: "127.0.0.1".into(),
            },
        }
    }

    /// Verbindung mit abgeschlossenem Handshake, Queue geleert
    pub async fn verbinden(&self, token: &str) -> TestVerbindung {
        self.verbinden_mit(serde_json::json!({ "token": token })).await
    }

    pub async fn verbinden_mit(&self, start: Value) -> TestVerbindung {
        let mut client = self.roh_verbinden();
        client
            .senden(self, serde_json::json!({ "t": "start", "d": start }))
            .await
            .expect("Handshake fehlgeschlagen");
        let ready = client.empfangen();
        assert!(
            ready.iter().any(|n| n["t"] == "ready"),
            "kein ready erhalten: {ready:?}"
        );
        client
    }

    pub async fn abbauen(&self, client: &TestVerbindung) {
        self.dispatcher
            .client_cleanup(&client.verbindung, murmur_signaling::AbbauGrund::Geschlossen)
            .await;
    }
}

pub struct TestVerbindung {
    pub verbindung: Arc<Verbindung>,
    pub rx: mpsc::Receiver<Ausgang>,
    pub ctx: DispatcherContext,
}

impl TestVerbindung {
    pub async fn senden(&self, welt: &Welt, nachricht: Value) -> SignalingResult<()> {
        self.senden_text(welt, &nachricht.to_string()).await
    }

    pub async fn senden_text(&self, welt: &Welt, text: &str) -> SignalingResult<()> {
        welt.dispatcher
            .dispatch_text(&self.verbindung, text, &self.ctx)
            .await
    }

    /// Alle bisher eingereihten Text-Frames, Pings werden uebersprungen
    pub fn empfangen(&mut self) -> Vec<Value> {
        let mut nachrichten = Vec::new();
        while let Ok(ausgang) = self.rx.try_recv() {
            if let Some(text) = ausgang.text() {
                nachrichten.push(serde_json::from_str(text).expect("Frame ist kein JSON"));
            }
        }
        nachrichten
    }

    /// Nur Frames mit dem angegebenen Tag
    pub fn empfangen_tag(&mut self, tag: &str) -> Vec<Value> {
        self.empfangen()
            .into_iter()
            .filter(|n| n["t"] == tag)
            .collect()
    }

    pub fn leeren(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

pub fn id_text(id: impl serde::Serialize) -> Value {
    serde_json::to_value(id).expect("ID nicht serialisierbar")
}

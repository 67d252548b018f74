//! Datensatz-Modelle der externen Collaborators
//!
//! Diese Typen sind reine Datenuebertragungsobjekte. Binaere Felder werden
//! in der Seed-Datei als base64url-Strings abgelegt.

use murmur_core::{ChannelId, KanalTyp, MessageId, SessionId, Status, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Identitaets-Snapshot eines Benutzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub name: String,
    #[serde(default, with = "binaer")]
    pub avatar_id: Vec<u8>,
    #[serde(default, with = "binaer")]
    pub public_key: Vec<u8>,
    pub created: i64,
    #[serde(default)]
    pub auth_key_updated: i64,
    #[serde(default)]
    pub totp_enabled: bool,
    #[serde(default)]
    pub color_theme: String,
    #[serde(default)]
    pub typing_events: bool,
    #[serde(default)]
    pub want_status: Status,
}

impl BenutzerRecord {
    /// Minimaler Benutzer mit Standard-Praeferenzen
    pub fn neu(username: impl Into<String>, name: impl Into<String>, created: i64) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            name: name.into(),
            avatar_id: Vec::new(),
            public_key: Vec::new(),
            created,
            auth_key_updated: created,
            totp_enabled: false,
            color_theme: "dark".into(),
            typing_events: true,
            want_status: Status::Online,
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub ip: String,
    pub created: i64,
    pub last_start: i64,
}

/// Ergebnis einer Token-Aufloesung beim Handshake
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAktivierung {
    /// Session nach dem Auffrischen von agent/ip/last_start
    pub session: SessionRecord,
    /// `true` wenn der Token zum ersten Mal gestartet wurde
    pub erstmals: bool,
}

// ---------------------------------------------------------------------------
// Freunde
// ---------------------------------------------------------------------------

/// Freundschaftsbeziehung; `user1_id` hat die Anfrage gestellt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreundRecord {
    pub user1_id: UserId,
    pub user2_id: UserId,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub created: i64,
}

impl FreundRecord {
    /// Gegenueber aus Sicht des Betrachters
    pub fn gegenueber(&self, betrachter: UserId) -> UserId {
        if betrachter == self.user2_id {
            self.user1_id
        } else {
            self.user2_id
        }
    }

    /// Nur der Empfaenger einer offenen Anfrage darf sie annehmen
    pub fn kann_annehmen(&self, betrachter: UserId) -> bool {
        betrachter == self.user2_id && !self.accepted
    }

    pub fn betrifft(&self, a: UserId, b: UserId) -> bool {
        (self.user1_id == a && self.user2_id == b) || (self.user1_id == b && self.user2_id == a)
    }
}

// ---------------------------------------------------------------------------
// Kanaele
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanalMitgliedRecord {
    pub id: UserId,
    /// Beitrittszeitpunkt, Wasserzeichen fuer sichtbare Nachrichten
    #[serde(default)]
    pub added: i64,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub hidden: bool,
}

/// Kanal mit geordneter Mitgliederliste
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanalRecord {
    pub id: ChannelId,
    #[serde(rename = "type", default)]
    pub typ: KanalTyp,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "binaer")]
    pub avatar_id: Vec<u8>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub users: Vec<KanalMitgliedRecord>,
}

impl KanalRecord {
    pub fn mitglied(&self, user: UserId) -> Option<&KanalMitgliedRecord> {
        self.users.iter().find(|m| m.id == user)
    }

    /// Mitglied und nicht versteckt
    pub fn ist_sichtbares_mitglied(&self, user: UserId) -> bool {
        self.mitglied(user).is_some_and(|m| !m.hidden)
    }

    /// Alle nicht versteckten Mitglieder in Listenreihenfolge
    pub fn sichtbare_mitglieder(&self) -> impl Iterator<Item = &KanalMitgliedRecord> {
        self.users.iter().filter(|m| !m.hidden)
    }
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Pro-Empfaenger-Schluessel einer Ende-zu-Ende-verschluesselten Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NachrichtSchluessel {
    pub user_id: UserId,
    #[serde(with = "binaer")]
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default, with = "binaer")]
    pub body: Vec<u8>,
    pub created: i64,
    #[serde(default)]
    pub keys: Vec<NachrichtSchluessel>,
}

impl NachrichtRecord {
    /// Schluessel des Empfaengers, leer wenn keiner existiert
    pub fn schluessel_fuer(&self, user: UserId) -> &[u8] {
        self.keys
            .iter()
            .find(|k| k.user_id == user)
            .map(|k| k.key.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Serde-Helfer
// ---------------------------------------------------------------------------

/// Binaerfelder als base64url-String
mod binaer {
    use murmur_core::{binaer_dekodieren, binaer_kodieren};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&binaer_kodieren(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        binaer_dekodieren(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("kein base64url: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gegenueber_aus_beiden_richtungen() {
        let a = UserId::new();
        let b = UserId::new();
        let f = FreundRecord {
            user1_id: a,
            user2_id: b,
            accepted: false,
            created: 0,
        };
        assert_eq!(f.gegenueber(a), b);
        assert_eq!(f.gegenueber(b), a);
        assert!(f.kann_annehmen(b));
        assert!(!f.kann_annehmen(a), "Anfragender darf nicht selbst annehmen");
        assert!(f.betrifft(b, a));
    }

    #[test]
    fn angenommene_anfrage_nicht_mehr_annehmbar() {
        let f = FreundRecord {
            user1_id: UserId::new(),
            user2_id: UserId::new(),
            accepted: true,
            created: 0,
        };
        assert!(!f.kann_annehmen(f.user2_id));
    }

    #[test]
    fn versteckte_mitglieder_nicht_sichtbar() {
        let sichtbar = UserId::new();
        let versteckt = UserId::new();
        let kanal = KanalRecord {
            id: ChannelId::new(),
            typ: KanalTyp::Group,
            name: "Gruppe".into(),
            avatar_id: vec![],
            created: 0,
            users: vec![
                KanalMitgliedRecord { id: sichtbar, added: 0, owner: true, hidden: false },
                KanalMitgliedRecord { id: versteckt, added: 0, owner: false, hidden: true },
            ],
        };
        assert!(kanal.ist_sichtbares_mitglied(sichtbar));
        assert!(!kanal.ist_sichtbares_mitglied(versteckt));
        assert!(!kanal.ist_sichtbares_mitglied(UserId::new()));
        assert_eq!(kanal.sichtbare_mitglieder().count(), 1);
    }

    #[test]
    fn schluessel_des_empfaengers() {
        let empfaenger = UserId::new();
        let n = NachrichtRecord {
            id: MessageId::new(),
            channel_id: ChannelId::new(),
            user_id: UserId::new(),
            typ: "text".into(),
            body: vec![1],
            created: 5,
            keys: vec![NachrichtSchluessel { user_id: empfaenger, key: vec![9, 9] }],
        };
        assert_eq!(n.schluessel_fuer(empfaenger), &[9, 9]);
        assert!(n.schluessel_fuer(UserId::new()).is_empty());
    }

    #[test]
    fn binaerfelder_als_base64url() {
        let mut b = BenutzerRecord::neu("anna", "Anna", 1);
        b.public_key = vec![0xff, 0xfe];
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["public_key"], "__4");
        assert_eq!(json["avatar_id"], "");
    }
}

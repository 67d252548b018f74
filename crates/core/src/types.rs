//! Gemeinsame Identifikationstypen fuer Murmur
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.
//!
//! ## Wire-Kodierung
//! Auf dem Draht ist jede ID ein ungepaddetes base64url der 16 Roh-Bytes
//! (22 Zeichen). Binaere Felder (Avatar-IDs, Public Keys, Nachrichten) nutzen
//! dieselbe Kodierung; ein leerer String steht fuer "nicht gesetzt".

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::MurmurError;

macro_rules! id_typ {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Erstellt eine neue zufaellige ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Gibt die innere UUID zurueck
            pub fn inner(&self) -> Uuid {
                self.0
            }

            /// Kodiert die ID fuer den Draht (base64url ohne Padding)
            pub fn kodieren(&self) -> String {
                URL_SAFE_NO_PAD.encode(self.0.as_bytes())
            }

            /// Dekodiert eine ID aus ihrer Wire-Form
            pub fn dekodieren(text: &str) -> crate::Result<Self> {
                let bytes = URL_SAFE_NO_PAD
                    .decode(text)
                    .map_err(|_| MurmurError::UngueltigeId(text.to_string()))?;
                let roh: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| MurmurError::UngueltigeId(text.to_string()))?;
                Ok(Self(Uuid::from_bytes(roh)))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.kodieren())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.kodieren())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::dekodieren(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

id_typ!(
    /// Eindeutige Benutzer-ID
    UserId,
    "user"
);

id_typ!(
    /// Eindeutige Kanal-ID (Direkt- oder Gruppenkanal)
    ChannelId,
    "channel"
);

id_typ!(
    /// Eindeutige Session-ID (eine pro Login/Geraet)
    SessionId,
    "session"
);

id_typ!(
    /// Eindeutige ID einer Live-Verbindung (wird bei jedem Upgrade neu vergeben)
    ConnectionId,
    "conn"
);

id_typ!(
    /// Eindeutige Nachrichten-ID
    MessageId,
    "message"
);

// ---------------------------------------------------------------------------
// Status und Kanal-Typ
// ---------------------------------------------------------------------------

/// Praesenz-Status eines Benutzers
///
/// `Invisible` ist nur als gewuenschter Status gueltig und wird nach aussen
/// immer als `Offline` angezeigt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Away,
    Busy,
    Invisible,
    Offline,
}

/// Art eines Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KanalTyp {
    /// Direktnachrichten zwischen genau zwei Benutzern
    #[default]
    Private,
    /// Gruppenkanal mit beliebig vielen Mitgliedern
    Group,
}

/// Kodiert beliebige Binaerdaten fuer den Draht
pub fn binaer_kodieren(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Dekodiert Binaerdaten aus der Wire-Form, `None` bei ungueltiger Eingabe
pub fn binaer_dekodieren(text: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(text).ok()
}

/// Zeitstempel in Millisekunden seit der Unix-Epoche (Wire-Format)
pub fn millis(zeit: DateTime<Utc>) -> i64 {
    zeit.timestamp_millis()
}

/// Aktueller Zeitstempel in Millisekunden
pub fn jetzt_millis() -> i64 {
    millis(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn wire_form_hat_22_zeichen() {
        let id = ChannelId::new();
        let text = id.kodieren();
        assert_eq!(text.len(), 22);
        assert!(!text.contains('='));
        assert_eq!(ChannelId::dekodieren(&text).unwrap(), id);
    }

    #[test]
    fn falsche_laenge_wird_abgelehnt() {
        // 15 Bytes statt 16
        let zu_kurz = binaer_kodieren(&[7u8; 15]);
        assert!(matches!(
            SessionId::dekodieren(&zu_kurz),
            Err(MurmurError::UngueltigeId(_))
        ));
        assert!(SessionId::dekodieren("kein base64!").is_err());
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let uid = UserId(Uuid::nil());
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"AAAAAAAAAAAAAAAAAAAAAA\"");
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }

    #[test]
    fn display_mit_praefix() {
        let id = ConnectionId(Uuid::nil());
        assert!(id.to_string().starts_with("conn:"));
    }

    #[test]
    fn status_kleingeschrieben() {
        assert_eq!(serde_json::to_string(&Status::Invisible).unwrap(), "\"invisible\"");
        let typ: KanalTyp = serde_json::from_str("\"group\"").unwrap();
        assert_eq!(typ, KanalTyp::Group);
    }

    #[test]
    fn binaer_leer_ist_leerer_string() {
        assert_eq!(binaer_kodieren(&[]), "");
        assert_eq!(binaer_dekodieren(""), Some(vec![]));
    }
}

//! murmur-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Murmur-Crates gemeinsam genutzt werden: ID-Newtypes mit ihrer
//! Wire-Kodierung, Zeitstempel-Helfer und den zentralen Fehler-Enum.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{MurmurError, Result};
pub use types::{
    binaer_dekodieren, binaer_kodieren, jetzt_millis, millis, ChannelId, ConnectionId, KanalTyp,
    MessageId, SessionId, Status, UserId,
};

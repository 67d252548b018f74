//! murmur-db – Collaborator-Schnittstellen
//!
//! Dieses Crate stellt das Repository-Pattern bereit, ueber das der
//! Echtzeit-Kern Sessions, Identitaeten, Freundschaften, Kanaele und
//! Nachrichten liest. `MemoryStore` implementiert alle Repositories im
//! Speicher und kann aus einer JSON-Seed-Datei befuellt werden.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

pub use error::{DbError, DbResult};
pub use memory::{MemoryStore, Seed};
pub use models::{
    BenutzerRecord, FreundRecord, KanalMitgliedRecord, KanalRecord, NachrichtRecord,
    NachrichtSchluessel, SessionAktivierung, SessionRecord,
};
pub use repository::{
    ChannelRepository, FriendRepository, MessageRepository, SessionRepository, Store,
    UserRepository,
};

//! murmur-signaling – Echtzeit-Kern
//!
//! Dieser Crate haelt die Live-Verbindungen aller Clients, bindet sie per
//! Handshake an authentifizierte Sessions, verteilt Zustandsaenderungen an
//! die betroffenen Verbindungen und vermittelt Voice- und Chunk-Signale
//! zwischen Peers. Persistenz liegt ausserhalb, der Kern liest nur ueber die
//! Repository-Traits aus `murmur-db`.
//!
//! ## Architektur
//!
//! ```text
//! axum /api/ws (ws_handler)
//!     |
//!     v
//! ws_sitzung (pro Verbindung ein Task + Schreib-Task + Keepalive-Task)
//!     |  State Machine: Verbunden -> Bereit
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- StartHandler    (Handshake, ready-Snapshot)
//!     +-- PresenceHandler (typing, setAway)
//!     +-- SwarmHandler    (Chunk-Index, Chunk-Anfragen, Chunk-Signale)
//!     +-- VoiceHandler    (Beitritt, Verlassen, Voice-Signale)
//!
//! VerbindungsRegistry – alle Live-Verbindungen
//! VoiceTabelle        – autoritative Voice-Verbindung pro Benutzer
//! BroadcastRouter     – Fan-out an Benutzer, Sessions, Kanaele, Verwandte
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod keepalive;
pub mod policy;
pub mod presence;
pub mod registry;
pub mod server_state;
pub mod snapshot;
pub mod voice;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::BroadcastRouter;
pub use connection::{Ausgang, Verbindung};
pub use dispatcher::{AbbauGrund, DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use policy::direktnachricht_erlaubt;
pub use registry::VerbindungsRegistry;
pub use server_state::{SignalingConfig, SignalingState};
pub use voice::VoiceTabelle;
pub use ws::{ws_router, WS_PFAD};

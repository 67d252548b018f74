//! murmur-protocol – Envelope-Codec des Echtzeitprotokolls
//!
//! Jede Nachricht ist ein JSON-Envelope `{"t": <tag>, "d": <payload>}`.
//! Eingehende und ausgehende Tag-Vokabulare sind disjunkt und als
//! Summentypen [`Inbound`] und [`Outbound`] modelliert.

pub mod envelope;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod ready;

pub use envelope::{RohEnvelope, DEFAULT_MAX_FRAME_SIZE, PROTO};
pub use error::{ProtocolError, ProtocolResult};
pub use inbound::Inbound;
pub use outbound::Outbound;
pub use ready::{KanalEintrag, KanalMitglied, LetzteNachricht, ReadyPayload};

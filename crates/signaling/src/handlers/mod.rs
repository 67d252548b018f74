//! Handler fuer alle eingehenden Nachrichten
//!
//! Jeder Handler ist fuer eine Gruppe von Tags zustaendig und hat Zugriff
//! auf den gemeinsamen SignalingState.

pub mod presence_handler;
pub mod start_handler;
pub mod swarm_handler;
pub mod voice_handler;

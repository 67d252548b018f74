//! Fehlertypen fuer den Signaling-Service

use murmur_db::DbError;
use murmur_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Token unbekannt oder leer, die Verbindung bekommt `reset`
    #[error("Handshake abgelehnt: {0}")]
    AuthAbgelehnt(String),

    /// Frame nicht dekodierbar (ungueltiges JSON, unbekannter Tag, Payload)
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtocolError),

    /// Aktion nicht erlaubt (z.B. Voice-Beitritt ohne Mitgliedschaft)
    #[error("Nicht erlaubt: {0}")]
    Richtlinie(String),

    /// Ziel einer Weiterleitung existiert nicht mehr oder passt nicht
    #[error("Ziel veraltet: {0}")]
    ZielVeraltet(String),

    /// Schreiben auf den Transport fehlgeschlagen oder Queue voll
    #[error("Transportfehler: {0}")]
    Transport(String),

    /// Fehler eines externen Collaborators
    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] DbError),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    pub fn richtlinie(msg: impl Into<String>) -> Self {
        Self::Richtlinie(msg.into())
    }

    pub fn ziel_veraltet(msg: impl Into<String>) -> Self {
        Self::ZielVeraltet(msg.into())
    }

    /// Fehler nach denen die Verbindung abgebaut wird
    ///
    /// Alle anderen Fehler verwerfen nur den einzelnen Frame.
    pub fn beendet_verbindung(&self) -> bool {
        matches!(self, Self::AuthAbgelehnt(_) | Self::Transport(_))
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

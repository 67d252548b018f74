//! Fehlertypen fuer Murmur
//!
//! Zentraler Fehler-Enum fuer die gemeinsam genutzten Typen.
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Murmur
pub type Result<T> = std::result::Result<T, MurmurError>;

/// Fehler die crate-uebergreifend auftreten koennen
#[derive(Debug, Error)]
pub enum MurmurError {
    /// ID ist kein base64url-kodierter 16-Byte-Wert
    #[error("Ungueltige ID: {0}")]
    UngueltigeId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = MurmurError::UngueltigeId("xyz".into());
        assert_eq!(e.to_string(), "Ungueltige ID: xyz");
    }
}

//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use murmur_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable mit dem Pfad zur Konfigurationsdatei
pub const ENV_CONFIG: &str = "MURMUR_CONFIG";

/// Standardpfad wenn `MURMUR_CONFIG` nicht gesetzt ist
pub const STANDARD_PFAD: &str = "config.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerEinstellungen,
    pub netzwerk: NetzwerkEinstellungen,
    /// Timeouts und Grenzen des Echtzeit-Kerns
    pub signaling: SignalingConfig,
    pub datenbank: DatenbankEinstellungen,
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename fuer Logs
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Murmur".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer `/api/ws`
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 4000,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// JSON-Datei zum Befuellen des In-Memory-Stores (leer = leerer Store)
    pub seed: Option<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `MURMUR_CONFIG`, sonst `config.toml`
    pub fn pfad_aus_umgebung() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_PFAD.into())
    }

    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Prueft Werte die serde nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !murmur_observability::logging::log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !murmur_observability::logging::log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        if self.signaling.chunk_fanout == 0 {
            anyhow::bail!("signaling.chunk_fanout muss mindestens 1 sein");
        }
        if self.signaling.send_queue == 0 {
            anyhow::bail!("signaling.send_queue muss mindestens 1 sein");
        }
        if self.signaling.keepalive_sek == 0 {
            anyhow::bail!("signaling.keepalive_sek muss mindestens 1 sein");
        }
        if self.signaling.handshake_timeout_sek == 0 {
            anyhow::bail!("signaling.handshake_timeout_sek muss mindestens 1 sein");
        }
        if self.signaling.schreib_timeout_sek == 0 {
            anyhow::bail!("signaling.schreib_timeout_sek muss mindestens 1 sein");
        }
        Ok(())
    }

    /// Bind-Adresse fuer den WebSocket-Endpunkt
    pub fn ws_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.port, 4000);
        assert_eq!(cfg.signaling.chunk_fanout, 5);
        assert_eq!(cfg.signaling.keepalive_sek, 30);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.datenbank.seed.is_none());
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.ws_bind_adresse(), "0.0.0.0:4000");
        assert_eq!(cfg.observability_bind_adresse(), "0.0.0.0:9300");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Testserver"

            [netzwerk]
            port = 4100

            [signaling]
            chunk_fanout = 3
            handshake_timeout_sek = 10

            [datenbank]
            seed = "seed.json"
        "#;
        let cfg = ServerConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.server.name, "Testserver");
        assert_eq!(cfg.netzwerk.port, 4100);
        assert_eq!(cfg.signaling.chunk_fanout, 3);
        assert_eq!(cfg.signaling.handshake_timeout_sek, 10);
        assert_eq!(cfg.datenbank.seed.as_deref(), Some("seed.json"));
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert_eq!(cfg.signaling.keepalive_sek, 30);
        assert!(cfg.observability.aktiviert);
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/murmur.toml").unwrap();
        assert_eq!(cfg.netzwerk.port, 4000);
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.logging.level = "laut".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.signaling.chunk_fanout = 0;
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn null_fristen_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.signaling.handshake_timeout_sek = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.signaling.schreib_timeout_sek = 0;
        assert!(cfg.validieren().is_err());

        let cfg = ServerConfig::aus_toml("[signaling]\nkeepalive_sek = 0").unwrap();
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn kaputtes_toml_ist_fehler() {
        assert!(ServerConfig::aus_toml("[netzwerk]\nport = \"viertausend\"").is_err());
    }
}

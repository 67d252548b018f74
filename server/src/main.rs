//! Murmur Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use murmur_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad = ServerConfig::pfad_aus_umgebung();

    // Standardwerte falls Datei fehlt
    let config = ServerConfig::laden(&config_pfad)?;

    murmur_observability::logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Murmur Server wird initialisiert"
    );

    let server = Server::neu(config)?;
    server
        .starten(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            }
        })
        .await
}

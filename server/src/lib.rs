//! murmur-server – Bibliotheks-Root
//!
//! Baut aus der Konfiguration Store, Metriken und den axum-Router fuer
//! `/api/ws` zusammen. Der Einstiegspunkt in `main.rs` ist nur eine duenne
//! Huelle darum, damit Integrationstests den Server im Prozess starten koennen.

pub mod config;

use anyhow::{Context, Result};
use axum::Router;
use config::ServerConfig;
use murmur_db::MemoryStore;
use murmur_observability::{HealthState, MurmurMetrics};
use murmur_signaling::{ws_router, SignalingState};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    pub state: Arc<SignalingState<MemoryStore>>,
    pub metriken: MurmurMetrics,
    pub health: HealthState,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    ///
    /// Laedt die Seed-Datei, falls konfiguriert.
    pub fn neu(config: ServerConfig) -> Result<Self> {
        config.validieren()?;
        let store = match &config.datenbank.seed {
            Some(pfad) => MemoryStore::aus_datei(pfad)
                .with_context(|| format!("Seed-Datei '{pfad}' konnte nicht geladen werden"))?,
            None => MemoryStore::neu(),
        };
        let metriken = MurmurMetrics::neu()?;
        let health = HealthState::neu(metriken.clone());
        let state = Arc::new(SignalingState::neu(
            config.signaling.clone(),
            Arc::new(store),
            Some(metriken.clone()),
        ));
        Ok(Self {
            config,
            state,
            metriken,
            health,
        })
    }

    /// Router mit allen oeffentlichen Endpunkten
    pub fn router(&self) -> Router {
        ws_router(Arc::clone(&self.state))
    }

    /// Startet alle Server-Subsysteme und laeuft bis `shutdown` endet
    ///
    /// Reihenfolge:
    /// 1. Observability-Server (falls aktiviert)
    /// 2. WebSocket-Listener
    /// 3. Beim Shutdown: Health auf draining, alle Sitzungen beenden
    pub async fn starten(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let ws_addr: SocketAddr = self
            .config
            .ws_bind_adresse()
            .parse()
            .context("Ungueltige Bind-Adresse")?;
        let listener = tokio::net::TcpListener::bind(ws_addr)
            .await
            .with_context(|| format!("Port {ws_addr} konnte nicht gebunden werden"))?;
        self.starten_mit(listener, shutdown).await
    }

    /// Wie `starten`, aber auf einem bereits gebundenen Listener
    pub async fn starten_mit(
        self,
        listener: tokio::net::TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let ende = self.state.shutdown.clone();

        let observability = if self.config.observability.aktiviert {
            let addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            let metriken = self.metriken.clone();
            let health = self.health.clone();
            let token = ende.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = murmur_observability::observability_server_starten(
                    addr,
                    metriken,
                    health,
                    token.cancelled_owned(),
                )
                .await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %listener.local_addr()?,
            chunk_fanout = self.config.signaling.chunk_fanout,
            "Server laeuft"
        );

        let app = self.router();
        let state = Arc::clone(&self.state);
        let health = self.health.clone();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            health.herunterfahren_setzen();
            state.herunterfahren();
        })
        .await?;

        if let Some(task) = observability {
            let _ = task.await;
        }
        tracing::info!("Server beendet");
        Ok(())
    }
}

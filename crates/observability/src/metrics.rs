//! Prometheus-kompatible Metriken fuer den Murmur-Echtzeitkern
//!
//! Registrierte Metriken:
//! - `murmur_connections_active` – Gauge: Aktuell registrierte Verbindungen
//! - `murmur_connections_total` – Counter: Alle angenommenen Verbindungen
//! - `murmur_handshakes_rejected_total` – Counter: Abgelehnte Handshakes
//! - `murmur_frames_dropped_total` – Counter: Verworfene eingehende Frames
//! - `murmur_voice_members_active` – Gauge: Benutzer mit aktiver Voice-Verbindung
//! - `murmur_chunk_requests_total` – Counter: Versendete `fileChunkRequest`

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Murmur-Prometheus-Metriken
///
/// Clone teilt die zugrunde liegenden Zaehler.
#[derive(Clone)]
pub struct MurmurMetrics {
    pub registry: Arc<Registry>,

    // Verbindungen
    pub connections_active: IntGauge,
    pub connections_total: IntCounter,
    pub handshakes_rejected_total: IntCounter,
    pub frames_dropped_total: IntCounter,

    // Voice / Swarm
    pub voice_members_active: IntGauge,
    pub chunk_requests_total: IntCounter,
}

impl MurmurMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connections_active = IntGauge::with_opts(Opts::new(
            "murmur_connections_active",
            "Anzahl aktuell registrierter Verbindungen",
        ))?;
        registry.register(Box::new(connections_active.clone()))?;

        let connections_total = IntCounter::with_opts(Opts::new(
            "murmur_connections_total",
            "Gesamtanzahl angenommener Verbindungen",
        ))?;
        registry.register(Box::new(connections_total.clone()))?;

        let handshakes_rejected_total = IntCounter::with_opts(Opts::new(
            "murmur_handshakes_rejected_total",
            "Handshakes mit ungueltigem Session-Token",
        ))?;
        registry.register(Box::new(handshakes_rejected_total.clone()))?;

        let frames_dropped_total = IntCounter::with_opts(Opts::new(
            "murmur_frames_dropped_total",
            "Verworfene Frames (ungueltiges JSON, unbekannter Tag, falscher Payload)",
        ))?;
        registry.register(Box::new(frames_dropped_total.clone()))?;

        let voice_members_active = IntGauge::with_opts(Opts::new(
            "murmur_voice_members_active",
            "Benutzer mit autoritativer Voice-Verbindung",
        ))?;
        registry.register(Box::new(voice_members_active.clone()))?;

        let chunk_requests_total = IntCounter::with_opts(Opts::new(
            "murmur_chunk_requests_total",
            "An Halter versendete Chunk-Anfragen",
        ))?;
        registry.register(Box::new(chunk_requests_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connections_active,
            connections_total,
            handshakes_rejected_total,
            frames_dropped_total,
            voice_members_active,
            chunk_requests_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: MurmurMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<MurmurMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

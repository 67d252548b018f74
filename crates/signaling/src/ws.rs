//! WebSocket-Transport – Upgrade-Handler und Sitzung pro Verbindung
//!
//! ```text
//! GET /api/ws  --upgrade-->  ws_sitzung
//!                               |
//!      +------------------------+------------------------+
//!      |                        |                        |
//!  Lese-Schleife          Schreib-Task            Keepalive-Task
//!  (Dispatcher)      (leert die Send-Queue)   (Ping, Handshake-Frist)
//! ```
//!
//! Alle drei Teile teilen sich das Abbruch-Token der Verbindung. Der Abbau
//! selbst laeuft nur in der Lese-Schleife.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use murmur_db::Store;
use murmur_protocol::DEFAULT_MAX_FRAME_SIZE;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::connection::{Ausgang, Verbindung};
use crate::dispatcher::{AbbauGrund, DispatcherContext, MessageDispatcher};
use crate::keepalive;
use crate::server_state::SignalingState;

/// Pfad des Echtzeit-Endpunkts
pub const WS_PFAD: &str = "/api/ws";

/// Router mit dem Echtzeit-Endpunkt
///
/// Muss mit `into_make_service_with_connect_info::<SocketAddr>()` betrieben
/// werden, sonst fehlt die Peer-Adresse.
pub fn ws_router<S: Store>(state: Arc<SignalingState<S>>) -> Router {
    Router::new()
        .route(WS_PFAD, get(ws_handler::<S>))
        .with_state(state)
}

/// Upgrade-Handler fuer `GET /api/ws`
pub async fn ws_handler<S: Store>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SignalingState<S>>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ctx = DispatcherContext {
        agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        ip: client_ip(&headers, peer),
    };
    ws.max_message_size(DEFAULT_MAX_FRAME_SIZE)
        .on_upgrade(move |socket| ws_sitzung(socket, state, ctx))
}

/// Erste Adresse aus `X-Forwarded-For`, sonst die Peer-Adresse
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Fuehrt eine WebSocket-Sitzung vom Upgrade bis zum Abbau aus
pub async fn ws_sitzung<S: Store>(
    socket: WebSocket,
    state: Arc<SignalingState<S>>,
    ctx: DispatcherContext,
) {
    let (tx, rx) = mpsc::channel(state.config.send_queue);
    let verbindung = state.verbindung_registrieren(tx);
    tracing::info!(connection_id = %verbindung.id, agent = %ctx.agent, ip = %ctx.ip, "Verbindung angenommen");

    let (ws_tx, mut ws_rx) = socket.split();
    let schreib_timeout = state.config.schreib_timeout();
    let schreiber = tokio::spawn(schreib_schleife(
        ws_tx,
        rx,
        Arc::clone(&verbindung),
        schreib_timeout,
    ));
    let waechter = tokio::spawn(keepalive::ueberwachen(
        Arc::clone(&verbindung),
        state.config.keepalive(),
        state.config.handshake_timeout(),
    ));

    let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
    let grund = loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break AbbauGrund::Shutdown,
            _ = verbindung.abbruch().cancelled() => break AbbauGrund::Transport,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    verbindung.lebendig_markieren();
                    if let Err(e) = dispatcher.dispatch_text(&verbindung, &text, &ctx).await {
                        if e.beendet_verbindung() {
                            break AbbauGrund::from(&e);
                        }
                    }
                }
                Some(Ok(Message::Binary(daten))) => {
                    tracing::debug!(connection_id = %verbindung.id, laenge = daten.len(), "Binaer-Frame verworfen");
                    state.metrik(|m| m.frames_dropped_total.inc());
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => verbindung.lebendig_markieren(),
                Some(Ok(Message::Close(_))) | None => break AbbauGrund::Geschlossen,
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %verbindung.id, fehler = %e, "Lesefehler");
                    break AbbauGrund::Lesefehler;
                }
            }
        }
    };

    // Der Keepalive-Task kennt den genaueren Grund, falls er abgebrochen hat
    verbindung.schliessen();
    let grund = match waechter.await {
        Ok(Some(k)) => k,
        _ => grund,
    };
    dispatcher.client_cleanup(&verbindung, grund).await;

    // Bereits eingereihte Frames (z.B. `reset`) noch zustellen
    if tokio::time::timeout(schreib_timeout, schreiber).await.is_err() {
        tracing::debug!(connection_id = %verbindung.id, "Schreib-Task nach Abbau nicht beendet");
    }
}

type WsSink = SplitSink<WebSocket, Message>;

/// Leert die Send-Queue auf den Transport
///
/// Nach dem Abbruch werden die bereits eingereihten Frames noch geschrieben,
/// danach wird der Transport geschlossen.
async fn schreib_schleife(
    mut ws_tx: WsSink,
    mut rx: mpsc::Receiver<Ausgang>,
    verbindung: Arc<Verbindung>,
    schreib_timeout: Duration,
) {
    loop {
        let ausgang = tokio::select! {
            biased;
            a = rx.recv() => match a {
                Some(a) => a,
                None => break,
            },
            _ = verbindung.abbruch().cancelled() => break,
        };
        if !schreiben(&mut ws_tx, &verbindung, ausgang, schreib_timeout).await {
            return;
        }
    }

    while let Ok(ausgang) = rx.try_recv() {
        if !schreiben(&mut ws_tx, &verbindung, ausgang, schreib_timeout).await {
            return;
        }
    }
    let _ = tokio::time::timeout(schreib_timeout, ws_tx.send(Message::Close(None))).await;
}

/// Schreibt einen Frame, `false` wenn der Transport nicht mehr nutzbar ist
async fn schreiben(
    ws_tx: &mut WsSink,
    verbindung: &Verbindung,
    ausgang: Ausgang,
    schreib_timeout: Duration,
) -> bool {
    let (nachricht, danach_schliessen) = match ausgang {
        Ausgang::Text(t) => (Message::Text(t.to_string()), false),
        Ausgang::Reset(t) => (Message::Text(t.to_string()), true),
        Ausgang::Ping => (Message::Ping(Vec::new()), false),
    };
    match tokio::time::timeout(schreib_timeout, ws_tx.send(nachricht)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(connection_id = %verbindung.id, fehler = %e, "Schreibfehler");
            verbindung.schliessen();
            return false;
        }
        Err(_) => {
            tracing::warn!(connection_id = %verbindung.id, "Schreib-Timeout");
            verbindung.schliessen();
            return false;
        }
    }
    if danach_schliessen {
        let _ = tokio::time::timeout(schreib_timeout, ws_tx.send(Message::Close(None))).await;
        verbindung.schliessen();
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_header_hat_vorrang() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer), "10.0.0.1");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, peer), "203.0.113.9");
    }

    #[test]
    fn leerer_forwarded_header_wird_ignoriert() {
        let peer: SocketAddr = "[::1]:80".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_ip(&headers, peer), "::1");
    }
}

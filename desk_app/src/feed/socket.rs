use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use super::parse::{parse_frame, subscribe_message};
use crate::app::{now_unix, AppEvent, Channel, SocketEvent};
use crate::config::AppConfig;
use crate::debug_hooks;
use crate::error::{DeskError, Result};

const HEARTBEAT: Duration = Duration::from_secs(15);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct FeedEndpoints {
    pub price_url: String,
    pub premium_url: String,
    pub token: Option<String>,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl FeedEndpoints {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let backoff_min = Duration::from_millis(cfg.reconnect_min_ms.max(1));
        Self {
            price_url: cfg.price_ws_url.clone(),
            premium_url: cfg.premium_ws_url.clone(),
            token: cfg.token(),
            backoff_min,
            backoff_max: Duration::from_millis(cfg.reconnect_max_ms).max(backoff_min),
        }
    }
}

/// Why a connection ended.
enum Ended {
    /// Server closed, stream error or heartbeat timeout. Worth another attempt.
    Dropped(String),
    /// The desk dropped its receiver; nobody is listening any more.
    Shutdown,
}

/// Run both socket channels on their own tokio runtime thread.
///
/// The thread exits once `tx`'s receiver is gone, or once both channels have
/// given up after an authentication failure.
pub fn start_socket_feeds(endpoints: FeedEndpoints, tx: Sender<AppEvent>) -> Result<JoinHandle<()>> {
    install_rustls_provider();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("desk-feed")
        .build()?;

    let handle = thread::Builder::new().name("desk-feed-rt".into()).spawn(move || {
        rt.block_on(async move {
            let price = tokio::spawn(run_channel(
                Channel::Price,
                endpoints.price_url.clone(),
                endpoints.clone(),
                tx.clone(),
            ));
            let premium = tokio::spawn(run_channel(
                Channel::Premium,
                endpoints.premium_url.clone(),
                endpoints,
                tx,
            ));
            let _ = tokio::join!(price, premium);
        });
    })?;
    Ok(handle)
}

fn install_rustls_provider() {
    // A second install fails harmlessly when a provider is already present.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

async fn run_channel(channel: Channel, url: String, endpoints: FeedEndpoints, tx: Sender<AppEvent>) {
    let name = channel.as_str();
    debug_hooks::log_socket_start(name, &url);
    let mut backoff = endpoints.backoff_min;

    loop {
        let connected_at = Instant::now();
        let reason = match connect_and_stream(channel, &url, endpoints.token.as_deref(), &tx).await {
            Ok(Ended::Shutdown) => return,
            Ok(Ended::Dropped(reason)) => reason,
            Err(DeskError::Unauthorized(detail)) => {
                debug_hooks::log_socket_auth_failed(name, &detail);
                let _ = tx.send(AppEvent::Socket(SocketEvent::AuthFailed { channel, detail }));
                return;
            }
            Err(err) => err.to_string(),
        };

        // A connection that stayed up for a while starts the backoff over.
        if connected_at.elapsed() > endpoints.backoff_max {
            backoff = endpoints.backoff_min;
        }
        debug_hooks::log_socket_dropped(name, &reason, backoff.as_millis() as u64);
        if tx
            .send(AppEvent::Socket(SocketEvent::Disconnected { channel, reason }))
            .is_err()
        {
            return;
        }
        sleep(backoff).await;
        backoff = next_backoff(backoff, endpoints.backoff_max);
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

async fn connect_and_stream(
    channel: Channel,
    url: &str,
    token: Option<&str>,
    tx: &Sender<AppEvent>,
) -> Result<Ended> {
    let mut request = url.into_client_request()?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| DeskError::Invalid(format!("auth token: {e}")))?;
        request.headers_mut().insert("Authorization", value);
    }

    let (mut ws, _) = connect_async(request).await?;
    debug_hooks::log_socket_connected(channel.as_str());
    if tx.send(AppEvent::Socket(SocketEvent::Connected { channel })).is_err() {
        return Ok(Ended::Shutdown);
    }
    ws.send(Message::Text(subscribe_message(channel))).await?;

    let mut hb = tokio::time::interval(HEARTBEAT);
    let mut last_pong = Instant::now();
    loop {
        tokio::select! {
            _ = hb.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    return Ok(Ended::Dropped("pong timeout".into()));
                }
                ws.send(Message::Ping(Vec::new())).await?;
            }
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(txt))) => {
                        if !forward_frame(channel, &txt, tx) {
                            return Ok(Ended::Shutdown);
                        }
                    }
                    Some(Ok(Message::Binary(bin))) => match std::str::from_utf8(&bin) {
                        Ok(txt) => {
                            if !forward_frame(channel, txt, tx) {
                                return Ok(Ended::Shutdown);
                            }
                        }
                        Err(e) => debug_hooks::log_frame_parse_error(
                            channel.as_str(),
                            &format!("<{} binary bytes>", bin.len()),
                            &e.to_string(),
                        ),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        ws.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Pong(_))) => last_pong = Instant::now(),
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| format!("closed by server: {} {}", f.code, f.reason))
                            .unwrap_or_else(|| "closed by server".to_string());
                        return Ok(Ended::Dropped(reason));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Ok(Ended::Dropped(e.to_string())),
                    None => return Ok(Ended::Dropped("stream ended".into())),
                }
            }
        }
    }
}

/// Parse and forward one frame. Returns false once the receiver is gone.
fn forward_frame(channel: Channel, txt: &str, tx: &Sender<AppEvent>) -> bool {
    match parse_frame(channel, txt) {
        Ok(frame) => match frame.into_feed_event(now_unix()) {
            Some(ev) => tx.send(AppEvent::Feed(ev)).is_ok(),
            None => true,
        },
        Err(err) => {
            debug_hooks::log_frame_parse_error(channel.as_str(), txt, &err.to_string());
            true
        }
    }
}

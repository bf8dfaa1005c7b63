use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{IndexPriceTick, InstanceId};
use crate::premium::Rejection;

pub fn log_socket_start(channel: &str, url: &str) {
    tracing::info!(target: "socket.status", channel, url, "starting socket task");
}

pub fn log_socket_connected(channel: &str) {
    tracing::info!(target: "socket.status", channel, "connected");
}

pub fn log_socket_dropped(channel: &str, reason: &str, backoff_ms: u64) {
    tracing::warn!(target: "socket.status", channel, reason, backoff_ms, "connection dropped; reconnecting");
}

pub fn log_socket_auth_failed(channel: &str, detail: &str) {
    tracing::error!(target: "socket.status", channel, detail, "authentication failed");
}

pub fn log_frame_parse_error(channel: &str, frame: &str, err: &str) {
    let sample = head(frame, 300);
    tracing::warn!(target: "feed.parse", channel, err, "unparsed frame: {sample}");
}

pub fn log_price_ingest(tick: &IndexPriceTick, changed: bool) {
    static COUNT: AtomicU64 = AtomicU64::new(0);
    let n = COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    if n <= 10 || n % 100 == 0 {
        tracing::debug!(
            target: "feed.price",
            n,
            id = tick.id,
            name = %tick.name,
            price = tick.price,
            changed,
            "price tick"
        );
    }
}

pub fn log_premium_ingest(snapshots: usize, results: usize, skipped_samples: usize) {
    static COUNT: AtomicU64 = AtomicU64::new(0);
    let n = COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    if n <= 10 || n % 50 == 0 {
        tracing::debug!(target: "feed.premium", n, snapshots, results, skipped_samples, "premium batch");
    }
}

pub fn log_premium_reject(rejection: &Rejection) {
    tracing::warn!(
        target: "premium.reject",
        id = %rejection.id,
        reason = %rejection.reason,
        "snapshot skipped"
    );
}

pub fn log_mtm_skip(id: &InstanceId) {
    tracing::warn!(target: "feed.mtm.skip", id = %id, "mtm update without a finite value");
}

pub fn log_exec(label: &str, ok: bool, detail: &str) {
    if ok {
        tracing::info!(target: "desk.exec", label, detail, "request done");
    } else {
        tracing::warn!(target: "desk.exec", label, detail, "request failed");
    }
}

pub fn log_candle_reset(reason: &str) {
    tracing::debug!(target: "candle.reset", reason, "candles reset");
}

fn head(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

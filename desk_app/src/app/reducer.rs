use super::event::*;
use super::state::*;
use crate::debug_hooks;
use crate::notify::Level;
use crate::premium::lowest_combined_premiums;

/// Apply one event to the store. Returns true if anything a view reads has changed.
pub fn reduce(state: &mut AppState, ev: AppEvent) -> bool {
    match ev {
        AppEvent::Feed(f) => reduce_feed(state, f),
        AppEvent::Socket(s) => reduce_socket(state, s),
        AppEvent::Exec(x) => reduce_exec(state, x),
        AppEvent::Timer(t) => reduce_timer(state, t),
    }
}

fn reduce_feed(state: &mut AppState, ev: FeedEvent) -> bool {
    match ev {
        FeedEvent::IndexPrice { ts_unix, tick } => {
            if !tick.price.is_finite() {
                debug_hooks::log_frame_parse_error(
                    Channel::Price.as_str(),
                    &format!("{tick:?}"),
                    "non-finite price",
                );
                return false;
            }
            let (id, price) = (tick.id, tick.price);
            let upsert = state.upsert_index_price(tick);
            if let Some(stored) = state.index_price(id) {
                debug_hooks::log_price_ingest(stored, upsert.changed());
            }
            if !upsert.changed() {
                return false;
            }
            state.candles.on_tick(id, ts_unix, price);
            true
        }
        FeedEvent::Premium { ts_unix: _, snapshots } => {
            let reduction = lowest_combined_premiums(&snapshots, &state.premium_policy);
            debug_hooks::log_premium_ingest(
                snapshots.len(),
                reduction.results.len(),
                reduction.skipped_samples,
            );
            for rejection in &reduction.rejected {
                debug_hooks::log_premium_reject(rejection);
            }

            let mut changed = false;
            for result in reduction.results {
                if state.upsert_lowest_value(result.id, result.lowest_value).changed() {
                    changed = true;
                }
            }
            for snap in snapshots {
                if state.premium_snapshots.get(&snap.id) != Some(&snap) {
                    state.premium_snapshots.insert(snap.id.clone(), snap);
                    changed = true;
                }
            }
            changed
        }
        FeedEvent::Mtm { ts_unix, updates } => {
            let mut changed = false;
            for update in updates {
                match update.mtm.filter(|v| v.is_finite()) {
                    Some(v) => {
                        state.mtm.record(update.id, ts_unix, v);
                        changed = true;
                    }
                    None => debug_hooks::log_mtm_skip(&update.id),
                }
            }
            changed
        }
    }
}

fn reduce_socket(state: &mut AppState, ev: SocketEvent) -> bool {
    let now = now_unix();
    match ev {
        SocketEvent::Connected { channel } => {
            let prev = state.channels.insert(channel, ChannelStatus::Connected);
            if prev == Some(ChannelStatus::Connected) {
                return false;
            }
            state
                .notifications
                .push(now, Level::Info, format!("{} feed connected", channel.as_str()));
            true
        }
        SocketEvent::Disconnected { channel, reason } => {
            let status = ChannelStatus::Disconnected { reason: reason.clone() };
            if state.channels.get(&channel) == Some(&status) {
                return false;
            }
            state.channels.insert(channel, status);
            state.notifications.push(
                now,
                Level::Error,
                format!("{} feed disconnected: {reason}", channel.as_str()),
            );
            true
        }
        SocketEvent::AuthFailed { channel, detail } => {
            state.channels.insert(channel, ChannelStatus::AuthFailed);
            state.notifications.push(
                now,
                Level::Error,
                format!("{} feed authentication failed: {detail}", channel.as_str()),
            );
            true
        }
    }
}

fn reduce_exec(state: &mut AppState, ev: ExecEvent) -> bool {
    let now = now_unix();
    match ev {
        ExecEvent::InstancesLoaded { instances } => {
            state.status_message = format!("Loaded {} instances.", instances.len());
            state.instances = instances;
            true
        }
        ExecEvent::TradesLoaded { instance, legs } => {
            if !state.set_legs(&instance, legs) {
                state.status_message = format!("Trades for unknown instance {instance} ignored.");
            }
            true
        }
        ExecEvent::TradeUpserted { label, leg } => {
            let instance = leg.instance_id.clone();
            if state.upsert_leg(leg) {
                state.notifications.push(now, Level::Success, label);
            } else {
                state.notifications.push(
                    now,
                    Level::Info,
                    format!("{label}: instance {instance} not loaded"),
                );
            }
            true
        }
        ExecEvent::TradeDeleted { instance, trade_id } => {
            state.remove_leg(&instance, &trade_id);
            state
                .notifications
                .push(now, Level::Success, format!("deleted trade {trade_id}"));
            true
        }
        ExecEvent::Done { label, message } => {
            state
                .notifications
                .push(now, Level::Success, format!("{label}: {message}"));
            true
        }
        ExecEvent::Failed { label, message, unauthorized } => {
            if unauthorized {
                state.status_message = "Backend rejected credentials.".to_string();
            }
            state
                .notifications
                .push(now, Level::Error, format!("{label} failed: {message}"));
            true
        }
    }
}

fn reduce_timer(state: &mut AppState, ev: TimerEvent) -> bool {
    match ev {
        TimerEvent::Tick1s { now_unix } => {
            let mut changed = false;
            let new_time = format_time_basic(now_unix);
            if state.current_time != new_time {
                state.current_time = new_time;
                changed = true;
            }
            if state.notifications.expire(now_unix) {
                changed = true;
            }
            changed
        }
    }
}

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::app::{Channel, FeedEvent};
use crate::debug_hooks;
use crate::error::{DeskError, Result};
use crate::model::{IndexPriceTick, InstancePremiumSnapshot, MtmUpdate};

pub const EVENT_INDEX_PRICE: &str = "indexPrice";
pub const EVENT_OPTION_PREMIUM: &str = "optionPremium";
pub const EVENT_MTM: &str = "mtm";

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Price(IndexPriceTick),
    Premium(Vec<InstancePremiumSnapshot>),
    Mtm(Vec<MtmUpdate>),
    /// Acks, pongs and events this desk does not consume.
    Ignored(String),
}

impl Frame {
    pub fn into_feed_event(self, ts_unix: u64) -> Option<FeedEvent> {
        match self {
            Frame::Price(tick) => Some(FeedEvent::IndexPrice { ts_unix, tick }),
            Frame::Premium(snapshots) => Some(FeedEvent::Premium { ts_unix, snapshots }),
            Frame::Mtm(updates) => Some(FeedEvent::Mtm { ts_unix, updates }),
            Frame::Ignored(_) => None,
        }
    }
}

/// Subscribe message sent right after the handshake.
pub fn subscribe_message(channel: Channel) -> String {
    let events: &[&str] = match channel {
        Channel::Price => &[EVENT_INDEX_PRICE],
        Channel::Premium => &[EVENT_OPTION_PREMIUM, EVENT_MTM],
    };
    serde_json::json!({ "event": "subscribe", "data": { "events": events } }).to_string()
}

/// Decode one text frame received on `channel`.
///
/// Frames are normally `{"event": .., "data": ..}`. A payload without the
/// envelope is accepted and interpreted by the channel it arrived on.
pub fn parse_frame(channel: Channel, txt: &str) -> Result<Frame> {
    let v: Value = serde_json::from_str(txt)?;

    let (event, data) = match &v {
        Value::Object(obj) if obj.contains_key("event") => {
            let event = obj
                .get("event")
                .and_then(Value::as_str)
                .ok_or_else(|| DeskError::Decode("event name is not a string".into()))?;
            (Some(event.to_string()), obj.get("data").cloned().unwrap_or(Value::Null))
        }
        _ => (None, v),
    };

    match (channel, event.as_deref()) {
        (_, Some(EVENT_INDEX_PRICE)) | (Channel::Price, None) => {
            Ok(Frame::Price(decode(EVENT_INDEX_PRICE, data)?))
        }
        (_, Some(EVENT_OPTION_PREMIUM)) => Ok(Frame::Premium(one_or_many(channel, EVENT_OPTION_PREMIUM, data)?)),
        (_, Some(EVENT_MTM)) => Ok(Frame::Mtm(one_or_many(channel, EVENT_MTM, data)?)),
        (Channel::Premium, None) => Ok(Frame::Premium(one_or_many(channel, EVENT_OPTION_PREMIUM, data)?)),
        (_, Some(other)) => Ok(Frame::Ignored(other.to_string())),
    }
}

fn decode<T: DeserializeOwned>(event: &str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| DeskError::Decode(format!("{event}: {e}")))
}

/// Batch payloads decode element by element; a malformed element is logged and
/// left out so the rest of the batch still lands.
fn one_or_many<T: DeserializeOwned>(channel: Channel, event: &str, data: Value) -> Result<Vec<T>> {
    match data {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match T::deserialize(&item) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug_hooks::log_frame_parse_error(
                        channel.as_str(),
                        &item.to_string(),
                        &format!("{event}: {e}"),
                    );
                    None
                }
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![decode(event, other)?]),
    }
}

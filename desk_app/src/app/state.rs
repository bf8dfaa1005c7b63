use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};

use super::event::Channel;
use crate::candle_agg::CandleBook;
use crate::config::{AppConfig, LowestValueUpsert};
use crate::model::{IndexPriceTick, Instance, InstanceId, InstancePremiumSnapshot, TradeLeg};
use crate::mtm::MtmBook;
use crate::notify::Notifications;
use crate::premium::PremiumPolicy;

/// Result of a keyed store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

impl Upsert {
    pub fn changed(self) -> bool {
        !matches!(self, Upsert::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Disconnected { reason: String },
    AuthFailed,
}

impl ChannelStatus {
    pub fn label(&self) -> String {
        match self {
            ChannelStatus::Connecting => "connecting".to_string(),
            ChannelStatus::Connected => "live".to_string(),
            ChannelStatus::Disconnected { reason } => format!("down ({reason})"),
            ChannelStatus::AuthFailed => "auth failed".to_string(),
        }
    }
}

/// The desk's in-memory store. Owned by the runtime, mutated only through the reducer.
#[derive(Debug, Clone)]
pub struct AppState {
    index_prices: Vec<IndexPriceTick>,
    lowest_values: HashMap<InstanceId, f64>,
    pub premium_snapshots: HashMap<InstanceId, InstancePremiumSnapshot>,

    pub instances: Vec<Instance>,
    pub mtm: MtmBook,
    pub candles: CandleBook,
    pub notifications: Notifications,
    pub channels: HashMap<Channel, ChannelStatus>,

    pub premium_policy: PremiumPolicy,
    pub lowest_value_upsert: LowestValueUpsert,

    pub current_time: String,
    pub status_message: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AppState {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            index_prices: Vec::new(),
            lowest_values: HashMap::new(),
            premium_snapshots: HashMap::new(),

            instances: Vec::new(),
            mtm: MtmBook::new(cfg.mtm_history_len),
            candles: CandleBook::new(cfg.candle_tf_secs, cfg.candle_window_minutes),
            notifications: Notifications::new(cfg.notification_ttl_secs),
            channels: [
                (Channel::Price, ChannelStatus::Connecting),
                (Channel::Premium, ChannelStatus::Connecting),
            ]
            .into(),

            premium_policy: cfg.premium_policy,
            lowest_value_upsert: cfg.lowest_value_upsert,

            current_time: String::new(),
            status_message: String::new(),
        }
    }

    // ---- price ticks -------------------------------------------------------

    pub fn index_prices(&self) -> &[IndexPriceTick] {
        &self.index_prices
    }

    pub fn index_price(&self, id: u64) -> Option<&IndexPriceTick> {
        self.index_prices.iter().find(|t| t.id == id)
    }

    /// At most one entry per instrument id. An equal price leaves the store untouched;
    /// a different price replaces only the price.
    pub fn upsert_index_price(&mut self, tick: IndexPriceTick) -> Upsert {
        match self.index_prices.iter().position(|t| t.id == tick.id) {
            None => {
                self.index_prices.push(tick);
                Upsert::Inserted
            }
            Some(i) if self.index_prices[i].price == tick.price => Upsert::Unchanged,
            Some(i) => {
                self.index_prices[i].price = tick.price;
                Upsert::Updated
            }
        }
    }

    // ---- lowest combined premium -------------------------------------------

    pub fn lowest_values(&self) -> &HashMap<InstanceId, f64> {
        &self.lowest_values
    }

    pub fn lowest_value(&self, id: &InstanceId) -> Option<f64> {
        self.lowest_values.get(id).copied()
    }

    /// Last write wins. Under [`LowestValueUpsert::SkipUnchanged`] an equal value is a no-op.
    pub fn upsert_lowest_value(&mut self, id: InstanceId, value: f64) -> Upsert {
        let skip_equal = self.lowest_value_upsert == LowestValueUpsert::SkipUnchanged;
        match self.lowest_values.insert(id, value) {
            None => Upsert::Inserted,
            Some(prev) if skip_equal && prev == value => Upsert::Unchanged,
            Some(_) => Upsert::Updated,
        }
    }

    // ---- instances / legs --------------------------------------------------

    pub fn instance(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances.iter().find(|i| &i.id == id)
    }

    pub fn set_legs(&mut self, id: &InstanceId, legs: Vec<TradeLeg>) -> bool {
        match self.instances.iter_mut().find(|i| &i.id == id) {
            Some(inst) => {
                inst.legs = legs;
                true
            }
            None => false,
        }
    }

    pub fn upsert_leg(&mut self, leg: TradeLeg) -> bool {
        let Some(inst) = self.instances.iter_mut().find(|i| i.id == leg.instance_id) else {
            return false;
        };
        match inst.legs.iter_mut().find(|l| l.id == leg.id) {
            Some(existing) => *existing = leg,
            None => inst.legs.push(leg),
        }
        true
    }

    pub fn remove_leg(&mut self, id: &InstanceId, trade_id: &str) -> bool {
        let Some(inst) = self.instances.iter_mut().find(|i| &i.id == id) else {
            return false;
        };
        let before = inst.legs.len();
        inst.legs.retain(|l| l.id != trade_id);
        before != inst.legs.len()
    }

    pub fn channel_status(&self, channel: Channel) -> ChannelStatus {
        self.channels
            .get(&channel)
            .cloned()
            .unwrap_or(ChannelStatus::Connecting)
    }
}

/// unix seconds
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn format_time_basic(now: u64) -> String {
    Local
        .timestamp_opt(now as i64, 0)
        .single()
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| format!("unix:{now}"))
}

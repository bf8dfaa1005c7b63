use crate::model::{IndexPriceTick, Instance, InstanceId, InstancePremiumSnapshot, MtmUpdate, TradeLeg};

#[derive(Debug, Clone)]
pub enum AppEvent {
    Feed(FeedEvent),
    Socket(SocketEvent),
    Exec(ExecEvent),
    Timer(TimerEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Price,
    Premium,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Price => "price",
            Channel::Premium => "premium",
        }
    }
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    IndexPrice { ts_unix: u64, tick: IndexPriceTick },
    Premium { ts_unix: u64, snapshots: Vec<InstancePremiumSnapshot> },
    Mtm { ts_unix: u64, updates: Vec<MtmUpdate> },
}

#[derive(Debug, Clone)]
pub enum SocketEvent {
    Connected { channel: Channel },
    Disconnected { channel: Channel, reason: String },
    AuthFailed { channel: Channel, detail: String },
}

#[derive(Debug, Clone)]
pub enum ExecEvent {
    InstancesLoaded { instances: Vec<Instance> },
    TradesLoaded { instance: InstanceId, legs: Vec<TradeLeg> },
    TradeUpserted { label: String, leg: TradeLeg },
    TradeDeleted { instance: InstanceId, trade_id: String },
    Done { label: String, message: String },
    Failed { label: String, message: String, unauthorized: bool },
}

#[derive(Debug, Clone)]
pub enum TimerEvent {
    Tick1s { now_unix: u64 },
}

use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::app::{now_unix, AppEvent, Channel, FeedEvent, SocketEvent};
use crate::model::{IndexPriceTick, InstanceId, InstancePremiumSnapshot, MtmUpdate, PremiumSample, SpreadSample};

const STEP: Duration = Duration::from_millis(250);

struct DummyIndex {
    id: u64,
    name: &'static str,
    price: f64,
    step: f64,
}

/// Offline generator for both channels.
pub struct DummyMarket {
    rng: StdRng,
    n: u64,
    indices: Vec<DummyIndex>,
    instances: Vec<InstanceId>,
}

impl DummyMarket {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            n: 0,
            indices: vec![
                DummyIndex { id: 256265, name: "NIFTY 50", price: 24_300.0, step: 2.5 },
                DummyIndex { id: 260105, name: "NIFTY BANK", price: 51_800.0, step: 5.0 },
            ],
            instances: vec![InstanceId::new("1"), InstanceId::new("2")],
        }
    }

    /// One step of the walk: a tick per index, and every other step the premium side.
    pub fn step(&mut self, ts_unix: u64) -> Vec<FeedEvent> {
        self.n += 1;
        let n = self.n;
        let mut out = Vec::new();

        for idx in self.indices.iter_mut() {
            if n % 17 == 0 {
                idx.step = -idx.step;
            }
            // Leave some ticks flat so the unchanged-price path gets exercised.
            if n % 3 != 0 {
                idx.price = (idx.price + idx.step).max(10.0);
            }
            out.push(FeedEvent::IndexPrice {
                ts_unix,
                tick: IndexPriceTick {
                    id: idx.id,
                    name: idx.name.to_string(),
                    segment: "INDICES".to_string(),
                    price: idx.price,
                },
            });
        }

        if n % 2 == 0 {
            let spot = self.indices[0].price;
            let snapshots = self
                .instances
                .iter()
                .map(|id| premium_snapshot(&mut self.rng, id, spot))
                .collect();
            out.push(FeedEvent::Premium { ts_unix, snapshots });

            let updates = self
                .instances
                .iter()
                .map(|id| MtmUpdate { id: id.clone(), mtm: Some(self.rng.gen_range(-2_500.0..2_500.0_f64).round()) })
                .collect();
            out.push(FeedEvent::Mtm { ts_unix, updates });
        }
        out
    }
}

fn premium_snapshot(rng: &mut StdRng, id: &InstanceId, spot: f64) -> InstancePremiumSnapshot {
    let atm = (spot / 50.0).round() * 50.0;
    let mut snap = InstancePremiumSnapshot::new(id.as_str(), Vec::new());
    for k in -2..=2 {
        let strike = atm + 50.0 * k as f64;
        let distance = (strike - spot).abs();
        let combined = 180.0 + distance * 0.6 + rng.gen_range(-3.0..3.0);
        let name = format!("{strike:.0}");
        snap.combined_premium_array.push(PremiumSample::new(name.clone(), (combined * 100.0).round() / 100.0));
        snap.spread_premium_array.push(SpreadSample {
            name,
            spread_premium: Some(rng.gen_range(0.5..4.0_f64)),
        });
    }
    snap
}

pub fn start_dummy_feed(tx: Sender<AppEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        for channel in [Channel::Price, Channel::Premium] {
            if tx.send(AppEvent::Socket(SocketEvent::Connected { channel })).is_err() {
                return;
            }
        }
        let mut market = DummyMarket::new(7);
        loop {
            thread::sleep(STEP);
            for ev in market.step(now_unix()) {
                if tx.send(AppEvent::Feed(ev)).is_err() {
                    return;
                }
            }
        }
    })
}

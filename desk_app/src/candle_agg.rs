use std::collections::{HashMap, VecDeque};

use crate::model::InstrumentId;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub t: u64, // bucket start (unix seconds)
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub ticks: u32,
}

impl Candle {
    fn opened_at(t: u64, price: f64) -> Self {
        Self { t, open: price, high: price, low: price, close: price, ticks: 1 }
    }

    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Time-bucketed OHLC for a single instrument.
#[derive(Debug, Clone)]
pub struct CandleAgg {
    tf_secs: u64,
    window_minutes: u64,
    candles: VecDeque<Candle>,
    cur: Option<Candle>,
}

impl CandleAgg {
    pub fn new(tf_secs: u64, window_minutes: u64) -> Self {
        Self {
            tf_secs: tf_secs.max(1),
            window_minutes: window_minutes.max(1),
            candles: VecDeque::new(),
            cur: None,
        }
    }

    pub fn tf(&self) -> u64 {
        self.tf_secs
    }

    pub fn set_tf(&mut self, tf_secs: u64) {
        self.tf_secs = tf_secs.max(1);
        self.candles.clear();
        self.cur = None;
    }

    pub fn set_window_minutes(&mut self, window_minutes: u64) {
        self.window_minutes = window_minutes.max(1);
        self.trim_to_window();
    }

    fn bucket_start(&self, ts: u64) -> u64 {
        ts - (ts % self.tf_secs)
    }

    fn max_closed(&self) -> usize {
        (self.window_minutes * 60 / self.tf_secs).max(10) as usize
    }

    fn trim_to_window(&mut self) {
        let max = self.max_closed();
        while self.candles.len() > max {
            self.candles.pop_front();
        }
    }

    /// Feed one price sample. Samples older than the open bucket are dropped.
    pub fn on_tick(&mut self, ts: u64, price: f64) -> bool {
        if !price.is_finite() {
            return false;
        }
        let start = self.bucket_start(ts);

        match self.cur.as_mut() {
            None => {
                self.cur = Some(Candle::opened_at(start, price));
                true
            }
            Some(c) if c.t == start => {
                c.high = c.high.max(price);
                c.low = c.low.min(price);
                c.close = price;
                c.ticks += 1;
                true
            }
            Some(c) if start < c.t => false,
            Some(prev) => {
                let finished = std::mem::replace(prev, Candle::opened_at(start, price));
                self.candles.push_back(finished);
                self.trim_to_window();
                true
            }
        }
    }

    pub fn snapshot(&self) -> Vec<Candle> {
        let mut out: Vec<Candle> = self.candles.iter().cloned().collect();
        if let Some(cur) = &self.cur {
            out.push(cur.clone());
        }
        out
    }

    pub fn last(&self) -> Option<&Candle> {
        self.cur.as_ref().or_else(|| self.candles.back())
    }
}

/// One aggregator per index instrument.
#[derive(Debug, Clone)]
pub struct CandleBook {
    tf_secs: u64,
    window_minutes: u64,
    series: HashMap<InstrumentId, CandleAgg>,
}

impl CandleBook {
    pub fn new(tf_secs: u64, window_minutes: u64) -> Self {
        Self { tf_secs: tf_secs.max(1), window_minutes: window_minutes.max(1), series: HashMap::new() }
    }

    pub fn on_tick(&mut self, id: InstrumentId, ts: u64, price: f64) -> bool {
        let (tf, window) = (self.tf_secs, self.window_minutes);
        self.series
            .entry(id)
            .or_insert_with(|| CandleAgg::new(tf, window))
            .on_tick(ts, price)
    }

    pub fn set_tf(&mut self, tf_secs: u64) {
        self.tf_secs = tf_secs.max(1);
        crate::debug_hooks::log_candle_reset("timeframe changed; dropping cached candles");
        for agg in self.series.values_mut() {
            agg.set_tf(self.tf_secs);
        }
    }

    pub fn set_window_minutes(&mut self, window_minutes: u64) {
        self.window_minutes = window_minutes.max(1);
        for agg in self.series.values_mut() {
            agg.set_window_minutes(self.window_minutes);
        }
    }

    pub fn get(&self, id: InstrumentId) -> Option<&CandleAgg> {
        self.series.get(&id)
    }
}

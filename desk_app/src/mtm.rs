use std::collections::{HashMap, VecDeque};

use crate::model::InstanceId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MtmPoint {
    pub ts_unix: u64,
    pub value: f64,
}

/// Bounded MTM history for one instance, plus the session extremes.
#[derive(Debug, Clone)]
pub struct MtmSeries {
    points: VecDeque<MtmPoint>,
    cap: usize,
    high: f64,
    low: f64,
}

impl MtmSeries {
    pub fn new(cap: usize) -> Self {
        Self { points: VecDeque::new(), cap: cap.max(1), high: f64::MIN, low: f64::MAX }
    }

    pub fn push(&mut self, ts_unix: u64, value: f64) {
        self.points.push_back(MtmPoint { ts_unix, value });
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
        self.high = self.high.max(value);
        self.low = self.low.min(value);
    }

    pub fn latest(&self) -> Option<f64> {
        self.points.back().map(|p| p.value)
    }

    /// Session high/low, including points already trimmed from history.
    pub fn range(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            None
        } else {
            Some((self.low, self.high))
        }
    }

    pub fn points(&self) -> impl Iterator<Item = &MtmPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MtmBook {
    cap: usize,
    series: HashMap<InstanceId, MtmSeries>,
}

impl MtmBook {
    pub fn new(cap: usize) -> Self {
        Self { cap, series: HashMap::new() }
    }

    pub fn record(&mut self, id: InstanceId, ts_unix: u64, value: f64) {
        let cap = self.cap;
        self.series.entry(id).or_insert_with(|| MtmSeries::new(cap)).push(ts_unix, value);
    }

    pub fn get(&self, id: &InstanceId) -> Option<&MtmSeries> {
        self.series.get(id)
    }

    /// Sum of the latest MTM across every instance.
    pub fn total(&self) -> f64 {
        self.series.values().filter_map(MtmSeries::latest).sum()
    }
}

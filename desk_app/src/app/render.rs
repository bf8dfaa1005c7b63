use std::fmt::Write as _;

use super::event::Channel;
use super::state::*;
use crate::candle_agg::Candle;
use crate::model::{Instance, Side};
use crate::notify::Level;

const MAX_CONDENSED_POINTS: usize = 120;
const CHART_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub name: String,
    pub segment: String,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRow {
    pub id: String,
    pub name: String,
    pub expiry: String,
    pub legs: String,
    pub lowest_premium: String,
    pub mtm: String,
    pub mtm_range: String,
    pub is_loss: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToastRow {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub clock: String,
    pub price_feed: String,
    pub premium_feed: String,
    pub status: String,
    pub prices: Vec<PriceRow>,
    pub instances: Vec<InstanceRow>,
    pub total_mtm: String,
    /// Latest candles of the first index on the board.
    pub chart: Vec<String>,
    pub toasts: Vec<ToastRow>,
}

pub fn build_view(state: &AppState) -> DashboardView {
    let prices = state
        .index_prices()
        .iter()
        .map(|t| PriceRow {
            name: t.name.clone(),
            segment: t.segment.clone(),
            price: format!("{:.2}", t.price),
        })
        .collect();

    // Instances from the backend first, then anything only the premium feed has seen.
    let mut instances: Vec<InstanceRow> = state.instances.iter().map(|i| instance_row(state, i)).collect();
    let mut orphans: Vec<_> = state
        .lowest_values()
        .keys()
        .filter(|id| state.instance(id).is_none())
        .cloned()
        .collect();
    orphans.sort();
    for id in orphans {
        let stub = Instance {
            id: id.clone(),
            name: id.to_string(),
            underlying: String::new(),
            expiry: String::new(),
            ltp_range: None,
            legs: Vec::new(),
        };
        instances.push(instance_row(state, &stub));
    }

    DashboardView {
        clock: state.current_time.clone(),
        price_feed: state.channel_status(Channel::Price).label(),
        premium_feed: state.channel_status(Channel::Premium).label(),
        status: state.status_message.clone(),
        prices,
        instances,
        total_mtm: format!("{:.2}", state.mtm.total()),
        chart: state
            .index_prices()
            .first()
            .map(|t| {
                let rows = candle_rows(state, t.id);
                rows[rows.len().saturating_sub(CHART_ROWS)..].to_vec()
            })
            .unwrap_or_default(),
        toasts: state
            .notifications
            .iter()
            .map(|n| ToastRow { level: n.level, message: n.message.clone() })
            .collect(),
    }
}

fn instance_row(state: &AppState, inst: &Instance) -> InstanceRow {
    let legs = inst
        .legs
        .iter()
        .map(|l| {
            let sign = if l.side == Side::Buy { "+" } else { "-" };
            format!("{sign}{}x{}{}", l.quantity, l.strike, l.option_type.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ");
    let series = state.mtm.get(&inst.id);
    let latest = series.and_then(|s| s.latest());
    InstanceRow {
        id: inst.id.to_string(),
        name: inst.name.clone(),
        expiry: inst.expiry.clone(),
        legs,
        lowest_premium: state
            .lowest_value(&inst.id)
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string()),
        mtm: latest.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string()),
        mtm_range: series
            .and_then(|s| s.range())
            .map(|(lo, hi)| format!("{lo:.0}..{hi:.0}"))
            .unwrap_or_default(),
        is_loss: latest.map(|v| v < 0.0).unwrap_or(false),
    }
}

/// Merge adjacent candles so at most `max_points` remain.
pub fn condense_candles(candles: &[Candle], max_points: usize) -> Vec<Candle> {
    if candles.is_empty() || max_points == 0 || candles.len() <= max_points {
        return candles.to_vec();
    }

    let group = candles.len().div_ceil(max_points);
    let mut out = Vec::with_capacity(candles.len().div_ceil(group));
    for chunk in candles.chunks(group) {
        let first = &chunk[0];
        let last = &chunk[chunk.len() - 1];
        let mut high = f64::NEG_INFINITY;
        let mut low = f64::INFINITY;
        let mut ticks = 0;
        for c in chunk {
            high = high.max(c.high);
            low = low.min(c.low);
            ticks += c.ticks;
        }
        out.push(Candle { t: first.t, open: first.open, high, low, close: last.close, ticks });
    }
    out
}

/// Chart rows for one instrument, newest last.
pub fn candle_rows(state: &AppState, instrument: u64) -> Vec<String> {
    let Some(agg) = state.candles.get(instrument) else {
        return Vec::new();
    };
    condense_candles(&agg.snapshot(), MAX_CONDENSED_POINTS)
        .iter()
        .map(|c| {
            format!(
                "{} {} O {:.2} H {:.2} L {:.2} C {:.2}",
                format_time_basic(c.t),
                if c.is_up() { "▲" } else { "▼" },
                c.open,
                c.high,
                c.low,
                c.close
            )
        })
        .collect()
}

pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] price:{} premium:{} {}",
        view.clock, view.price_feed, view.premium_feed, view.status
    );
    for p in &view.prices {
        let _ = writeln!(out, "  {:<16} {:<10} {:>12}", p.name, p.segment, p.price);
    }
    if !view.instances.is_empty() {
        let _ = writeln!(
            out,
            "  {:<8} {:<22} {:<12} {:>10} {:>12}  legs",
            "id", "instance", "expiry", "low prem", "mtm"
        );
    }
    for r in &view.instances {
        let _ = writeln!(
            out,
            "  {:<8} {:<22} {:<12} {:>10} {:>12}{} {}",
            r.id,
            r.name,
            r.expiry,
            r.lowest_premium,
            r.mtm,
            if r.is_loss { "!" } else { " " },
            r.legs
        );
    }
    let _ = writeln!(out, "  total mtm {}", view.total_mtm);
    for row in &view.chart {
        let _ = writeln!(out, "  {row}");
    }
    for t in &view.toasts {
        let _ = writeln!(out, "  ({}) {}", t.level.as_str(), t.message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::reducer::reduce;
    use crate::app::{AppEvent, FeedEvent};
    use crate::model::*;

    #[test]
    fn view_shows_lowest_premium_for_unlisted_instance() {
        let mut s = AppState::default();
        reduce(
            &mut s,
            AppEvent::Feed(FeedEvent::Premium {
                ts_unix: 0,
                snapshots: vec![InstancePremiumSnapshot::new(
                    "A",
                    vec![PremiumSample::new("S1", 12.5), PremiumSample::new("S2", 9.25)],
                )],
            }),
        );
        reduce(
            &mut s,
            AppEvent::Feed(FeedEvent::Mtm {
                ts_unix: 0,
                updates: vec![MtmUpdate { id: InstanceId::new("A"), mtm: Some(-300.0) }],
            }),
        );
        let view = build_view(&s);
        assert_eq!(view.instances.len(), 1);
        assert_eq!(view.instances[0].lowest_premium, "9.25");
        assert_eq!(view.instances[0].mtm, "-300.00");
        assert!(view.instances[0].is_loss);
        assert_eq!(view.total_mtm, "-300.00");
        assert!(render_text(&view).contains("9.25"));
        assert!(view.chart.is_empty());
    }

    #[test]
    fn chart_follows_first_index() {
        let mut s = AppState::default();
        for (ts, px) in [(0, 100.0), (30, 104.0), (60, 99.0), (120, 101.0)] {
            reduce(
                &mut s,
                AppEvent::Feed(FeedEvent::IndexPrice {
                    ts_unix: ts,
                    tick: IndexPriceTick { id: 9, name: "NIFTY 50".into(), segment: "INDICES".into(), price: px },
                }),
            );
        }
        let view = build_view(&s);
        assert_eq!(view.chart.len(), 3);
        assert!(view.chart[0].contains("H 104.00"));
        assert!(render_text(&view).contains("C 101.00"));
    }

    #[test]
    fn condense_merges_groups() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| Candle {
                t: i * 60,
                open: i as f64,
                high: i as f64 + 1.0,
                low: i as f64 - 1.0,
                close: i as f64 + 0.5,
                ticks: 1,
            })
            .collect();
        let out = condense_candles(&candles, 5);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], Candle { t: 0, open: 0.0, high: 2.0, low: -1.0, close: 1.5, ticks: 2 });
    }
}

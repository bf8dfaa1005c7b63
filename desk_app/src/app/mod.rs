pub mod event;
pub mod reducer;
pub mod render;
pub mod state;

pub use event::*;
pub use state::*;

use crate::config::AppConfig;

/// Owns the store and decides when a redraw is due.
pub struct AppRuntime {
    pub state: AppState,
    dirty: bool,
    last_tick_unix: u64,
}

impl AppRuntime {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            state: AppState::from_config(cfg),
            dirty: true,
            last_tick_unix: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn handle_event(&mut self, ev: AppEvent) {
        if reducer::reduce(&mut self.state, ev) {
            self.dirty = true;
        }
    }

    pub fn tick_if_needed(&mut self) {
        self.tick_at(now_unix());
    }

    fn tick_at(&mut self, now: u64) {
        if now != self.last_tick_unix {
            self.last_tick_unix = now;
            self.handle_event(AppEvent::Timer(TimerEvent::Tick1s { now_unix: now }));
        }
    }

    /// Text frame for the current store, or `None` when nothing changed since the last one.
    pub fn render_if_dirty(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(render::render_text(&render::build_view(&self.state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndexPriceTick;

    fn price(id: u64, price: f64) -> AppEvent {
        AppEvent::Feed(FeedEvent::IndexPrice {
            ts_unix: 0,
            tick: IndexPriceTick { id, name: "NIFTY 50".into(), segment: "INDICES".into(), price },
        })
    }

    #[test]
    fn unchanged_tick_does_not_request_redraw() {
        let mut rt = AppRuntime::new(&AppConfig::default());
        rt.handle_event(price(1, 100.0));
        assert!(rt.render_if_dirty().is_some());
        assert!(rt.render_if_dirty().is_none());

        rt.handle_event(price(1, 100.0));
        assert!(!rt.is_dirty());

        rt.handle_event(price(1, 100.5));
        let frame = rt.render_if_dirty().unwrap();
        assert!(frame.contains("100.50"));
    }

    #[test]
    fn timer_fires_once_per_second() {
        let mut rt = AppRuntime::new(&AppConfig::default());
        rt.render_if_dirty();
        rt.tick_at(1_700_000_000);
        assert!(rt.render_if_dirty().is_some());
        rt.tick_at(1_700_000_000);
        assert!(rt.render_if_dirty().is_none());
    }
}

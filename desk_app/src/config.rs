use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::premium::PremiumPolicy;

/// Bump when you change config schema.
const CONFIG_VERSION: u32 = 1;

/// Whether the lowest-value store skips writes that would not change the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LowestValueUpsert {
    /// Every derived value is written, changed or not.
    #[default]
    Overwrite,
    /// Same guard as the price store: equal values are a no-op.
    SkipUnchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,

    // --- backend ---
    pub rest_base_url: String,
    pub rest_timeout_ms: u64,
    pub auth_token: String,

    // --- sockets ---
    pub price_ws_url: String,
    pub premium_ws_url: String,
    pub use_dummy_feed: bool,
    pub reconnect_min_ms: u64,
    pub reconnect_max_ms: u64,

    // --- derivation ---
    pub premium_policy: PremiumPolicy,
    pub lowest_value_upsert: LowestValueUpsert,

    // --- view ---
    pub candle_tf_secs: u64,
    pub candle_window_minutes: u64,
    pub mtm_history_len: usize,
    pub notification_ttl_secs: u64,
    pub render_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,

            rest_base_url: "http://127.0.0.1:8000/api".to_string(),
            rest_timeout_ms: 5_000,
            auth_token: String::new(),

            price_ws_url: "ws://127.0.0.1:8000/ws/index-price".to_string(),
            premium_ws_url: "ws://127.0.0.1:8000/ws/option-premium".to_string(),
            use_dummy_feed: false,
            reconnect_min_ms: 1_000,
            reconnect_max_ms: 30_000,

            premium_policy: PremiumPolicy::default(),
            lowest_value_upsert: LowestValueUpsert::default(),

            candle_tf_secs: 60,
            candle_window_minutes: 120,
            mtm_history_len: 2_000,
            notification_ttl_secs: 6,
            render_interval_ms: 500,
        }
    }
}

impl AppConfig {
    /// Load from `path` (or the default location) and apply `DESK_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let mut cfg = if path.exists() {
            match read_json::<AppConfig>(&path) {
                Ok(mut cfg) => {
                    // simple migration hook
                    if cfg.version == 0 {
                        cfg.version = CONFIG_VERSION;
                    }
                    cfg
                }
                Err(err) => {
                    archive_corrupt(&path, &err);
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok((cfg, path))
    }

    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("DESK_REST_URL") {
            self.rest_base_url = v;
        }
        if let Some(v) = get("DESK_PRICE_WS_URL") {
            self.price_ws_url = v;
        }
        if let Some(v) = get("DESK_PREMIUM_WS_URL") {
            self.premium_ws_url = v;
        }
        if let Some(v) = get("DESK_AUTH_TOKEN") {
            self.auth_token = v;
        }
        if let Some(v) = get("DESK_DUMMY_FEED") {
            self.use_dummy_feed = v != "0" && !v.eq_ignore_ascii_case("false");
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("config path has no parent")?;
        fs::create_dir_all(parent).with_context(|| format!("create config dir {:?}", parent))?;
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    pub fn token(&self) -> Option<String> {
        let t = self.auth_token.trim();
        (!t.is_empty()).then(|| t.to_string())
    }
}

fn default_config_path() -> Result<PathBuf> {
    let proj =
        ProjectDirs::from("com", "desk", "desk_app").context("ProjectDirs::from returned None")?;
    Ok(proj.config_dir().join("config.json"))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {:?}", path))?;
    let value = serde_json::from_slice::<T>(&bytes).with_context(|| "parse json")?;
    Ok(value)
}

fn archive_corrupt(path: &Path, err: &anyhow::Error) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let archived = path.with_extension(format!("corrupt.{ts}.json"));
    let _ = fs::rename(path, &archived);
    tracing::warn!(target: "config", ?archived, "config corrupt; archived. error: {err:?}");
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().context("no parent dir for config path")?;
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    {
        let mut f = fs::File::create(&tmp).with_context(|| format!("create tmp {:?}", tmp))?;
        f.write_all(bytes).with_context(|| "write tmp")?;
        let _ = f.sync_all();
    }

    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

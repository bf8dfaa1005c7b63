use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use desk_app::app::AppRuntime;
use desk_app::config::AppConfig;
use desk_app::feed::{self, FeedEndpoints};
use desk_app::rest::DeskClient;
use desk_app::trade_desk::{follow_up, spawn_command, DeskCommand};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli_path = std::env::args().nth(1).map(PathBuf::from);
    let (cfg, cfg_path) = AppConfig::load(cli_path.as_deref())?;
    if !cfg_path.exists() {
        if let Err(err) = cfg.save(&cfg_path) {
            tracing::warn!(path = %cfg_path.display(), "could not write default config: {err:#}");
        }
    }
    tracing::info!(
        path = %cfg_path.display(),
        rest = %cfg.rest_base_url,
        dummy = cfg.use_dummy_feed,
        "desk starting"
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("install ctrl-c handler")?;
    }

    let (tx, rx) = mpsc::channel();

    let _feed = if cfg.use_dummy_feed {
        feed::start_dummy_feed(tx.clone())
    } else {
        feed::start_socket_feeds(FeedEndpoints::from_config(&cfg), tx.clone())
            .context("start socket feeds")?
    };

    let client = DeskClient::new(
        &cfg.rest_base_url,
        cfg.token(),
        Duration::from_millis(cfg.rest_timeout_ms),
    )
    .context("build REST client")?;
    if !cfg.use_dummy_feed {
        spawn_command(tx.clone(), client.clone(), DeskCommand::LoadInstances);
    }

    let mut runtime = AppRuntime::new(&cfg);
    let render_every = Duration::from_millis(cfg.render_interval_ms.max(50));
    let mut last_render: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(ev) => {
                let mut next = Some(ev);
                // drain whatever queued up behind it
                while let Some(ev) = next.take().or_else(|| rx.try_recv().ok()) {
                    for cmd in follow_up(&ev) {
                        spawn_command(tx.clone(), client.clone(), cmd);
                    }
                    runtime.handle_event(ev);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!("all feeds stopped");
                break;
            }
        }

        runtime.tick_if_needed();
        if last_render.map_or(true, |t| t.elapsed() >= render_every) {
            if let Some(frame) = runtime.render_if_dirty() {
                print!("\x1b[2J\x1b[H{frame}");
            }
            last_render = Some(Instant::now());
        }
    }

    tracing::info!("desk stopped");
    Ok(())
}

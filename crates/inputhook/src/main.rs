//! `inputhook-monitor`: prints every global input event until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()              -- [hook] and [monitor] sections
//!  └─ HookEngine::start()        -- X11 RECORD provider, worker thread
//!       └─ listener              -- log line or JSON line per event
//!  └─ ctrl_c().await
//!  └─ HookEngine::stop()
//! ```

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use inputhook::infrastructure::storage::config::{self, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = config::load_config();

    // Level is overridden by `RUST_LOG`.
    let level = loaded
        .as_ref()
        .map(|cfg| cfg.monitor.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = loaded.context("failed to load configuration")?;
    info!(delivery = ?config.hook.delivery, "inputhook monitor starting");

    run(config).await
}

#[cfg(target_os = "linux")]
async fn run(config: AppConfig) -> anyhow::Result<()> {
    use std::sync::Arc;

    use inputhook::infrastructure::record::x11::X11RecordProvider;
    use inputhook::{HookEngine, Listener, ListenerError};
    use inputhook_core::NativeEvent;

    let listener: Arc<dyn Listener> = if config.monitor.json {
        Arc::new(|event: &NativeEvent| -> Result<(), ListenerError> {
            let line = serde_json::to_string(event)
                .map_err(|e| ListenerError::with_source("failed to encode event", e))?;
            println!("{line}");
            Ok(())
        })
    } else {
        Arc::new(|event: &NativeEvent| -> Result<(), ListenerError> {
            info!(kind = ?event.kind, time_ms = event.time_ms, modifiers = event.modifiers.0, payload = ?event.payload, "event");
            Ok(())
        })
    };

    let provider = X11RecordProvider::new(config.hook.delivery_mode());
    let engine = HookEngine::new(provider, listener, config.hook.engine_settings());
    engine.start().context("failed to start input hook")?;
    info!("capturing input.  Press Ctrl-C to exit.");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    engine.stop().context("failed to stop input hook")?;
    info!("inputhook monitor stopped");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(_config: AppConfig) -> anyhow::Result<()> {
    anyhow::bail!("no input hook backend is available on this platform (X11 RECORD requires Linux)")
}

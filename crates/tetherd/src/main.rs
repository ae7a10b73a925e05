//! Tether device agent daemon.
//!
//! Reconciles the device's lock state against the operator's commands,
//! enforces kiosk policy through the platform device-owner surface, and
//! reports outcomes to the backend.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tetherd::backend::HttpBackend;
use tetherd::config::AgentConfig;
use tetherd::context::AgentContext;
use tetherd::control;
use tetherd::events::EventHandler;
use tetherd::platform::{HostAdmin, HostLocation, HostSurface};
use tetherd::store::StateStore;
use tether_common::BootMirror;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("tetherd v{} starting", tether_common::VERSION);

    let config = AgentConfig::load();

    // Boot fast path: the boot broadcast runs under a strict time budget,
    // so the recovery decision is read synchronously before any async
    // store work.
    let mirror = BootMirror::load_sync(&StateStore::boot_mirror_path(&config.data_dir));
    if mirror.is_locked {
        info!("Boot mirror reports a locked device; enforcement will be re-driven");
    }

    let credential = None; // provisioned installs read this from enrollment
    let backend = Arc::new(HttpBackend::new(&config, credential)?);
    let ctx = AgentContext::new(
        config,
        Arc::new(HostAdmin),
        Arc::new(HostSurface),
        Arc::new(HostLocation),
        backend,
    );

    // Boot trigger: re-derive enforcement purely from persisted state.
    ctx.handler.on_boot().await;

    spawn_periodic_tasks(&ctx);

    let server_ctx = Arc::clone(&ctx);
    tokio::spawn(async move {
        if let Err(e) = control::start_server(server_ctx).await {
            tracing::error!("Control server failed: {}", e);
        }
    });

    info!("tetherd ready");
    wait_for_shutdown().await;

    ctx.scheduler.shutdown();
    let _ = std::fs::remove_file(&ctx.config.socket_path);
    info!("Shutting down gracefully");
    Ok(())
}

fn spawn_periodic_tasks(ctx: &Arc<AgentContext>) {
    let handler = Arc::clone(&ctx.handler);
    ctx.scheduler.schedule(
        "monitor",
        Duration::from_secs(ctx.config.monitor_interval_secs),
        move || {
            let handler = Arc::clone(&handler);
            async move { handler.on_monitor_tick().await }
        },
    );

    let handler = Arc::clone(&ctx.handler);
    ctx.scheduler.schedule(
        "compliance-sync",
        Duration::from_secs(ctx.config.compliance_interval_secs),
        move || {
            let handler = Arc::clone(&handler);
            async move { handler.compliance_sync().await }
        },
    );

    let locator = Arc::clone(&ctx.locator);
    ctx.scheduler.schedule(
        "location",
        Duration::from_secs(ctx.config.location_interval_secs),
        move || {
            let locator = Arc::clone(&locator);
            async move { locator.locate_now() }
        },
    );
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("sigterm handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

//! meshd - support backend for the RustDesk device mesh
//!
//! Proxies logins to the identity service and lets support staff list,
//! group, register and remove their Android devices.

use anyhow::{Context, Result};
use meshd::config::Config;
use meshd::logging::DebugLog;
use meshd::server::{self, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, source) = Config::load().context("Failed to load configuration")?;

    let debug_log = DebugLog::open(&config.logging);
    debug_log.install().context("Failed to install logging")?;

    info!("meshd v{} starting", mesh_shared::VERSION);
    source.log();
    config.validate().context("Invalid configuration")?;
    info!(supabase = ?config.supabase, bind = %config.server.bind, "configuration loaded");

    let state = AppState::new(config, debug_log).context("Failed to build upstream client")?;
    server::run(state).await
}

use std::io;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use tracing::{error, info};

use crate::server::reactor::ShutdownHandle;

/// Watches for SIGINT and SIGTERM on a background thread and stops the
/// server when one arrives.
pub fn spawn(handle: ShutdownHandle) -> anyhow::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    thread::Builder::new()
        .name("liso-signal".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(e) = wait_for_signal().await {
                    error!(error = %e, "Failed to listen for shutdown signals");
                    return;
                }
                info!("Shutdown signal received");
                handle.shutdown();
            })
        })
        .context("spawning signal thread")
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

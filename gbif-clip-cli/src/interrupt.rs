//! Termination signals mapped onto fetch cancellation.
//!
//! The listener owns a single-threaded Tokio runtime on a detached thread.
//! Cancellation stays cooperative: a request already in flight completes (or
//! hits `--timeout-secs`) before the pipeline observes the flag.

use std::future::Future;
use std::thread::{self, JoinHandle};

use gbif_clip_core::CancelFlag;
use log::info;
use tokio::runtime::Builder;

use crate::CliError;

/// Cancel `flag` on Ctrl-C, or on SIGINT/SIGTERM under Unix.
pub(crate) fn cancel_on_interrupt(flag: CancelFlag) -> Result<(), CliError> {
    spawn_canceller(flag, wait_for_signal()).map(drop)
}

/// Cancel `flag` once `trigger` resolves.
pub(crate) fn spawn_canceller<F>(flag: CancelFlag, trigger: F) -> Result<JoinHandle<()>, CliError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::InterruptHandler)?;
    thread::Builder::new()
        .name("gbif-clip-interrupt".to_owned())
        .spawn(move || {
            runtime.block_on(trigger);
            flag.cancel();
        })
        .map_err(CliError::InterruptHandler)
}

#[cfg(unix)]
async fn wait_for_signal() {
    use log::warn;
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM; cancelling"),
                _ = sigint.recv() => info!("received SIGINT; cancelling"),
            }
        }
        (Err(err), _) | (_, Err(err)) => {
            warn!("could not register signal handlers ({err}); falling back to Ctrl-C");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C; cancelling"),
        Err(err) => {
            log::error!("failed to listen for Ctrl-C: {err}");
            // Without a listener the run can no longer be interrupted.
            std::future::pending::<()>().await;
        }
    }
}

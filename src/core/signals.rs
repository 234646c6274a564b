//! # Termination signals.
//!
//! Used by [`RunHandle::stop_on_signal`](crate::RunHandle::stop_on_signal) to turn
//! an operator's Ctrl-C into a run stop.
//!
//! - Unix: `SIGINT`, `SIGTERM`, `SIGQUIT` and Ctrl-C
//! - elsewhere: Ctrl-C

/// Completes on the first termination signal.
///
/// # Errors
/// Fails if a signal handler cannot be registered.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
        _ = quit.recv() => {},
    }
    Ok(())
}

/// Completes on the first termination signal.
///
/// # Errors
/// Fails if the Ctrl-C handler cannot be registered.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

//! # Host termination signals.
//!
//! [`wait_for_termination`] completes when the process is asked to stop and names the
//! signal, so `Supervisor::run_until_signal` can log what triggered the shutdown.
//!
//! - **Unix**: `SIGINT`, `SIGTERM` (systemd, Kubernetes), `SIGQUIT`
//! - **Other platforms**: Ctrl-C

/// Waits for a termination signal and returns its name.
///
/// Returns `Err` if a signal listener cannot be registered.
#[cfg(unix)]
pub(crate) async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

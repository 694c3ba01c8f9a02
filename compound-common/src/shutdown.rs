use owo_colors::OwoColorize;

/// Resolves once SIGINT or SIGTERM is received.
pub async fn shutdown_signal() {
    // Listen for both SIGINT (Ctrl+C) and SIGTERM (orchestrator-issued).
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv()  => eprintln!("{}", "🛑 received SIGINT".red()),
            _ = sigterm.recv() => eprintln!("{}", "🛑 received SIGTERM".red()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("install Ctrl+C handler");
    }
}

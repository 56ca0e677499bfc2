//! Minimal pulse service: start, answer `/health`, drain on Ctrl-C.
//!
//! Run with:
//!   cargo run --example basic
//!   curl -i localhost:8080/health

use std::time::Duration;

use pulse::{Config, HealthService};

#[tokio::main]
async fn main() -> Result<(), pulse::Error> {
    tracing_subscriber::fmt::init();

    let config = Config::new(
        "0.0.0.0:8080",
        Duration::from_secs(3),            // lameduck drain on shutdown
        vec!["example.org".to_string()],   // resolved on every poll
    )?;

    let mut service = HealthService::new(config);
    service.on_start()?;

    shutdown_signal().await;

    // The endpoint keeps answering 200 for 3s while upstream load balancers
    // drain traffic away, then the listener closes.
    service.on_final_shutdown().await
}

/// Resolves on the first shutdown signal the process receives: SIGTERM or
/// SIGINT on Unix, Ctrl-C elsewhere.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}

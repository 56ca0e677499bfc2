//! Lifecycle controller.
//!
//! # Lameduck draining and load balancers
//!
//! A load balancer that polls `/health` needs time to notice a node is going
//! away. Killing the listener the instant the process is told to exit turns
//! every in-flight poll into a connection error and every not-yet-rerouted
//! request into a 502 upstream. The lameduck window fixes that: on **final
//! shutdown** the service keeps answering normally for the configured
//! duration — looking alive and healthy — while the balancer drains traffic,
//! and only then tears down.
//!
//! **Reload** is the opposite case: the process is staying, the configuration
//! is changing, and the new listener should take over as fast as possible.
//! Reload therefore never sleeps.
//!
//! # Host contract
//!
//! The host runtime owns the callback schedule and invokes [`on_start`],
//! [`on_reload`], and [`on_final_shutdown`] serially — the controller takes
//! `&mut self` so the compiler holds the host to that. Stop calls on a
//! stopped service are no-ops.
//!
//! [`on_start`]: HealthService::on_start
//! [`on_reload`]: HealthService::on_reload
//! [`on_final_shutdown`]: HealthService::on_final_shutdown

use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{Config, HEALTH_PATH};
use crate::error::Error;
use crate::listener;
use crate::probe::Probe;
use crate::server;

/// A health-check endpoint with start/reload/shutdown lifecycle.
///
/// ```rust,no_run
/// use pulse::{Config, HealthService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), pulse::Error> {
///     let mut service = HealthService::new(Config::default());
///     service.on_start()?;
///     // ... host runs ...
///     service.on_final_shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct HealthService {
    config: Config,
    state: State,
}

/// The lifecycle state machine.
///
/// The cancellation handle and the task handles only exist in `Running`, so
/// "running iff the listener and the cancel signal are live" holds by
/// construction — there is no boolean to fall out of sync.
enum State {
    Stopped,
    Running {
        /// Fires the cancellation signal. Send happens strictly before the
        /// listener closes: the listener drops when the signalled accept
        /// loop unwinds.
        shutdown: watch::Sender<bool>,
        /// The accept loop (owns the listener).
        server: JoinHandle<()>,
        /// The cancellation watcher; extension point for future overload
        /// detection, currently parks until the signal fires.
        watcher: JoinHandle<()>,
        /// Actual bound address (differs from config when binding port 0).
        addr: SocketAddr,
    },
}

impl HealthService {
    /// Creates a stopped service. Nothing binds until [`on_start`](Self::on_start).
    pub fn new(config: Config) -> Self {
        Self { config, state: State::Stopped }
    }

    /// `true` between a successful start and the next reload/shutdown.
    pub fn running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// The bound address while running. `None` when stopped.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            State::Running { addr, .. } => Some(*addr),
            State::Stopped => None,
        }
    }

    /// Binds the listener and starts serving.
    ///
    /// Spawns two tasks: the accept loop and the cancellation watcher. A
    /// bind failure is fatal and leaves the service stopped; the host must
    /// abort startup. Starting an already-running service is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_start(&mut self) -> Result<(), Error> {
        if self.running() {
            return Ok(());
        }

        let ln = listener::bind(self.config.addr)?;
        let addr = ln.local_addr().map_err(Error::Bind)?;

        let (shutdown, rx) = watch::channel(false);
        let probe = Arc::new(Probe::new(self.config.lookup.clone()));

        let server = tokio::spawn(server::serve(ln, probe, rx));
        let watcher = tokio::spawn(watch_cancellation(shutdown.subscribe()));

        info!(addr = %addr, path = HEALTH_PATH, "health endpoint listening");

        self.state = State::Running { shutdown, server, watcher, addr };
        Ok(())
    }

    /// Fast stop ahead of a restart with new configuration.
    ///
    /// Fires the cancellation signal and closes the listener immediately —
    /// never any drain delay, regardless of the configured lameduck duration.
    /// No-op when stopped. Never fails; the `Result` is the host-callback
    /// signature.
    pub async fn on_reload(&mut self) -> Result<(), Error> {
        self.stop().await;
        Ok(())
    }

    /// Final stop at process shutdown.
    ///
    /// With a non-zero lameduck duration, sleeps for that long **before**
    /// touching anything — the endpoint keeps accepting and answering
    /// normally for the whole window, blocking only the caller. Then fires
    /// the cancellation signal and closes the listener. No-op when stopped.
    pub async fn on_final_shutdown(&mut self) -> Result<(), Error> {
        if !self.running() {
            return Ok(());
        }

        if !self.config.lameduck.is_zero() {
            info!(duration = ?self.config.lameduck, "going into lameduck mode");
            tokio::time::sleep(self.config.lameduck).await;
        }

        self.stop().await;
        Ok(())
    }

    /// Shared teardown: signal, then wait for both tasks to unwind.
    ///
    /// Ordering guarantee lives here: the cancellation send precedes the
    /// listener close, because the accept loop only drops the listener after
    /// observing the signal. Awaiting the server task means in-flight
    /// requests have completed by the time this returns.
    async fn stop(&mut self) {
        let State::Running { shutdown, server, watcher, addr } =
            mem::replace(&mut self.state, State::Stopped)
        else {
            return;
        };

        let _ = shutdown.send(true);
        let _ = watcher.await;
        let _ = server.await;

        info!(addr = %addr, "health endpoint stopped");
    }
}

/// Parks until the cancellation signal fires, then exits.
///
/// Deliberately does no work: this task reserves the slot where overload
/// detection would go, without changing the shutdown protocol when it
/// arrives.
async fn watch_cancellation(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

//! Hostname-resolution prober.
//!
//! Health here means one thing: every configured hostname currently resolves.
//! The probe runs synchronously inside each `/health` request — there is no
//! background timer — so the reported state is exactly as fresh as the last
//! poll. The probe is stateless and side-effect-free apart from logging;
//! concurrent requests may run it in parallel without coordination.

use std::future::Future;
use std::io;

use tracing::{error, info};

/// The probe verdict: either every lookup succeeded, or one did not.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Health {
    Healthy,
    Unhealthy,
}

/// Resolves a fixed list of hostnames, in order, on every [`check`](Probe::check).
pub struct Probe {
    lookup: Vec<String>,
}

impl Probe {
    pub fn new(lookup: Vec<String>) -> Self {
        Self { lookup }
    }

    /// Runs one health check against the live resolver.
    ///
    /// Empty target list → [`Health::Healthy`]. Otherwise targets are
    /// resolved in configured order and the first failure short-circuits to
    /// [`Health::Unhealthy`] — later targets are not attempted, which bounds
    /// the request's latency and keeps the failing host last in the log.
    /// No timeout is applied; a hanging resolver stalls this request only.
    pub async fn check(&self) -> Health {
        check_with(&self.lookup, resolve).await
    }
}

/// The probe loop with the resolver as a parameter.
///
/// [`Probe::check`] passes the real DNS lookup; tests pass a canned one to
/// pin down the ordering and short-circuit behaviour without touching the
/// network.
async fn check_with<F, Fut>(targets: &[String], resolve: F) -> Health
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    for target in targets {
        info!(target = %target, "looking up");
        match resolve(target.clone()).await {
            Ok(()) => info!(target = %target, "lookup succeeded"),
            Err(e) => {
                error!(target = %target, "lookup failed: {e}");
                return Health::Unhealthy;
            }
        }
    }
    Health::Healthy
}

/// One DNS lookup. The port is irrelevant — only resolvability matters.
async fn resolve(host: String) -> io::Result<()> {
    tokio::net::lookup_host((host.as_str(), 0u16)).await.map(|_| ())
}

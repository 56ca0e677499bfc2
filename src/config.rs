//! Validated service configuration.
//!
//! Whatever layer parses the operator's configuration hands its output here
//! as plain values; [`Config::new`] is where they either become a usable
//! configuration or die as [`Error::Config`] — a malformed address never
//! reaches a running service.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::Error;

/// Address used when the operator configures none.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// The fixed path health checks are served on, regardless of address.
pub const HEALTH_PATH: &str = "/health";

/// Immutable configuration for a [`HealthService`](crate::HealthService).
///
/// ```rust
/// use std::time::Duration;
/// use pulse::Config;
///
/// // Everything defaulted: 0.0.0.0:8080, no drain delay, always healthy.
/// let config = Config::default();
///
/// // Explicit: drain for 5s on shutdown, probe two upstreams per request.
/// let config = Config::new(
///     "127.0.0.1:8053",
///     Duration::from_secs(5),
///     vec!["example.org".into(), "example.net".into()],
/// ).unwrap();
/// # let _ = config;
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) addr: SocketAddr,
    pub(crate) lameduck: Duration,
    pub(crate) lookup: Vec<String>,
}

impl Config {
    /// Validates `address` and assembles a configuration.
    ///
    /// An empty `address` means [`DEFAULT_ADDR`]. A non-empty address must be
    /// a resolvable `host:port` pair; anything else is [`Error::Config`].
    /// Hostname addresses are resolved here, at setup time, so the request
    /// path never pays for it.
    ///
    /// `lameduck` is the drain delay applied on final shutdown only — zero
    /// disables it. `lookup` is the ordered list of hostnames probed on every
    /// health-check request — empty means the service always reports healthy.
    pub fn new(
        address: &str,
        lameduck: Duration,
        lookup: Vec<String>,
    ) -> Result<Self, Error> {
        let address = if address.is_empty() { DEFAULT_ADDR } else { address };

        let addr = address
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("invalid address `{address}`: {e}")))?
            .next()
            .ok_or_else(|| Error::Config(format!("address `{address}` resolved to nothing")))?;

        Ok(Self { addr, lameduck, lookup })
    }

    /// The address the service will bind to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The configured drain delay.
    pub fn lameduck(&self) -> Duration {
        self.lameduck
    }

    /// The hostnames probed on each health-check request, in order.
    pub fn lookup(&self) -> &[String] {
        &self.lookup
    }
}

impl Default for Config {
    fn default() -> Self {
        // DEFAULT_ADDR is a literal socket address; parsing it cannot fail.
        Self {
            addr: DEFAULT_ADDR.parse().unwrap(),
            lameduck: Duration::ZERO,
            lookup: Vec::new(),
        }
    }
}

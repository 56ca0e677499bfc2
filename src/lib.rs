//! # pulse
//!
//! A process-liveness signal over HTTP. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Your load balancer decides where traffic goes. pulse does not — by
//! design. It answers exactly one question on exactly one path:
//! `GET /health` returns `200 OK` while this process should keep receiving
//! traffic, `500 Internal Server Error` when it should not. Health means
//! every configured hostname currently resolves; configure none and the
//! answer is always yes.
//!
//! The substance is the lifecycle around that handler, driven by three host
//! callbacks:
//!
//! - **Start** — bind with address/port reuse enabled, so a replacement
//!   listener can bind while its draining predecessor still holds the port.
//! - **Reload** — fast stop ahead of a restart with new configuration.
//!   Never delays: the new configuration should take effect promptly.
//! - **Final shutdown** — *lameduck* draining: with a configured drain
//!   duration, the endpoint keeps answering normally for that long before
//!   teardown, giving load balancers time to route traffic away from a
//!   process that is already slated to die.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pulse::{Config, HealthService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pulse::Error> {
//!     let config = Config::new(
//!         "0.0.0.0:8080",
//!         Duration::from_secs(5),              // lameduck drain on shutdown
//!         vec!["upstream.example.org".into()], // probed on every poll
//!     )?;
//!
//!     let mut service = HealthService::new(config);
//!     service.on_start()?;
//!
//!     tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
//!
//!     // Keeps answering for 5s while the balancer drains, then tears down.
//!     service.on_final_shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod listener;
mod probe;
mod server;
mod service;

pub use config::{Config, DEFAULT_ADDR, HEALTH_PATH};
pub use error::Error;
pub use probe::{Health, Probe};
pub use service::HealthService;

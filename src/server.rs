//! The accept loop and the `/health` handler.
//!
//! One listener, one fixed path. Each accepted connection runs on its own
//! task, so concurrent polls execute the probe concurrently — the probe is
//! stateless, nothing here needs a lock. The loop runs until the lifecycle
//! controller fires the shutdown channel; it then stops accepting, drops the
//! listener, and waits for in-flight connections to finish before returning.
//!
//! The shutdown channel also reaches every connection task: on the signal,
//! each task asks hyper for a graceful shutdown of its connection, which
//! finishes the request currently in flight and then closes the socket.
//! Without that, an idle keep-alive connection — a polling orchestrator
//! parked between checks — would hold its task open until the client hung
//! up, and teardown would block behind it.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

use crate::config::HEALTH_PATH;
use crate::probe::{Health, Probe};

/// Serves health checks on `listener` until `shutdown` reads `true`.
///
/// Returning from this function is the clean-shutdown path, not a fault:
/// the listener closes when the loop unwinds, after the cancellation signal
/// has already fired (the controller guarantees that ordering).
pub(crate) async fn serve(
    listener: TcpListener,
    probe: Arc<Probe>,
    mut shutdown: watch::Receiver<bool>,
) {
    // JoinSet tracks every spawned connection task so we can wait for
    // them all to finish once the shutdown signal fires.
    let mut tasks = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            // `biased` makes select! check arms top-to-bottom. The shutdown
            // arm goes first so a fired signal stops accepting immediately,
            // even with connections queued.
            biased;

            changed = shutdown.changed() => {
                // A closed channel means the controller is gone; treat it
                // the same as a fired signal.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let probe = Arc::clone(&probe);
                let io = TokioIo::new(stream);
                let shutdown = shutdown.clone();

                tasks.spawn(async move {
                    let mut shutdown = shutdown;
                    let svc = service_fn(move |req| {
                        let probe = Arc::clone(&probe);
                        async move { dispatch(probe, req).await }
                    });

                    // The connection future borrows the builder, so both
                    // live here; pinning lets us poll it across the select.
                    let builder = ConnBuilder::new(TokioExecutor::new());
                    let conn = builder.serve_connection(io, svc);
                    tokio::pin!(conn);

                    let served = tokio::select! {
                        res = conn.as_mut() => res,

                        // `wait_for` checks the current value first, so a
                        // signal that fired before this task spawned is not
                        // missed; a closed channel counts as fired.
                        // The async block drops the non-`Send` watch guard
                        // before the arm body runs, keeping the task `Send`.
                        _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                            // Finish the request in flight, then close the
                            // socket — an idle keep-alive ends here instead
                            // of holding teardown hostage.
                            conn.as_mut().graceful_shutdown();
                            conn.as_mut().await
                        }
                    };

                    if let Err(e) = served {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound between health-check polls.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    // The listener drops here — no new connections. In-flight requests are
    // allowed to complete and respond before we return.
    drop(listener);
    while tasks.join_next().await.is_some() {}
}

/// Routes one request: `/health` runs the probe, everything else is a 404.
async fn dispatch(
    probe: Arc<Probe>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    if req.uri().path() != HEALTH_PATH {
        return Ok(empty_response(StatusCode::NOT_FOUND));
    }

    Ok(health_response(probe.check().await))
}

/// `Healthy` → `200 OK`, `Unhealthy` → `500 Internal Server Error`.
///
/// The body is the status line's canonical reason phrase ("OK" / "Internal
/// Server Error"), nothing more — orchestrators key off the code, the body
/// is for humans with `curl`.
fn health_response(health: Health) -> http::Response<Full<Bytes>> {
    let status = match health {
        Health::Healthy => StatusCode::OK,
        Health::Unhealthy => StatusCode::INTERNAL_SERVER_ERROR,
    };

    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(
            status.canonical_reason().unwrap_or_default().as_bytes(),
        )))
        .unwrap_or_else(|_| empty_response(status))
}

fn empty_response(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

//! `/metrics` and `/healthz` HTTP endpoint (spec §6 "Telemetry ... exposed
//! over HTTP alongside a liveness/readiness endpoint"). Built directly on
//! `hyper`/`hyper-util` rather than a framework, matching the raw-hyper
//! dependency shape this workspace carries instead of pulling in axum.

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use compound_common::metrics::ControllerMetrics;

/// Serves until `shutdown` is cancelled. Connections already accepted are
/// allowed to finish; no new ones are accepted once cancellation fires.
pub async fn run(
    port: u16,
    #[cfg(feature = "metrics")] metrics: ControllerMetrics,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(error = %err, "metrics server accept failed");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                #[cfg(feature = "metrics")]
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        #[cfg(feature = "metrics")]
                        let metrics = metrics.clone();
                        async move { handle(req, #[cfg(feature = "metrics")] &metrics) }
                    });
                    if let Err(err) = auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        tracing::debug!(error = %err, "metrics server connection closed");
                    }
                });
            }
        }
    }
    tracing::info!("metrics server stopped");
    Ok(())
}

fn handle(
    req: Request<hyper::body::Incoming>,
    #[cfg(feature = "metrics")] metrics: &ControllerMetrics,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match req.uri().path() {
        "/healthz" => Response::new(Full::new(Bytes::from_static(b"ok"))),
        #[cfg(feature = "metrics")]
        "/metrics" => {
            use prometheus::Encoder;
            let encoder = prometheus::TextEncoder::new();
            let families = metrics.registry.gather();
            let mut buf = Vec::new();
            if encoder.encode(&families, &mut buf).is_err() {
                return Ok(not_found());
            }
            Response::new(Full::new(Bytes::from(buf)))
        }
        _ => return Ok(not_found()),
    };
    Ok(response)
}

fn not_found() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"not found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

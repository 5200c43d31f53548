// server.rs - router assembly and the serve loop
//
// Shutdown: the signal stops the listener, then in-flight connections get at
// most `shutdown_timeout` to finish before they are dropped.

use std::future::Future;
use std::io;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::handlers::{self, AppState};
use crate::middleware::request_context;

/// Largest request body accepted by any route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Every route, under the request-context and trace layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::public::routes())
        .merge(handlers::protected::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct Server {
    config: ServerConfig,
    router: Router,
}

impl Server {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    pub async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(&self.config.address).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(address = %listener.local_addr()?, "server listening");

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let serve = axum::serve(listener, self.router.into_make_service()).with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        });
        let mut handle = tokio::spawn(async move { serve.await });

        tokio::select! {
            joined = &mut handle => return flatten(joined),
            () = shutdown => {}
        }

        info!("shutting down, draining connections");
        let _ = drain_tx.send(());

        let timeout = self.config.shutdown_timeout();
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(joined) => {
                info!("server stopped");
                flatten(joined)
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "drain timed out, dropping open connections");
                handle.abort();
                Ok(())
            }
        }
    }
}

fn flatten(joined: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    joined.map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}

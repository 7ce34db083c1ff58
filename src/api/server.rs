//! API server lifecycle: bind → spawn background task → return handle with
//! shutdown channel. `serve()` is the foreground variant used by the binary.

use std::net::SocketAddr;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a background server.
pub struct ApiServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

async fn bind(addr: SocketAddr) -> Result<(tokio::net::TcpListener, SocketAddr), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;
    Ok((listener, local))
}

/// Start the server in a background task. Port 0 picks an ephemeral port.
pub async fn start_server_on(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, ServerError> {
    let (listener, local) = bind(addr).await?;
    let app = api_router(ctx);

    let session = ServerSession {
        server_addr: local.to_string(),
        port: local.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(addr = %local, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// Serve in the foreground until Ctrl-C.
pub async fn serve(ctx: ApiContext, addr: SocketAddr) -> Result<(), ServerError> {
    let (listener, local) = bind(addr).await?;
    tracing::info!(addr = %local, "API server listening");

    axum::serve(listener, api_router(ctx))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await
        .map_err(ServerError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use crate::ledger::MemoryLedger;
    use crate::pipeline::evidence::MemoryStore;
    use crate::pipeline::extraction::{ImageTextExtractor, MockImagePreprocessor, MockOcrEngine};
    use crate::pipeline::processor::SubmissionProcessor;
    use crate::pipeline::scoring::AgreementScorer;
    use crate::pipeline::transcription::PlaceholderTranscriber;

    fn test_context() -> ApiContext {
        let ledger = Arc::new(MemoryLedger::default());
        let extractor = ImageTextExtractor::new(
            Box::new(MockImagePreprocessor::new()),
            Arc::new(MockOcrEngine::new("stolen bicycle", 80.0)),
        );
        let processor = SubmissionProcessor::new(
            Box::new(extractor),
            Box::new(PlaceholderTranscriber),
            AgreementScorer::local(),
            Box::new(MemoryStore::new()),
            ledger.clone(),
        );
        ApiContext::new(Arc::new(processor), ledger, 1)
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_server_on(test_context(), SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .expect("server should start");
        assert!(server.session.port > 0);

        let url = format!("http://127.0.0.1:{}/api/health", server.session.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let mut first = start_server_on(test_context(), SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .unwrap();
        let taken: SocketAddr = first.session.server_addr.parse().unwrap();
        let err = start_server_on(test_context(), taken).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
        first.shutdown();
    }
}

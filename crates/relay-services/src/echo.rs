//! Echo processor: a stand-in backend with no model behind it.
//!
//! Answers every chunk with a "not detected" result, stops after the last
//! chunk, and ends its stream with Status OK. Useful for running the relay
//! without an inference server and as the processor in tests.

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use relay_core::{now_millis, ResultMessage, Status};

use crate::error::RelayError;
use crate::inbound::InboundStream;

pub const ECHO_MESSAGE: &str = "Processing video chunk...";

/// Serve one processor stream. Returns the number of chunks answered.
pub async fn run_echo_session(stream: InboundStream) -> Result<u64, RelayError> {
    let (mut chunks, mut results) = stream.split();
    let mut answered = 0u64;

    loop {
        let chunk = match chunks.receive().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                let _ = results.finish(&e.to_status()).await;
                return Err(e);
            }
        };
        tracing::debug!(
            size = chunk.payload.len(),
            timestamp = chunk.timestamp,
            "received chunk"
        );

        results
            .send(&ResultMessage::new(false, ECHO_MESSAGE, now_millis()))
            .await?;
        answered += 1;

        if chunk.is_last {
            tracing::debug!(answered, "received last chunk, stream complete");
            break;
        }
    }

    results.finish(&Status::ok()).await?;
    Ok(answered)
}

/// Accept processor connections until shutdown, one task per stream.
pub async fn serve_echo(
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "echo processor listening");
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("echo processor shutting down");
                return Ok(());
            }

            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(a) => a,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                tokio::spawn(async move {
                    match run_echo_session(InboundStream::from_tcp(socket, None)).await {
                        Ok(answered) => tracing::debug!(%peer, answered, "echo stream finished"),
                        Err(e) => tracing::warn!(%peer, error = %e, "echo stream failed"),
                    }
                });
            }
        }
    }
}

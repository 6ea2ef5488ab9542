//! Relay bridge: runs one session between a producer and the processor.
//!
//! Two pumps run as separate tasks:
//!
//!   inbound pump   producer ──chunks──▶ processor, then half-close
//!   outbound pump  processor ──results──▶ producer
//!
//! Each pump owns one direction of one leg and nothing else. Both report
//! into a single exit channel, and the session ends on the first of:
//!
//!   - the outbound pump seeing the processor's end of stream   → DONE
//!   - either pump failing                                      → FAILED
//!
//! The producer half-closing only moves the session to CLOSING; results
//! the processor is still emitting keep flowing until its stream ends.
//!
//! On termination both pumps are stopped, the producer gets a final Status
//! frame, and every stream handle is dropped.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use relay_core::Status;

use crate::error::RelayError;
use crate::gateway::{GatewayReceiver, GatewaySender, ProcessorGateway, Received};
use crate::inbound::{ChunkReceiver, InboundStream, ResultSender};

/// Longest teardown waits for the outbound pump once the session has ended.
const TEARDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Both pumps running.
    Active,
    /// Producer finished sending; draining results from the processor.
    Closing,
    Done,
    Failed,
}

/// What a finished session moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub chunks_forwarded: u64,
    pub results_forwarded: u64,
}

/// Reported once by each pump on the shared exit channel.
#[derive(Debug)]
enum PumpExit {
    /// Producer half-closed and the processor leg was half-closed in turn.
    InboundDrained,
    /// Processor ended its stream.
    OutboundEnded,
    Failed(RelayError),
}

pub struct RelayBridge {
    session_id: u64,
    inbound: InboundStream,
    gateway: ProcessorGateway,
}

impl RelayBridge {
    pub fn new(session_id: u64, inbound: InboundStream, gateway: ProcessorGateway) -> Self {
        Self {
            session_id,
            inbound,
            gateway,
        }
    }

    /// Run the session to its terminal state.
    pub async fn run(self) -> Result<SessionSummary, RelayError> {
        let session_id = self.session_id;
        let (chunks, results) = self.inbound.split();
        let (to_processor, from_processor) = self.gateway.split();

        // Two pumps, one report each: capacity 2 means reporting never blocks.
        let (exit_tx, mut exit_rx) = mpsc::channel::<PumpExit>(2);
        let (stop_tx, _) = broadcast::channel::<()>(1);

        let inbound = tokio::spawn(inbound_pump(
            session_id,
            chunks,
            to_processor,
            exit_tx.clone(),
            stop_tx.subscribe(),
        ));
        let mut outbound = tokio::spawn(outbound_pump(
            session_id,
            from_processor,
            results,
            exit_tx,
            stop_tx.subscribe(),
        ));

        let mut state = SessionState::Active;
        tracing::debug!(session_id, ?state, "session started");

        let mut outcome = loop {
            match exit_rx.recv().await {
                Some(PumpExit::InboundDrained) => {
                    state = SessionState::Closing;
                    tracing::debug!(session_id, ?state, "producer half-closed, draining results");
                }
                Some(PumpExit::OutboundEnded) => break Ok(()),
                Some(PumpExit::Failed(e)) => break Err(e),
                // Only reachable if a pump panicked.
                None => {
                    break Err(RelayError::ProducerError(
                        "session pumps stopped without reporting".into(),
                    ))
                }
            }
        };

        // Unwind whichever pump is still running.
        let _ = stop_tx.send(());

        let chunks_forwarded = match inbound.await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "inbound pump panicked");
                0
            }
        };

        let results_forwarded = match tokio::time::timeout(TEARDOWN_GRACE, &mut outbound).await {
            Err(_) => {
                // Still blocked on a result write the producer never reads.
                outbound.abort();
                tracing::warn!(session_id, "producer stopped reading, abandoning final status");
                if outcome.is_ok() {
                    outcome = Err(RelayError::ProducerError("producer stopped reading".into()));
                }
                0
            }
            Ok(Ok((mut results, n))) => {
                let status = match &outcome {
                    Ok(()) => Status::ok(),
                    Err(e) => e.to_status(),
                };
                if let Err(e) = results.finish(&status).await {
                    tracing::debug!(session_id, error = %e, "final status not delivered");
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
                n
            }
            Ok(Err(e)) => {
                tracing::warn!(session_id, error = %e, "outbound pump panicked");
                0
            }
        };

        let summary = SessionSummary {
            chunks_forwarded,
            results_forwarded,
        };

        match outcome {
            Ok(()) => {
                state = SessionState::Done;
                tracing::info!(
                    session_id,
                    ?state,
                    chunks = summary.chunks_forwarded,
                    results = summary.results_forwarded,
                    "session complete"
                );
                Ok(summary)
            }
            Err(e) => {
                state = SessionState::Failed;
                tracing::warn!(
                    session_id,
                    ?state,
                    chunks = summary.chunks_forwarded,
                    results = summary.results_forwarded,
                    error = %e,
                    "session failed"
                );
                Err(e)
            }
        }
    }
}

// ── Pumps ────────────────────────────────────────────────────────────────────

/// Producer → processor. Returns the number of chunks forwarded.
async fn inbound_pump(
    session_id: u64,
    mut chunks: ChunkReceiver,
    mut gateway: GatewaySender,
    exit: mpsc::Sender<PumpExit>,
    mut stop: broadcast::Receiver<()>,
) -> u64 {
    let mut forwarded = 0u64;

    let reason = loop {
        tokio::select! {
            biased;

            _ = stop.recv() => return forwarded,

            step = forward_chunk(&mut chunks, &mut gateway) => match step {
                Ok(Some(is_last)) => {
                    forwarded += 1;
                    if is_last {
                        tracing::debug!(session_id, forwarded, "last chunk forwarded");
                        break PumpExit::InboundDrained;
                    }
                }
                Ok(None) => break PumpExit::InboundDrained,
                Err(e) => break PumpExit::Failed(e),
            },
        }
    };

    if matches!(reason, PumpExit::InboundDrained) {
        gateway.close_send().await;
    }
    let _ = exit.send(reason).await;
    forwarded
}

/// Read one chunk and hand it to the processor. `Ok(Some(is_last))` when a
/// chunk was forwarded, `Ok(None)` when the producer half-closed.
async fn forward_chunk(
    chunks: &mut ChunkReceiver,
    gateway: &mut GatewaySender,
) -> Result<Option<bool>, RelayError> {
    match chunks.receive().await? {
        Some(chunk) => {
            gateway.send(&chunk).await?;
            Ok(Some(chunk.is_last))
        }
        None => Ok(None),
    }
}

/// Processor → producer. Hands the result sender back so the session can
/// write the final status on it.
async fn outbound_pump(
    session_id: u64,
    mut gateway: GatewayReceiver,
    mut results: ResultSender,
    exit: mpsc::Sender<PumpExit>,
    mut stop: broadcast::Receiver<()>,
) -> (ResultSender, u64) {
    let mut forwarded = 0u64;

    let reason = loop {
        // Only the wait for the processor is interruptible. A result write
        // to the producer always completes (or times out) so the stream
        // stays frame-aligned for the final status.
        let received = tokio::select! {
            biased;

            _ = stop.recv() => return (results, forwarded),

            r = gateway.receive() => r,
        };

        match received {
            Ok(Received::Result(result)) => {
                if let Err(e) = results.send(&result).await {
                    break PumpExit::Failed(e);
                }
                forwarded += 1;
                tracing::trace!(session_id, forwarded, detected = result.detected, "result forwarded");
            }
            Ok(Received::StreamEnded) => {
                tracing::debug!(session_id, forwarded, "processor stream ended");
                break PumpExit::OutboundEnded;
            }
            Err(e) => break PumpExit::Failed(e.into()),
        }
    };

    let _ = exit.send(reason).await;
    (results, forwarded)
}

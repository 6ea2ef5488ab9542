//! Relay integration test harness.
//!
//! Every test runs a real relay and a real processor on loopback TCP
//! (`127.0.0.1:0`) and drives the relay as a producer would.
//!
//!   cargo test --test integration

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use relay_core::{DataChunk, Frame, FrameReader, FrameWriter, ResultMessage, Status};
use relay_services::{
    new_session_table, run_echo_session, GatewaySettings, InboundStream, RelayServer, RelayStats,
    SessionListener, SessionTable, TcpConnector,
};

mod concurrency;
mod failures;
mod relay;
mod shutdown;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Upper bound for any single wait in these tests.
pub const TEST_DEADLINE: Duration = Duration::from_secs(10);

/// Start a processor that runs `script` once per accepted stream.
pub async fn spawn_processor<F, Fut>(script: F) -> SocketAddr
where
    F: Fn(InboundStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(script(InboundStream::from_tcp(socket, None)));
        }
    });
    addr
}

pub async fn spawn_echo_processor() -> SocketAddr {
    spawn_processor(|stream| async move {
        let _ = run_echo_session(stream).await;
    })
    .await
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub struct TestRelay {
    pub addr: SocketAddr,
    pub sessions: SessionTable,
    pub stats: RelayStats,
    shutdown: broadcast::Sender<()>,
    listener: JoinHandle<Result<()>>,
}

impl TestRelay {
    pub async fn start(processor: SocketAddr) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let settings = GatewaySettings {
            write_timeout: Some(Duration::from_secs(5)),
            idle_timeout: Some(Duration::from_secs(5)),
        };
        let connector =
            TcpConnector::new(processor.to_string(), Some(Duration::from_secs(2)), settings);

        let sessions = new_session_table();
        let stats = RelayStats::new();
        let (shutdown_tx, _) = broadcast::channel(1);
        let listener = tokio::spawn(
            SessionListener::new(
                listener,
                Arc::new(RelayServer::new(connector)),
                sessions.clone(),
                stats.clone(),
                Some(Duration::from_secs(5)),
                shutdown_tx.subscribe(),
            )
            .run(),
        );

        Self {
            addr,
            sessions,
            stats,
            shutdown: shutdown_tx,
            listener,
        }
    }

    /// Signal shutdown and wait for the listener to drain its sessions.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        tokio::time::timeout(TEST_DEADLINE, self.listener)
            .await
            .context("listener did not drain")??
    }

    /// Wait until every session has finished and been recorded.
    pub async fn wait_idle(&self) {
        tokio::time::timeout(TEST_DEADLINE, async {
            while !self.sessions.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sessions did not finish");
    }
}

/// The producer side of one relay stream.
pub struct Producer {
    writer: FrameWriter<OwnedWriteHalf>,
    reader: FrameReader<OwnedReadHalf>,
}

impl Producer {
    pub async fn connect(relay: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(relay).await.context("connect to relay")?;
        let (rd, wr) = stream.into_split();
        Ok(Self {
            writer: FrameWriter::new(wr),
            reader: FrameReader::new(rd),
        })
    }

    pub async fn send(&mut self, payload: &str, is_last: bool) -> Result<()> {
        self.writer
            .write_chunk(&DataChunk::now(payload.as_bytes().to_vec(), is_last))
            .await?;
        Ok(())
    }

    /// Half-close: no more chunks.
    pub async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Next frame from the relay.
    pub async fn next(&mut self) -> Result<Frame> {
        match tokio::time::timeout(TEST_DEADLINE, self.reader.read_frame()).await {
            Ok(Ok(Some(frame))) => Ok(frame),
            Ok(Ok(None)) => bail!("relay closed without a status"),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => bail!("timed out waiting for the relay"),
        }
    }

    /// Read everything up to and including the terminal status.
    pub async fn collect(&mut self) -> Result<(Vec<ResultMessage>, Status)> {
        let mut results = Vec::new();
        loop {
            match self.next().await? {
                Frame::Result(r) => results.push(r),
                Frame::Status(s) => return Ok((results, s)),
                Frame::Chunk(_) => bail!("relay sent a chunk to the producer"),
            }
        }
    }
}

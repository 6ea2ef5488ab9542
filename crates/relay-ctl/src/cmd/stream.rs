//! `stream`: send a file through the relay and print the results.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;

use relay_core::wire::MAX_PAYLOAD;
use relay_core::{DataChunk, Frame, FrameReader, FrameWriter, ResultMessage, Status};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

pub async fn cmd_stream(server: &str, path: &Path, chunk_size: usize) -> Result<()> {
    if chunk_size == 0 || chunk_size > MAX_PAYLOAD {
        anyhow::bail!("--chunk-size must be between 1 and {} bytes", MAX_PAYLOAD);
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let stream = TcpStream::connect(server)
        .await
        .with_context(|| format!("failed to connect to relay at {}", server))?;
    stream.set_nodelay(true).ok();

    let (rd, wr) = stream.into_split();
    let mut writer = FrameWriter::new(wr);
    let mut reader = FrameReader::new(rd);

    println!("Streaming {} to {}", path.display(), server);

    let send = async {
        let sent = send_chunks(file, chunk_size, &mut writer).await?;
        writer.shutdown().await?;
        Ok::<u64, anyhow::Error>(sent)
    };
    let recv = receive_results(&mut reader, |r| {
        println!(
            "  [{}] detected={} {}",
            r.timestamp, r.detected, r.message
        );
    });

    let (sent, status) = tokio::join!(send, recv);
    let status = status?;

    if !status.is_ok() {
        anyhow::bail!("relay ended the stream: {:?}: {}", status.code, status.message);
    }
    match sent {
        Ok(n) => println!("✓ Stream complete: {} chunk(s) sent", n),
        // The processor may finish before the producer does.
        Err(e) => println!("✓ Stream complete (relay stopped reading early: {})", e),
    }
    Ok(())
}

/// Read from `source` in `chunk_size` pieces and write each as a chunk frame.
/// The final chunk carries `is_last`; an empty source sends one empty last
/// chunk. Returns the number of chunks written.
pub async fn send_chunks<R, W>(
    mut source: R,
    chunk_size: usize,
    writer: &mut FrameWriter<W>,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut sent = 0;
    let mut current = read_block(&mut source, chunk_size).await?;
    loop {
        let at_eof = current.len() < chunk_size;
        let next = if at_eof {
            Vec::new()
        } else {
            read_block(&mut source, chunk_size).await?
        };
        let is_last = at_eof || next.is_empty();

        writer
            .write_chunk(&DataChunk::now(current, is_last))
            .await
            .context("failed to send chunk")?;
        sent += 1;

        if is_last {
            return Ok(sent);
        }
        current = next;
    }
}

/// Read results until the relay's terminal status, handing each to `on_result`.
/// EOF before a status is an error.
pub async fn receive_results<R, F>(reader: &mut FrameReader<R>, mut on_result: F) -> Result<Status>
where
    R: AsyncRead + Unpin,
    F: FnMut(&ResultMessage),
{
    loop {
        match reader.read_frame().await.context("failed to read from relay")? {
            Some(Frame::Result(r)) => on_result(&r),
            Some(Frame::Status(s)) => return Ok(s),
            Some(Frame::Chunk(_)) => anyhow::bail!("relay sent a chunk frame"),
            // The relay always ends with a status; a bare EOF means it died.
            None => anyhow::bail!("relay closed the stream without a status"),
        }
    }
}

/// Fill up to `size` bytes; shorter only at EOF.
async fn read_block<R: AsyncRead + Unpin>(source: &mut R, size: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    let mut filled = 0;
    while filled < size {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

//! relay-ctl: command-line client for the stream relay.

mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};

use cmd::stream::DEFAULT_CHUNK_SIZE;

const DEFAULT_PORT: u16 = 9051;
const DEFAULT_SERVER: &str = "127.0.0.1:50051";

fn print_usage() {
    println!("Usage: relay-ctl [options] <command>");
    println!();
    println!("Commands:");
    println!("  stream <file>       Send a file through the relay and print results");
    println!("  status              Show daemon status and session totals");
    println!("  sessions            List active sessions");
    println!("  sessions <id>       Show one session");
    println!("  shutdown            Stop the daemon accepting new producers");
    println!();
    println!("Options:");
    println!("  --port <port>        Status API port (default: {})", DEFAULT_PORT);
    println!("  --server <addr>      Relay address for stream (default: {})", DEFAULT_SERVER);
    println!(
        "  --chunk-size <bytes> Chunk size for stream (default: {})",
        DEFAULT_CHUNK_SIZE
    );
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut server = DEFAULT_SERVER.to_string();
    let mut chunk_size = DEFAULT_CHUNK_SIZE;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--server" => {
                i += 1;
                server = args.get(i).context("--server requires a value")?.clone();
            }
            "--chunk-size" => {
                i += 1;
                chunk_size = args
                    .get(i)
                    .context("--chunk-size requires a value")?
                    .parse()
                    .context("--chunk-size must be a number")?;
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["stream", file] => cmd::stream::cmd_stream(&server, &PathBuf::from(file), chunk_size).await,
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["sessions"] => cmd::sessions::cmd_sessions(port).await,
        ["sessions", id] => cmd::sessions::cmd_session_inspect(port, id).await,
        ["shutdown"] => cmd::status::cmd_shutdown(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

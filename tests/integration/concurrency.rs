use relay_core::{ResultMessage, Status};

use crate::*;

const SESSIONS: usize = 100;
const CHUNKS_PER_SESSION: usize = 5;

/// Echoes each chunk's payload back as the result message.
async fn mirror(stream: InboundStream) {
    let (mut chunks, mut results) = stream.split();
    while let Ok(Some(chunk)) = chunks.receive().await {
        let message = String::from_utf8_lossy(&chunk.payload).into_owned();
        if results
            .send(&ResultMessage::new(false, message, chunk.timestamp))
            .await
            .is_err()
        {
            return;
        }
        if chunk.is_last {
            break;
        }
    }
    let _ = results.finish(&Status::ok()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_stay_isolated() {
    let processor = spawn_processor(mirror).await;
    let relay = TestRelay::start(processor).await;

    let mut producers = Vec::with_capacity(SESSIONS);
    for s in 0..SESSIONS {
        let addr = relay.addr;
        producers.push(tokio::spawn(async move {
            let expected: Vec<String> = (0..CHUNKS_PER_SESSION)
                .map(|c| format!("session-{s}/chunk-{c}"))
                .collect();

            let mut producer = Producer::connect(addr).await?;
            for (c, payload) in expected.iter().enumerate() {
                producer
                    .send(payload, c + 1 == CHUNKS_PER_SESSION)
                    .await?;
            }

            let (results, status) = producer.collect().await?;
            let got: Vec<String> = results.into_iter().map(|r| r.message).collect();
            if got != expected {
                anyhow::bail!("session {s} saw {got:?}");
            }
            if !status.is_ok() {
                anyhow::bail!("session {s} ended with {status:?}");
            }
            Ok::<(), anyhow::Error>(())
        }));
    }

    for p in producers {
        p.await.unwrap().unwrap();
    }

    relay.wait_idle().await;
    let totals = relay.stats.snapshot();
    assert_eq!(totals.accepted, SESSIONS as u64);
    assert_eq!(totals.completed, SESSIONS as u64);
    assert_eq!(
        totals.chunks_forwarded,
        (SESSIONS * CHUNKS_PER_SESSION) as u64
    );
}

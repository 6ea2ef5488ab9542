use relay_core::{ResultMessage, Status, StatusCode};
use tokio::sync::mpsc;

use crate::*;

#[tokio::test]
async fn test_unreachable_processor_rejects_producer() {
    let relay = TestRelay::start(unused_addr().await).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    let (results, status) = producer.collect().await.unwrap();

    assert!(results.is_empty());
    assert_eq!(status.code, StatusCode::BackendUnavailable);

    relay.wait_idle().await;
    let totals = relay.stats.snapshot();
    assert_eq!(totals.accepted, 1);
    assert_eq!(totals.rejected, 1);
    assert_eq!(totals.chunks_forwarded, 0);
}

#[tokio::test]
async fn test_processor_error_after_k_results() {
    const K: usize = 2;
    let processor = spawn_processor(|stream| async move {
        let (mut chunks, mut results) = stream.split();
        let mut answered = 0;
        while let Ok(Some(chunk)) = chunks.receive().await {
            if answered == K {
                let _ = results
                    .finish(&Status::error(StatusCode::ProcessorError, "model crashed"))
                    .await;
                return;
            }
            let _ = results
                .send(&ResultMessage::new(false, "ok", chunk.timestamp))
                .await;
            answered += 1;
        }
    })
    .await;
    let relay = TestRelay::start(processor).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    for i in 0..K {
        producer.send(&format!("chunk-{i}"), false).await.unwrap();
        match producer.next().await.unwrap() {
            Frame::Result(r) => assert_eq!(r.message, "ok"),
            other => panic!("expected a result, got {other:?}"),
        }
    }
    producer.send("chunk-fatal", false).await.unwrap();

    let (results, status) = producer.collect().await.unwrap();
    assert!(results.is_empty(), "no results after the processor failed");
    assert_eq!(status.code, StatusCode::ProcessorError);

    relay.wait_idle().await;
    assert_eq!(relay.stats.snapshot().failed, 1);
}

#[tokio::test]
async fn test_producer_disconnect_releases_processor() {
    let (ended_tx, mut ended_rx) = mpsc::channel::<usize>(1);
    let processor = spawn_processor(move |stream| {
        let ended_tx = ended_tx.clone();
        async move {
            let (mut chunks, mut results) = stream.split();
            let mut received = 0;
            while let Ok(Some(_)) = chunks.receive().await {
                received += 1;
            }
            let _ = ended_tx.send(received).await;
            let _ = results.finish(&Status::ok()).await;
        }
    })
    .await;
    let relay = TestRelay::start(processor).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    producer.send("only", false).await.unwrap();
    drop(producer);

    let received = tokio::time::timeout(TEST_DEADLINE, ended_rx.recv())
        .await
        .expect("processor stream was never closed")
        .unwrap();
    assert_eq!(received, 1);

    relay.wait_idle().await;
}

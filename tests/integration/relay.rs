use relay_core::{ResultMessage, Status, StatusCode};
use relay_services::ECHO_MESSAGE;

use crate::*;

/// Answers "B" with a detection and everything else with "ok".
async fn detector(stream: InboundStream) {
    let (mut chunks, mut results) = stream.split();
    while let Ok(Some(chunk)) = chunks.receive().await {
        let result = if &chunk.payload[..] == b"B" {
            ResultMessage::new(true, "fire", chunk.timestamp)
        } else {
            ResultMessage::new(false, "ok", chunk.timestamp)
        };
        if results.send(&result).await.is_err() {
            return;
        }
    }
    let _ = results.finish(&Status::ok()).await;
}

#[tokio::test]
async fn test_results_relayed_in_order() {
    let processor = spawn_processor(detector).await;
    let relay = TestRelay::start(processor).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    producer.send("A", false).await.unwrap();
    producer.send("B", false).await.unwrap();
    producer.close().await.unwrap();

    let (results, status) = producer.collect().await.unwrap();
    let seen: Vec<_> = results
        .iter()
        .map(|r| (r.detected, r.message.as_str()))
        .collect();
    assert_eq!(seen, [(false, "ok"), (true, "fire")]);
    assert_eq!(status.code, StatusCode::Ok);

    relay.wait_idle().await;
    let totals = relay.stats.snapshot();
    assert_eq!(totals.completed, 1);
    assert_eq!(totals.chunks_forwarded, 2);
    assert_eq!(totals.results_forwarded, 2);
}

#[tokio::test]
async fn test_echo_processor_stops_at_last_chunk() {
    let processor = spawn_echo_processor().await;
    let relay = TestRelay::start(processor).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    producer.send("frame-1", false).await.unwrap();
    producer.send("frame-2", false).await.unwrap();
    producer.send("frame-3", true).await.unwrap();

    // No half-close: the last chunk alone ends the stream.
    let (results, status) = producer.collect().await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| !r.detected && r.message == ECHO_MESSAGE));
    assert!(status.is_ok());
}

#[tokio::test]
async fn test_results_drained_after_producer_half_close() {
    // Replies only after the whole input has arrived.
    let processor = spawn_processor(|stream| async move {
        let (mut chunks, mut results) = stream.split();
        let mut received = Vec::new();
        while let Ok(Some(chunk)) = chunks.receive().await {
            received.push(chunk);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        for chunk in &received {
            let message = String::from_utf8_lossy(&chunk.payload).into_owned();
            let _ = results
                .send(&ResultMessage::new(false, message, chunk.timestamp))
                .await;
        }
        let _ = results.finish(&Status::ok()).await;
    })
    .await;
    let relay = TestRelay::start(processor).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    for name in ["one", "two", "three"] {
        producer.send(name, false).await.unwrap();
    }
    producer.close().await.unwrap();

    let (results, status) = producer.collect().await.unwrap();
    let messages: Vec<_> = results.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, ["one", "two", "three"]);
    assert!(status.is_ok());
}

#[tokio::test]
async fn test_processor_finishing_first_ends_session() {
    let processor = spawn_processor(|stream| async move {
        let (mut chunks, mut results) = stream.split();
        if let Ok(Some(chunk)) = chunks.receive().await {
            let _ = results
                .send(&ResultMessage::new(false, "seen one", chunk.timestamp))
                .await;
        }
        let _ = results.finish(&Status::ok()).await;
    })
    .await;
    let relay = TestRelay::start(processor).await;

    let mut producer = Producer::connect(relay.addr).await.unwrap();
    producer.send("first", false).await.unwrap();

    let (results, status) = producer.collect().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message, "seen one");
    assert!(status.is_ok());

    relay.wait_idle().await;
    assert_eq!(relay.stats.snapshot().completed, 1);
}

use relay_core::{ResultMessage, Status};

use crate::*;

#[tokio::test]
async fn test_shutdown_drains_in_flight_session() {
    // Answers only after a pause, so the session is mid-stream at shutdown.
    let processor = spawn_processor(|stream| async move {
        let (mut chunks, mut results) = stream.split();
        while let Ok(Some(chunk)) = chunks.receive().await {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = results
                .send(&ResultMessage::new(false, "late but delivered", chunk.timestamp))
                .await;
            if chunk.is_last {
                break;
            }
        }
        let _ = results.finish(&Status::ok()).await;
    })
    .await;
    let relay = TestRelay::start(processor).await;
    let relay_addr = relay.addr;

    let mut producer = Producer::connect(relay_addr).await.unwrap();
    producer.send("pending", true).await.unwrap();
    tokio::time::timeout(TEST_DEADLINE, async {
        while relay.sessions.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session was never registered");

    let stats = relay.stats.clone();
    let drained = tokio::spawn(relay.shutdown());

    let (results, status) = producer.collect().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message, "late but delivered");
    assert!(status.is_ok());

    drained.await.unwrap().unwrap();
    assert_eq!(stats.snapshot().completed, 1);

    // No new producers once the listener has drained.
    assert!(TcpStream::connect(relay_addr).await.is_err());
}

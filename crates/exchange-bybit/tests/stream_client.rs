//! Stream client loop behavior against a local WebSocket server: bad
//! frames must not tear down a live connection, and a stop signal must cut
//! the reconnect wait short.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;

use crypto_pipeline_bybit::{BybitStreamClient, ConnectionState, LiquidationWriter};
use crypto_pipeline_core::StreamConfig;
use crypto_pipeline_data::{Database, LiquidationRepository};

async fn temp_repo(dir: &tempfile::TempDir) -> LiquidationRepository {
    let path = dir.path().join("stream.db");
    let db = Database::connect(path.to_str().unwrap()).await.unwrap();
    db.ensure_schema().await.unwrap();
    LiquidationRepository::new(db.pool())
}

fn stream_config(addr: SocketAddr) -> StreamConfig {
    StreamConfig {
        ws_url: format!("ws://{addr}"),
        symbols: vec!["BTCUSDT".to_string()],
        ..StreamConfig::default()
    }
}

#[tokio::test]
async fn malformed_frame_does_not_drop_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let connections = Arc::new(AtomicUsize::new(0));
    let server_conns = Arc::clone(&connections);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            server_conns.fetch_add(1, Ordering::SeqCst);
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            // Subscription request arrives first
            let _ = ws.next().await;

            // Garbage, then a real push on the same connection
            let _ = ws
                .send(Message::Text("definitely not json".to_string()))
                .await;
            let push = json!({
                "topic": "liquidation.BTCUSDT",
                "data": [{
                    "symbol": "BTCUSDT",
                    "side": "Sell",
                    "price": "50000",
                    "qty": "0.1",
                    "ts": 1_700_000_000_000_i64
                }]
            });
            let _ = ws.send(Message::Text(push.to_string())).await;

            // Hold the connection open until the client goes away
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let repo = temp_repo(&dir).await;
    let writer = Arc::new(LiquidationWriter::new(
        repo.clone(),
        None,
        1,
        Duration::from_secs(3600),
    ));

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut client = BybitStreamClient::new(stream_config(addr), Arc::clone(&writer), stop_rx);
    let handle = tokio::spawn(async move {
        client.run().await;
        client
    });

    // The valid frame after the garbage one still lands
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while repo.event_count().await.unwrap() < 1 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "event was never persisted"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // One connection throughout: the garbage frame caused no reconnect
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    stop_tx.send(true).unwrap();
    let client = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("client did not stop")
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn stop_interrupts_the_reconnect_wait() {
    // Bind then drop, so connecting to the port fails immediately
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let repo = temp_repo(&dir).await;
    let writer = Arc::new(LiquidationWriter::new(
        repo,
        None,
        100,
        Duration::from_secs(3600),
    ));

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut client = BybitStreamClient::new(stream_config(addr), writer, stop_rx);
    let handle = tokio::spawn(async move {
        client.run().await;
        client
    });

    // Let the first connect fail; the client is now sleeping out the 1s
    // backoff delay
    tokio::time::sleep(Duration::from_millis(200)).await;
    stop_tx.send(true).unwrap();

    // The stop must cut the sleep short, not wait out the full delay
    let client = tokio::time::timeout(Duration::from_millis(600), handle)
        .await
        .expect("stop was not honored before the backoff elapsed")
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

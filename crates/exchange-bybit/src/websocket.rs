//! Bybit liquidation stream client.
//!
//! Drives one WebSocket connection at a time through an explicit state
//! machine: connect, subscribe, consume frames, and on any failure wait out
//! an exponential backoff before the next attempt. The loop is flat; a
//! failed connection never nests a retry inside itself.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crypto_pipeline_core::StreamConfig;

use crate::backoff::Backoff;
use crate::normalizer;
use crate::writer::LiquidationWriter;

/// Lifecycle of the single managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
    ReconnectWait,
}

/// Where an inbound text frame goes after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRoute {
    /// A liquidation push; carries the individual data records.
    Liquidations(Vec<Value>),
    /// Subscription acks, pongs, and pushes for other topics.
    Ignored,
    /// Not decodable as a routable frame. Logged and dropped.
    Malformed,
}

/// Classifies one text frame against the configured topic prefix.
#[must_use]
pub fn classify_frame(text: &str, topic_prefix: &str) -> FrameRoute {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return FrameRoute::Malformed,
    };

    let Some(topic) = value.get("topic").and_then(Value::as_str) else {
        // Operational frames (subscribe acks, pongs) carry no topic
        return FrameRoute::Ignored;
    };
    if !topic.starts_with(topic_prefix) {
        return FrameRoute::Ignored;
    }

    match value.get("data") {
        Some(Value::Array(records)) => FrameRoute::Liquidations(records.clone()),
        Some(record @ Value::Object(_)) => FrameRoute::Liquidations(vec![record.clone()]),
        _ => FrameRoute::Malformed,
    }
}

/// WebSocket client feeding normalized liquidation events into a writer.
pub struct BybitStreamClient {
    config: StreamConfig,
    writer: Arc<LiquidationWriter>,
    stop: watch::Receiver<bool>,
    state: ConnectionState,
    backoff: Backoff,
}

impl BybitStreamClient {
    #[must_use]
    pub fn new(
        config: StreamConfig,
        writer: Arc<LiquidationWriter>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            writer,
            stop,
            state: ConnectionState::Disconnected,
            backoff: Backoff::new(),
        }
    }

    /// Current connection state, for logging and supervision.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Runs the connect / consume / backoff loop until a stop is signaled.
    /// Connection errors are logged and retried, never propagated.
    pub async fn run(&mut self) {
        loop {
            if *self.stop.borrow() {
                break;
            }

            self.state = ConnectionState::Connecting;
            match self.run_connection().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!("Stream connection lost: {:#}", e);
                }
            }

            if *self.stop.borrow() {
                break;
            }

            self.state = ConnectionState::ReconnectWait;
            let delay = self.backoff.next_delay();
            tracing::info!("Reconnecting in {}s", delay.as_secs());

            let mut stop = self.stop.clone();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.changed() => break,
            }
        }

        self.state = ConnectionState::Disconnected;
        tracing::info!("Stream client stopped");
    }

    /// Runs one connection to completion. Returns `Ok` only when a stop was
    /// signaled; every other exit is a connection failure.
    async fn run_connection(&mut self) -> Result<()> {
        let (ws, _) = connect_async(&self.config.ws_url)
            .await
            .with_context(|| format!("Failed to connect to {}", self.config.ws_url))?;
        let (mut sink, mut source) = ws.split();

        for symbol in &self.config.symbols {
            let topic = self.config.topic_for(symbol);
            let subscribe = json!({"op": "subscribe", "args": [topic]});
            sink.send(Message::Text(subscribe.to_string()))
                .await
                .context("Failed to send subscription")?;
        }

        self.state = ConnectionState::Subscribed;
        self.backoff.reset();
        tracing::info!(
            "Subscribed to {} liquidation topics on {}",
            self.config.symbols.len(),
            self.config.ws_url
        );

        let mut stop = self.stop.clone();
        loop {
            tokio::select! {
                _ = stop.changed() => {
                    return Ok(());
                }
                frame = source.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text).await,
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload))
                                .await
                                .context("Failed to answer ping")?;
                        }
                        Some(Ok(Message::Close(_))) => bail!("Server closed the connection"),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                        None => bail!("WebSocket stream ended"),
                    }
                }
            }
        }
    }

    /// Routes one text frame. Malformed frames are dropped with a warning;
    /// the connection stays up.
    async fn handle_frame(&self, text: &str) {
        match classify_frame(text, self.config.topic_prefix()) {
            FrameRoute::Liquidations(records) => {
                let ingest_ms = Utc::now().timestamp_millis();
                for record in &records {
                    if let Some(event) = normalizer::normalize(record, ingest_ms) {
                        self.writer.submit(event).await;
                    }
                }
            }
            FrameRoute::Ignored => {}
            FrameRoute::Malformed => {
                tracing::warn!("Dropping malformed frame ({} bytes)", text.len());
            }
        }
    }
}

//! WebSocket transport for the signaling protocol

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::signaling::{ClientSignal, ServerSignal, SignalChannel};
use crate::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Slot holding the single live subscriber, shared with the reader task
type SubscriberSlot = Arc<Mutex<Option<mpsc::UnboundedSender<ServerSignal>>>>;

/// [`SignalChannel`] over a WebSocket connection
///
/// Outbound signals are serialized to JSON text frames and pushed through a
/// writer task; inbound text frames are decoded and forwarded to the current
/// subscriber. Frames that fail to decode are logged and dropped so a
/// misbehaving server cannot take the channel down.
pub struct WsSignalChannel {
    tx: mpsc::UnboundedSender<Message>,
    subscriber: SubscriberSlot,
}

impl WsSignalChannel {
    /// Connect to the signaling server named by `config`
    ///
    /// Spawns the writer and reader tasks; the returned channel is ready for
    /// [`SignalChannel::emit`] and [`SignalChannel::subscribe`] immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocketError`] when the connection cannot be
    /// established within `config.connect_timeout_secs`.
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        let url = &config.signaling_url;
        info!("Connecting to signaling server: {}", url);

        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                Error::WebSocketError(format!(
                    "Timed out connecting to {} after {}s",
                    url, config.connect_timeout_secs
                ))
            })?
            .map_err(|e| Error::WebSocketError(format!("Failed to connect: {}", e)))?;

        info!("Connected to signaling server");

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber: SubscriberSlot = Arc::new(Mutex::new(None));

        tokio::spawn(Self::writer_task(write, rx));
        tokio::spawn(Self::reader_task(read, Arc::clone(&subscriber)));

        Ok(Self { tx, subscriber })
    }

    /// Writer task: drains queued frames into the WebSocket
    async fn writer_task(
        mut write: futures_util::stream::SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<Message>,
    ) {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }

        debug!("Writer task terminated");
    }

    /// Reader task: decodes inbound frames and forwards them to the subscriber
    async fn reader_task(
        mut read: futures_util::stream::SplitStream<WsStream>,
        subscriber: SubscriberSlot,
    ) {
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match ServerSignal::from_json(&text) {
                    Ok(signal) => Self::forward(&subscriber, signal),
                    Err(e) => warn!("Dropping undecodable signaling frame: {}", e),
                },
                Ok(Message::Close(_)) => {
                    info!("WebSocket connection closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // Dropping the sender ends the subscriber's stream.
        subscriber.lock().unwrap().take();
        debug!("Reader task terminated");
    }

    fn forward(subscriber: &SubscriberSlot, signal: ServerSignal) {
        let mut slot = subscriber.lock().unwrap();
        match slot.as_ref() {
            Some(tx) => {
                if tx.send(signal).is_err() {
                    debug!("Subscriber dropped, discarding signal");
                    slot.take();
                }
            }
            None => debug!(action = signal.action(), "no subscriber, discarding signal"),
        }
    }
}

#[async_trait]
impl SignalChannel for WsSignalChannel {
    async fn emit(&self, signal: ClientSignal) -> Result<()> {
        let json = signal.to_json()?;
        debug!(action = signal.action(), "emitting signal");

        self.tx
            .send(Message::Text(json))
            .map_err(|e| Error::SignalingError(format!("Failed to queue message: {}", e)))?;

        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscriber.lock().unwrap() = Some(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_with_slot() -> (WsSignalChannel, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = WsSignalChannel {
            tx,
            subscriber: Arc::new(Mutex::new(None)),
        };
        (channel, rx)
    }

    #[tokio::test]
    async fn test_emit_queues_text_frame() {
        let (channel, mut rx) = channel_with_slot();
        channel
            .emit(ClientSignal::Join {
                room: "room-1".to_string(),
            })
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            Message::Text(text) => {
                assert_eq!(text, r#"{"action":"join","room":"room-1"}"#);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_emit_fails_after_writer_gone() {
        let (channel, rx) = channel_with_slot();
        drop(rx);

        let err = channel.emit(ClientSignal::Leave).await.unwrap_err();
        assert!(matches!(err, Error::SignalingError(_)));
    }

    #[tokio::test]
    async fn test_forward_reaches_current_subscriber() {
        let (channel, _rx) = channel_with_slot();
        let mut sub = channel.subscribe();

        WsSignalChannel::forward(
            &channel.subscriber,
            ServerSignal::RemovePeer {
                peer_id: "peer-1".into(),
            },
        );

        assert_eq!(
            sub.recv().await.unwrap(),
            ServerSignal::RemovePeer {
                peer_id: "peer-1".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_subscribe_replaces_previous_subscriber() {
        let (channel, _rx) = channel_with_slot();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        WsSignalChannel::forward(
            &channel.subscriber,
            ServerSignal::RemovePeer {
                peer_id: "peer-1".into(),
            },
        );

        // The first receiver's stream ended when it was replaced.
        assert!(first.recv().await.is_none());
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_forward_without_subscriber_discards() {
        let (channel, _rx) = channel_with_slot();
        WsSignalChannel::forward(
            &channel.subscriber,
            ServerSignal::RemovePeer {
                peer_id: "peer-1".into(),
            },
        );
        // Nothing to assert beyond not panicking; the slot stays empty.
        assert!(channel.subscriber.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_clears_slot() {
        let (channel, _rx) = channel_with_slot();
        let sub = channel.subscribe();
        drop(sub);

        WsSignalChannel::forward(
            &channel.subscriber,
            ServerSignal::RemovePeer {
                peer_id: "peer-1".into(),
            },
        );
        assert!(channel.subscriber.lock().unwrap().is_none());
    }
}

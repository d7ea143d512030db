//! Injected signaling channel capability

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::signaling::{ClientSignal, ServerSignal};
use crate::Result;

/// Bidirectional signaling transport between this client and the relay
/// server
///
/// Sessions emit [`ClientSignal`]s and consume the stream of
/// [`ServerSignal`]s. A channel carries one subscriber at a time:
/// `subscribe` hands out a fresh receiver and detaches any previous one,
/// matching the one-session-per-channel lifecycle. Dropping the receiver
/// unsubscribes.
#[async_trait]
pub trait SignalChannel: Send + Sync {
    /// Send a signal to the relay server
    async fn emit(&self, signal: ClientSignal) -> Result<()>;

    /// Obtain the inbound signal stream
    ///
    /// The stream ends when the underlying transport closes.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerSignal>;
}

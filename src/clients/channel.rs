//! # ChannelClient: hands events to an in-process receiver.
//!
//! The bridge for transports that run their own task (e.g. a websocket connection loop):
//! the bus pushes events into an unbounded channel and the transport drains it.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::clients::Client;
use crate::events::ClientEvent;

/// Client that forwards every event into a channel.
pub struct ChannelClient {
    id: String,
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelClient {
    /// Creates the client and the receiving end of its channel.
    pub fn new(id: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { id: id.into(), tx }), rx)
    }
}

#[async_trait]
impl Client for ChannelClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, event: &ClientEvent) -> io::Result<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "receiver dropped"))
    }
}

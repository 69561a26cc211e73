//! Client handles and outbound forwarding
//!
//! A [`Client`] wraps the write side of one connection. Once registered, the
//! hub owns the client's outbound queue and a dedicated task drains that queue
//! into the connection.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, Sink, SinkExt};
use tokio::sync::mpsc;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Allocate the next id
    pub fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Forwarder = Box<dyn FnOnce(mpsc::Receiver<Bytes>) -> BoxFuture<'static, ()> + Send>;

/// One connection, ready to be registered with the hub
pub struct Client {
    id: ClientId,
    forwarder: Forwarder,
}

impl Client {
    /// Wrap the write side of a connection
    ///
    /// Nothing is written until the hub registers the client.
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<Bytes> + Send + Unpin + 'static,
        S::Error: Display + Send,
    {
        let id = ClientId::next();
        let forwarder: Forwarder = Box::new(move |queue| forward(id, sink, queue).boxed());

        Self { id, forwarder }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Create the outbound queue and spawn the forwarding task
    ///
    /// Returns the write side of the queue.
    pub(crate) fn start(self, queue_capacity: usize) -> mpsc::Sender<Bytes> {
        let (tx, rx) = mpsc::channel(queue_capacity);
        tokio::spawn((self.forwarder)(rx));
        tx
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("id", &self.id).finish()
    }
}

/// Drain the queue into the connection until the queue closes
async fn forward<S>(id: ClientId, mut sink: S, mut queue: mpsc::Receiver<Bytes>)
where
    S: Sink<Bytes> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = queue.recv().await {
        if let Err(e) = sink.send(frame).await {
            tracing::debug!(client = %id, error = %e, "Write failed, stopping forwarder");
            return;
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!(client = %id, error = %e, "Error closing connection");
    }

    tracing::debug!(client = %id, "Forwarder finished");
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;

    use super::*;

    #[test]
    fn test_client_ids_increase() {
        let a = ClientId::next();
        let b = ClientId::next();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_forwarder_drains_then_closes() {
        let (sink, mut wire) = fmpsc::unbounded::<Bytes>();
        let client = Client::new(sink);

        let queue = client.start(8);
        queue.send(Bytes::from_static(b"1a|x")).await.unwrap();
        queue.send(Bytes::from_static(b"1a|y")).await.unwrap();
        drop(queue);

        assert_eq!(wire.next().await, Some(Bytes::from_static(b"1a|x")));
        assert_eq!(wire.next().await, Some(Bytes::from_static(b"1a|y")));
        // Connection closed once the queue is gone
        assert_eq!(wire.next().await, None);
    }

    #[tokio::test]
    async fn test_forwarder_stops_on_write_error() {
        let (sink, wire) = fmpsc::unbounded::<Bytes>();
        drop(wire);

        let client = Client::new(sink);
        let queue = client.start(8);
        queue.send(Bytes::from_static(b"lost")).await.unwrap();

        // Forwarder exits and drops the receiver
        tokio::time::timeout(std::time::Duration::from_secs(1), queue.closed())
            .await
            .unwrap();
    }
}

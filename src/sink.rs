//! # Subscriber sinks: per-subscriber delivery channels.
//!
//! A sink pair is created with [`channel`], mirroring
//! [`tokio::sync::mpsc::channel`]:
//!
//! - [`Sink`] is the write-only half. The caller hands it to
//!   [`Topic::subscribe`](crate::Topic::subscribe), which **moves** it into
//!   the topic: after a successful subscription only the coordinator can
//!   write to or close it. A sink that was never accepted (e.g. the
//!   subscribe request was cancelled) stays with the caller.
//! - [`SinkReceiver`] stays with the consumer, which drains it until
//!   end-of-stream (`recv()` returning `None`).
//!
//! Every pair carries a process-unique [`SinkId`]. Because `unsubscribe`
//! runs after ownership of the sink has moved into the topic, the id is the
//! name by which the caller refers to the subscription afterwards.
//!
//! ## Consumer contract
//! After subscribing, keep draining the receiver until it closes. Delivery
//! into a full sink blocks the whole topic; a consumer that wants isolation
//! from its own slowness must size the sink's buffer accordingly (or drain
//! into its own intermediary).

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Global counter for minting process-unique sink ids.
static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a sink pair.
///
/// `Copy`, so the caller can keep it after the [`Sink`] itself has moved
/// into a topic, and use it for
/// [`Topic::unsubscribe`](crate::Topic::unsubscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

/// Creates a connected ([`Sink`], [`SinkReceiver`]) pair with the given
/// buffer capacity (clamped to at least 1).
pub fn channel<T>(capacity: usize) -> (Sink<T>, SinkReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let id = SinkId(NEXT_SINK_ID.fetch_add(1, AtomicOrdering::Relaxed));
    (Sink { id, tx }, SinkReceiver { id, rx })
}

/// Write-only half of a subscriber channel.
///
/// Deliberately not `Clone`: a subscription transfers *exclusive*
/// write/close rights to the coordinator, and move semantics are what
/// enforce that transfer. Dropping a `Sink` closes the channel, which the
/// consumer observes as end-of-stream.
pub struct Sink<T> {
    id: SinkId,
    tx: mpsc::Sender<T>,
}

impl<T> Sink<T> {
    /// Returns the identity of this sink pair.
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Delivers one value, waiting for buffer space.
    ///
    /// Fails only when the consumer has dropped its receiver; the
    /// coordinator treats that as permanent and evicts the sink.
    pub(crate) async fn deliver(&self, value: T) -> Result<(), mpsc::error::SendError<T>> {
        self.tx.send(value).await
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("id", &self.id).finish()
    }
}

/// Consumer half of a subscriber channel.
///
/// Yields values in publish order until the sink is closed (by
/// unsubscription, topic termination, or the caller dropping an unaccepted
/// [`Sink`]), after which [`SinkReceiver::recv`] returns `None`.
///
/// Also implements [`futures::Stream`], so the usual combinators apply:
///
/// ```
/// use futures::StreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (sink, rx) = fanout::sink::channel::<u32>(4);
/// drop(sink);
/// let values: Vec<u32> = rx.collect().await;
/// assert!(values.is_empty());
/// # }
/// ```
pub struct SinkReceiver<T> {
    id: SinkId,
    rx: mpsc::Receiver<T>,
}

impl<T> SinkReceiver<T> {
    /// Returns the identity of this sink pair.
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Receives the next value, or `None` once the sink has been closed and
    /// all buffered values have been drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> fmt::Debug for SinkReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkReceiver").field("id", &self.id).finish()
    }
}

impl<T> Stream for SinkReceiver<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_shared_across_the_pair() {
        let (a_tx, a_rx) = channel::<u8>(1);
        let (b_tx, b_rx) = channel::<u8>(1);

        assert_eq!(a_tx.id(), a_rx.id());
        assert_eq!(b_tx.id(), b_rx.id());
        assert_ne!(a_tx.id(), b_tx.id());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (sink, _rx) = channel::<u8>(0);
        // Channel construction would have panicked on capacity 0.
        let _ = sink.id();
    }

    #[tokio::test]
    async fn test_dropping_sink_closes_the_receiver() {
        let (sink, mut rx) = channel::<u8>(4);
        sink.deliver(7).await.unwrap();
        drop(sink);

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_deliver_fails_after_receiver_drop() {
        let (sink, rx) = channel::<u8>(4);
        drop(rx);

        assert!(sink.deliver(1).await.is_err());
    }
}

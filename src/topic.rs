//! # Topic: the public pub-sub handle.
//!
//! [`Topic`] is a cheaply cloneable handle to one coordinator task. Every
//! operation is a handshake through the coordinator's mailbox: the caller
//! suspends until the request is enqueued (and the mailbox FIFO order is the
//! acceptance order that all delivery guarantees are stated in).
//!
//! The `_with` variants race the handshake against a per-call
//! [`CancellationToken`]; a request abandoned that way was never enqueued,
//! so "cancelled" and "accepted" are mutually exclusive outcomes.
//!
//! ## Lifecycle
//! ```text
//! Topic::new(token) ──► coordinator task (Running)
//!      │
//!      ├─ publish / subscribe / unsubscribe ... (Running)
//!      │
//!      └─ close() accepted ─┐
//!         token cancelled  ─┼──► Terminated: every owned sink closed once,
//!         all handles drop ─┘    all later submissions fail with `Closed`
//! ```

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::TopicConfig;
use crate::core::{Coordinator, Request};
use crate::error::{Error, SubscribeError};
use crate::sink::{Sink, SinkId};

/// A typed single-process pub-sub topic.
///
/// Values published to the topic are fanned out to every currently
/// subscribed [`Sink`], one blocking delivery at a time, by a single
/// coordinator task that exclusively owns the subscriber set.
///
/// ### Guarantees
/// - Requests accepted by the coordinator are totally ordered; a subscriber
///   receives exactly the values accepted between its subscribe and its
///   unsubscribe (or topic termination), in publish order.
/// - Every sink the topic ever took ownership of is closed exactly once.
/// - No ordering is promised *across* subscribers for a single publish.
///
/// ### Trade-off
/// Delivery blocks on each sink in turn: one slow (or stalled) subscriber
/// stalls the whole topic. A consumer wanting isolation must buffer its own
/// sink generously or drain through an intermediary.
pub struct Topic<T> {
    mailbox: mpsc::Sender<Request<T>>,
    done: CancellationToken,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
            done: self.done.clone(),
        }
    }
}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("terminated", &self.done.is_cancelled())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Topic<T> {
    /// Creates a topic and spawns its coordinator immediately (non-blocking).
    ///
    /// The topic terminates when `token` is cancelled or [`Topic::close`] is
    /// accepted, whichever comes first.
    pub fn new(token: CancellationToken) -> Self {
        Self::with_config(token, TopicConfig::default())
    }

    /// Creates a topic with an explicit [`TopicConfig`].
    pub fn with_config(token: CancellationToken, config: TopicConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let done = CancellationToken::new();
        let coordinator = Coordinator::new(rx, token, done.clone());
        tokio::spawn(coordinator.run());
        Self { mailbox: tx, done }
    }

    /// Publishes `value` to all current subscribers.
    ///
    /// Blocks until the coordinator accepts the value. Returns
    /// [`Error::Closed`] if the topic has terminated — publishing after
    /// close is invalid usage and never silently succeeds.
    pub async fn publish(&self, value: T) -> Result<(), Error> {
        self.mailbox
            .send(Request::Publish(value))
            .await
            .map_err(|_| Error::Closed)
    }

    /// Publishes `value`, abandoning the attempt if `ctx` fires first.
    ///
    /// A cancelled publish was never enqueued: no subscriber will ever
    /// observe the value. Cancellation is checked before acceptance, so a
    /// token that is already cancelled always wins.
    pub async fn publish_with(&self, ctx: &CancellationToken, value: T) -> Result<(), Error> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            permit = self.mailbox.reserve() => match permit {
                Ok(permit) => {
                    permit.send(Request::Publish(value));
                    Ok(())
                }
                Err(_) => Err(Error::Closed),
            },
        }
    }

    /// Registers `sink` as a subscriber, transferring ownership to the
    /// topic, and returns its [`SinkId`] for later unsubscription.
    ///
    /// Once accepted, only the coordinator writes to or closes the sink.
    /// Returns [`Error::Closed`] if the topic has terminated; the sink is
    /// dropped with the error on that path (use
    /// [`Topic::subscribe_with`] to get it back instead).
    pub async fn subscribe(&self, sink: Sink<T>) -> Result<SinkId, Error> {
        let id = sink.id();
        self.mailbox
            .send(Request::Subscribe(sink))
            .await
            .map_err(|_| Error::Closed)?;
        Ok(id)
    }

    /// Registers `sink`, abandoning the attempt if `ctx` fires first.
    ///
    /// On failure the sink is handed back inside the [`SubscribeError`]:
    /// the topic neither registered nor closed it, and the caller resumes
    /// full ownership.
    pub async fn subscribe_with(
        &self,
        ctx: &CancellationToken,
        sink: Sink<T>,
    ) -> Result<SinkId, SubscribeError<T>> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(SubscribeError {
                kind: Error::Cancelled,
                sink,
            }),
            permit = self.mailbox.reserve() => match permit {
                Ok(permit) => {
                    let id = sink.id();
                    permit.send(Request::Subscribe(sink));
                    Ok(id)
                }
                Err(_) => Err(SubscribeError {
                    kind: Error::Closed,
                    sink,
                }),
            },
        }
    }

    /// Removes the subscriber identified by `id` and closes its sink.
    ///
    /// Unsubscribing an id that is not currently subscribed is a silent
    /// no-op. Returns [`Error::Closed`] if the topic has terminated.
    pub async fn unsubscribe(&self, id: SinkId) -> Result<(), Error> {
        self.mailbox
            .send(Request::Unsubscribe(id))
            .await
            .map_err(|_| Error::Closed)
    }

    /// Unsubscribes, abandoning the attempt if `ctx` fires first.
    ///
    /// On cancellation the sink remains subscribed and keeps receiving.
    pub async fn unsubscribe_with(
        &self,
        ctx: &CancellationToken,
        id: SinkId,
    ) -> Result<(), Error> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            permit = self.mailbox.reserve() => match permit {
                Ok(permit) => {
                    permit.send(Request::Unsubscribe(id));
                    Ok(())
                }
                Err(_) => Err(Error::Closed),
            },
        }
    }

    /// Initiates shutdown.
    ///
    /// The close request is ordered after every previously accepted request;
    /// once the coordinator accepts it, no further requests are accepted and
    /// every currently subscribed sink is closed exactly once.
    ///
    /// Double-close idempotency is undefined: closing an already terminated
    /// topic reports [`Error::Closed`], while a second close racing the
    /// first may be absorbed.
    pub async fn close(&self) -> Result<(), Error> {
        self.mailbox
            .send(Request::Close)
            .await
            .map_err(|_| Error::Closed)
    }

    /// Completes once the topic has terminated and its termination sweep
    /// (closing all owned sinks) has finished.
    pub async fn terminated(&self) {
        self.done.cancelled().await;
    }

    /// Returns `true` once the topic has terminated.
    pub fn is_terminated(&self) -> bool {
        self.done.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::sink;

    #[tokio::test]
    async fn test_publish_order_is_preserved_per_subscriber() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(8);
        topic.subscribe(s1).await.unwrap();

        let publisher = {
            let topic = topic.clone();
            tokio::spawn(async move {
                for i in 0..3 {
                    topic.publish(i).await.unwrap();
                }
                topic.close().await.unwrap();
            })
        };

        let mut got = Vec::new();
        while let Some(v) = rx.recv().await {
            got.push(v);
        }
        publisher.await.unwrap();

        assert_eq!(got, vec![0, 1, 2]);
        assert!(topic.is_terminated());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_only_later_values() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, rx1) = sink::channel(8);
        let (s2, rx2) = sink::channel(8);

        topic.subscribe(s1).await.unwrap();
        topic.publish(10).await.unwrap();
        topic.subscribe(s2).await.unwrap();
        topic.publish(20).await.unwrap();
        topic.close().await.unwrap();

        assert_eq!(rx1.collect::<Vec<_>>().await, vec![10, 20]);
        assert_eq!(rx2.collect::<Vec<_>>().await, vec![20]);
    }

    #[tokio::test]
    async fn test_unsubscribed_sink_closes_without_values() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(4);
        let id = topic.subscribe(s1).await.unwrap();

        topic.unsubscribe(id).await.unwrap();
        topic.publish(5).await.unwrap();
        topic.close().await.unwrap();

        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancelled_subscribe_is_never_registered() {
        let topic = Topic::new(CancellationToken::new());
        let (sink, mut rx) = sink::channel(4);
        let id = sink.id();

        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = topic.subscribe_with(&ctx, sink).await.unwrap_err();
        assert_eq!(err.kind, Error::Cancelled);

        // Ownership came back: the caller holds the same sink, unclosed.
        let sink = err.into_sink();
        assert_eq!(sink.id(), id);

        topic.publish(42).await.unwrap();
        topic.close().await.unwrap();
        topic.terminated().await;

        // The would-be subscriber never observes the publish.
        drop(sink);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancelled_publish_is_never_observed() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(4);
        topic.subscribe(s1).await.unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(topic.publish_with(&ctx, 99).await, Err(Error::Cancelled));

        topic.publish(1).await.unwrap();
        topic.close().await.unwrap();

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancelled_unsubscribe_leaves_sink_subscribed() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(4);
        let id = topic.subscribe(s1).await.unwrap();

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(
            topic.unsubscribe_with(&ctx, id).await,
            Err(Error::Cancelled)
        );

        topic.publish(7).await.unwrap();
        topic.close().await.unwrap();

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribing_unknown_sink_is_a_noop() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(4);
        let (stray, _stray_rx) = sink::channel::<u32>(1);
        topic.subscribe(s1).await.unwrap();

        topic.unsubscribe(stray.id()).await.unwrap();
        topic.publish(3u32).await.unwrap();
        topic.close().await.unwrap();

        assert_eq!(rx.recv().await, Some(3));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_with_closed() {
        let topic = Topic::<u32>::new(CancellationToken::new());
        topic.close().await.unwrap();
        topic.terminated().await;
        assert!(topic.is_terminated());

        assert_eq!(topic.publish(1).await, Err(Error::Closed));
        assert_eq!(topic.close().await, Err(Error::Closed));

        let (sink, _rx) = sink::channel(1);
        let id = sink.id();
        assert_eq!(topic.subscribe(sink).await, Err(Error::Closed));
        assert_eq!(topic.unsubscribe(id).await, Err(Error::Closed));

        // The cancellable subscribe reports Closed and returns the sink.
        let ctx = CancellationToken::new();
        let (sink2, _rx2) = sink::channel::<u32>(1);
        let err = topic.subscribe_with(&ctx, sink2).await.unwrap_err();
        assert_eq!(err.kind, Error::Closed);
    }

    #[tokio::test]
    async fn test_lifetime_token_cancellation_terminates_topic() {
        let token = CancellationToken::new();
        let topic = Topic::new(token.clone());
        let (s1, mut rx) = sink::channel(4);
        topic.subscribe(s1).await.unwrap();

        token.cancel();
        topic.terminated().await;

        assert_eq!(rx.recv().await, None);
        assert_eq!(topic.publish(5).await, Err(Error::Closed));
    }

    #[tokio::test]
    async fn test_dropping_every_handle_terminates_topic() {
        let topic: Topic<i32> = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(4);
        topic.subscribe(s1).await.unwrap();

        drop(topic);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_evicted_without_disturbing_others() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, rx1) = sink::channel(8);
        let (s2, mut rx2) = sink::channel(8);
        topic.subscribe(s1).await.unwrap();
        topic.subscribe(s2).await.unwrap();

        drop(rx1);
        topic.publish(1).await.unwrap();
        topic.publish(2).await.unwrap();
        topic.close().await.unwrap();

        assert_eq!(rx2.recv().await, Some(1));
        assert_eq!(rx2.recv().await, Some(2));
        assert_eq!(rx2.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_publish_blocked_behind_slow_subscriber() {
        let topic = Topic::new(CancellationToken::new());
        let (s1, mut rx) = sink::channel(1);
        topic.subscribe(s1).await.unwrap();

        // Fill the sink and the mailbox so the coordinator is stuck
        // mid-delivery and the next submission has to wait.
        topic.publish(1).await.unwrap();
        topic.publish(2).await.unwrap();
        topic.publish(3).await.unwrap();

        let ctx = CancellationToken::new();
        let canceller = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                ctx.cancel();
            })
        };

        assert_eq!(topic.publish_with(&ctx, 4).await, Err(Error::Cancelled));
        canceller.await.unwrap();

        // Everything accepted before the cancellation still arrives.
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));

        topic.close().await.unwrap();
        assert_eq!(rx.recv().await, None);
    }
}

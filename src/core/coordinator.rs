//! # Coordinator: the serialized topic actor.
//!
//! One coordinator task is spawned per [`Topic`](crate::Topic). It owns the
//! subscriber set outright and consumes a single mailbox of tagged requests,
//! processing exactly one per iteration:
//!
//! ```text
//! callers ──► [mailbox: Publish | Subscribe | Unsubscribe | Close] ─┐
//!                                                                   ▼
//!                                              ┌──────────────────────────┐
//! lifetime token ── cancelled() ─────────────► │  Coordinator (one task)  │
//!                                              │  subscribers:            │
//!                                              │    HashMap<SinkId, Sink> │
//!                                              └──────┬───────────────────┘
//!                                                     │ send().await per sink
//!                                            ┌────────┼────────┐
//!                                            ▼        ▼        ▼
//!                                          sink A   sink B   sink C
//! ```
//!
//! ## Rules
//! - Mailbox FIFO order **is** the acceptance order; all delivery guarantees
//!   derive from it.
//! - Broadcast delivers to every owned sink with a blocking send before the
//!   next request is dequeued; a slow subscriber stalls the topic.
//! - Iteration order over the subscriber set is unspecified.
//! - On exit (Close accepted, lifetime token cancelled, or every handle
//!   dropped) each owned sink is closed exactly once, then the `done` token
//!   is cancelled so submitters and `Topic::terminated()` observe the end.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::sink::{Sink, SinkId};

/// Tagged request variants accepted through the topic mailbox.
pub(crate) enum Request<T> {
    /// Broadcast a value to every current subscriber.
    Publish(T),
    /// Take ownership of a sink and add it to the subscriber set.
    Subscribe(Sink<T>),
    /// Remove a sink from the set and close it (no-op if absent).
    Unsubscribe(SinkId),
    /// Stop accepting requests and run the termination sweep.
    Close,
}

/// The serialized actor owning the subscriber set.
pub(crate) struct Coordinator<T> {
    mailbox: mpsc::Receiver<Request<T>>,
    token: CancellationToken,
    done: CancellationToken,
    subscribers: HashMap<SinkId, Sink<T>>,
}

impl<T: Clone + Send + 'static> Coordinator<T> {
    pub(crate) fn new(
        mailbox: mpsc::Receiver<Request<T>>,
        token: CancellationToken,
        done: CancellationToken,
    ) -> Self {
        Self {
            mailbox,
            token,
            done,
            subscribers: HashMap::new(),
        }
    }

    /// Runs the event loop until a `Close` is accepted, the lifetime token
    /// is cancelled, or every topic handle has been dropped.
    pub(crate) async fn run(mut self) {
        loop {
            let req = tokio::select! {
                _ = self.token.cancelled() => None,
                req = self.mailbox.recv() => req,
            };

            match req {
                Some(Request::Publish(value)) => self.broadcast(value).await,
                Some(Request::Subscribe(sink)) => self.add(sink),
                Some(Request::Unsubscribe(id)) => self.remove(id),
                Some(Request::Close) | None => break,
            }
        }
        self.terminate();
    }

    /// Delivers `value` to every owned sink, blocking on each in turn.
    ///
    /// A sink whose consumer has dropped its receiver can never be delivered
    /// to again; it is evicted from the set (and thereby closed).
    async fn broadcast(&mut self, value: T) {
        let mut dead: Vec<SinkId> = Vec::new();
        for (id, sink) in &self.subscribers {
            if sink.deliver(value.clone()).await.is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            self.subscribers.remove(&id);
            debug!(sink = ?id, "evicted subscriber with dropped receiver");
        }
    }

    fn add(&mut self, sink: Sink<T>) {
        trace!(sink = ?sink.id(), "subscriber added");
        self.subscribers.insert(sink.id(), sink);
    }

    fn remove(&mut self, id: SinkId) {
        // Dropping the sink closes it; unknown ids are a silent no-op.
        if self.subscribers.remove(&id).is_some() {
            trace!(sink = ?id, "subscriber removed");
        }
    }

    /// Termination sweep: closes every owned sink exactly once and signals
    /// completion through the `done` token.
    fn terminate(mut self) {
        self.mailbox.close();
        let swept = self.subscribers.len();
        self.subscribers.clear();
        if swept > 0 {
            debug!(swept, "topic terminated, remaining sinks closed");
        }
        self.done.cancel();
    }
}

//! Error types returned by [`Topic`](crate::Topic) operations.
//!
//! There is exactly one recoverable error kind, [`Error::Cancelled`]: the
//! caller's own cancellation token fired before the coordinator accepted the
//! request. Everything else that can go wrong is a usage error — operating on
//! a topic that has already terminated — surfaced as the sentinel
//! [`Error::Closed`] rather than silently succeeding.
//!
//! [`SubscribeError`] exists because a failed subscription must hand the sink
//! back: the topic never took ownership of it, so the caller keeps the duty
//! (and the right) to write to it or drop it.

use thiserror::Error;

use crate::sink::Sink;

/// Errors produced by topic operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The per-call cancellation token fired before the coordinator accepted
    /// the request. The request was never enqueued; nothing was delivered,
    /// registered, or closed on its behalf.
    #[error("cancelled before the topic accepted the request")]
    Cancelled,

    /// The topic has terminated (via [`Topic::close`](crate::Topic::close) or
    /// its lifetime token). Submitting requests to a terminated topic is
    /// invalid usage; this sentinel makes the violation visible.
    #[error("topic already terminated")]
    Closed,
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanout::Error;
    ///
    /// assert_eq!(Error::Cancelled.as_label(), "topic_cancelled");
    /// assert_eq!(Error::Closed.as_label(), "topic_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Cancelled => "topic_cancelled",
            Error::Closed => "topic_closed",
        }
    }
}

/// Error returned by [`Topic::subscribe_with`](crate::Topic::subscribe_with).
///
/// Carries the unaccepted [`Sink`] back to the caller, the same way
/// `tokio::sync::mpsc::error::SendError` returns the undelivered value.
/// The topic neither registered nor closed the sink on this path.
#[derive(Error)]
#[error("{kind}")]
pub struct SubscribeError<T> {
    /// Why the subscription was not accepted.
    pub kind: Error,
    /// The sink, still owned by the caller.
    pub sink: Sink<T>,
}

impl<T> SubscribeError<T> {
    /// Consumes the error, returning the sink.
    pub fn into_sink(self) -> Sink<T> {
        self.sink
    }
}

impl<T> std::fmt::Debug for SubscribeError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscribeError")
            .field("kind", &self.kind)
            .field("sink", &self.sink)
            .finish()
    }
}

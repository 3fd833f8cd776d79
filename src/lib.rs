//! # fanout
//!
//! **Fanout** is a typed, single-process publish-subscribe topic for Tokio.
//!
//! A [`Topic<T>`] accepts published values and fans them out to an
//! arbitrary, dynamically changing set of subscribers, each represented by
//! a consumer-owned [`Sink<T>`]. All coordination happens inside one
//! serialized actor task, so add/remove/broadcast/shutdown are race-free
//! without a single lock.
//!
//! ## Architecture
//! ```text
//!  publisher tasks          subscriber tasks
//!   ─ publish(v) ─┐          ┌─ subscribe(sink) / unsubscribe(id)
//!                 ▼          ▼
//!        ┌─────────────────────────┐
//!        │   mailbox (bounded      │   one tagged request per iteration:
//!        │   mpsc, FIFO =          │   Publish | Subscribe | Unsubscribe
//!        │   acceptance order)     │   | Close
//!        └───────────┬─────────────┘
//!                    ▼
//!        ┌─────────────────────────┐
//!        │  Coordinator (1 task)   │◄── CancellationToken (topic lifetime)
//!        │  owns the subscriber    │
//!        │  set; no locks anywhere │
//!        └───────────┬─────────────┘
//!                    │ blocking send per sink, in publish order
//!          ┌─────────┼─────────┐
//!          ▼         ▼         ▼
//!       sink A    sink B    sink C      (closed exactly once, ever:
//!          │         │         │         unsubscribe / eviction / sweep)
//!       consumer  consumer  consumer ── drain until end-of-stream
//! ```
//!
//! ## Semantics
//! - Requests accepted by the coordinator are totally ordered (mailbox
//!   FIFO). A subscriber receives exactly the values accepted between its
//!   subscribe and its unsubscribe (or topic termination), in publish
//!   order. No cross-subscriber ordering is promised.
//! - Subscribing **moves** the sink into the topic; the caller keeps only
//!   the `Copy`able [`SinkId`] and the receiving half.
//! - Delivery blocks per sink: a slow subscriber stalls the topic. Size
//!   sink buffers accordingly.
//! - The `_with` operation variants abandon the handshake when a per-call
//!   [`CancellationToken`](tokio_util::sync::CancellationToken) fires;
//!   a cancelled request was never accepted and has no observable effect.
//!
//! ## Features
//! | Area              | Description                                              | Key types                    |
//! |-------------------|----------------------------------------------------------|------------------------------|
//! | **Topic API**     | Publish, subscribe, unsubscribe, close, await shutdown.  | [`Topic`]                    |
//! | **Sinks**         | Per-subscriber delivery channels with moved ownership.   | [`Sink`], [`SinkReceiver`]   |
//! | **Errors**        | One recoverable kind (`Cancelled`) + closed sentinel.    | [`Error`], [`SubscribeError`]|
//! | **Configuration** | Mailbox capacity tuning.                                 | [`TopicConfig`]              |
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use fanout::{sink, Topic};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fanout::Error> {
//!     let topic = Topic::new(CancellationToken::new());
//!
//!     let (s1, mut rx) = sink::channel(8);
//!     topic.subscribe(s1).await?;
//!
//!     let publisher = {
//!         let topic = topic.clone();
//!         tokio::spawn(async move {
//!             for i in 0..3 {
//!                 topic.publish(i).await.unwrap();
//!             }
//!             topic.close().await.unwrap();
//!         })
//!     };
//!
//!     while let Some(value) = rx.recv().await {
//!         println!("{value}");
//!     }
//!     publisher.await.unwrap();
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
pub mod sink;
mod topic;

// ---- Public re-exports ----

pub use config::TopicConfig;
pub use error::{Error, SubscribeError};
pub use sink::{Sink, SinkId, SinkReceiver};
pub use topic::Topic;

//! Topic core: the coordination actor.
//!
//! The only shared mutable state in the crate — the subscriber set — lives
//! inside [`Coordinator`], which runs as a single spawned task and processes
//! one mailbox request per loop iteration. No other task ever touches the
//! set, which is why no lock exists anywhere in this crate.
//!
//! Internal modules:
//! - [`coordinator`]: the request mailbox variants and the serialized
//!   event loop (broadcast, membership changes, termination sweep).

mod coordinator;

pub(crate) use coordinator::{Coordinator, Request};

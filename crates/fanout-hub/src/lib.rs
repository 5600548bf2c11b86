//! The in-process connection registry and broadcast dispatcher.
//!
//! [`Hub`] is the only thing in the workspace that touches the room index
//! and the global connection set. Everything else — the connection reader,
//! the bus bridge, the ingress handler — talks to it through the cheap,
//! cloneable handle this crate exposes; the mutation itself happens inside
//! a single reconciliation task ([`HubRunner::run`]) so register, unregister
//! and dispatch never race each other.

mod bridge;
mod connection;
mod hub;

pub use connection::{ConnectionHandle, ConnectionWriterHandle, DEFAULT_OUTBOUND_CAPACITY};
pub use hub::{Hub, HubRunner, DEFAULT_QUEUE_CAPACITY};

//! HTTP/WebSocket entrypoint wiring ingress, the hub, the bus and feature
//! dispatch into one process. Split into a library and a thin binary so
//! the router can be exercised directly in integration tests without
//! spinning up a real listener.

pub mod app;
pub mod config;
pub mod connection;
pub mod http;
pub mod ingress;
pub mod state;

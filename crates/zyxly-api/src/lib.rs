//! Async client for the Zyxel NR7101 cellular router's local management API.
//!
//! The router speaks a small JSON-over-HTTP dialect: a cookie-backed session
//! opened through `/UserLogin`, telemetry objects read through the
//! `/cgi-bin/DAL?oid=…` data-access layer, and a handful of `POST` commands
//! (logout, reboot) that carry the session key as a query parameter.
//!
//! - **[`RouterAdapter`]**: the contract every consumer programs against:
//!   login/logout, status and named-object reads, reboot. `zyxly-core` is
//!   generic over it so the polling and entity layers can be exercised with
//!   in-memory fakes.
//! - **[`RouterClient`]**: the shipped `reqwest` implementation.
//! - **[`TransportConfig`]**: TLS, timeout, and cookie-jar settings used to
//!   build the underlying HTTP client.

pub mod adapter;
pub mod auth;
pub mod client;
pub mod error;
pub mod system;
pub mod transport;

pub use adapter::{EncryptionMode, RouterAdapter, Snapshot};
pub use client::RouterClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};

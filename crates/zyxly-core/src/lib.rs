//! Polling, flattening, and entity projection for a Zyxel cellular router.
//!
//! This crate sits between `zyxly-api` and the CLI:
//!
//! - **[`Coordinator`]**: owns the single authoritative telemetry
//!   [`Snapshot`], refreshes it on a fixed interval with at most one refresh
//!   in flight, and records whether the last refresh succeeded. The cached
//!   snapshot lives in a [`SnapshotCache`] that entities read from.
//!
//! - **Flattening & classification** ([`flatten`], [`classify`]): turn a
//!   nested snapshot into ordered `(key path, scalar)` pairs and map each
//!   one onto a known field descriptor or a generic fallback.
//!
//! - **Entities** ([`entity`]): [`SensorEntity`] re-reads its key path from
//!   the live cache on every access; [`RebootButton`] issues the router's
//!   reboot command.
//!
//! - **[`ConfigFlow`]**: validates user-supplied connection details before
//!   they are persisted as a [`ConfigEntry`].
//!
//! - **[`Hub`]**: explicit owner of every loaded entry's runtime state:
//!   setup performs the first refresh and builds entities, unload stops
//!   polling and logs out.

pub mod classify;
pub mod coordinator;
pub mod entity;
pub mod entry;
pub mod error;
pub mod flatten;
pub mod flow;
pub mod hub;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::{DeviceClass, EntityDescriptor, FieldDescriptor, StateClass, classify};
pub use coordinator::{
    Coordinator, DEFAULT_SCAN_INTERVAL, REFRESH_TIMEOUT, SessionState, SnapshotCache,
};
pub use entity::{DeviceInfo, EntityState, RebootButton, SensorEntity, build_sensors};
pub use entry::{ConfigEntry, DOMAIN, EntryData, entry_title};
pub use error::CoreError;
pub use flatten::{FlattenedField, KeyPath, flatten, lookup, unflatten};
pub use flow::{
    ConfigFlow, DEFAULT_HOST, DEFAULT_USERNAME, FlowErrorKind, FlowResult, UserInput,
    normalize_host,
};
pub use hub::{Hub, LoadedEntry};

pub use zyxly_api::{RouterAdapter, RouterClient, Snapshot};

//! Tenant-isolated realtime fan-out
//!
//! The hub brokers authenticated connections into tenant-scoped groups and
//! fans events out to them. Isolation is structural: group names always
//! carry the tenant (a bare per-user group is unrepresentable), a
//! connection only ever joins groups of its own tenant, and inbound frames
//! asserting another tenant are rejected before any handler runs.

pub mod connection;
pub mod error;
pub mod group;
pub mod hub;

pub use connection::{ConnectionId, ConnectionInfo, ConnectionState};
pub use error::{RealtimeError, RealtimeResult};
pub use group::{GroupId, RoleBucket};
pub use hub::{ClientHandle, EventFrame, HandshakeAuth, RealtimeHub};

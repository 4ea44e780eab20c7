//! Wire types for the vehicle telemetry feed.
//!
//! The feed frames whole JSON objects over a streaming connection: a
//! fleet-wide snapshot (`vehicles` array) or a single vehicle record on
//! the per-vehicle detail feed. The feed schema is not under our control,
//! so every field is tolerant: missing numbers default, unknown enum
//! values map to `Unknown`.

pub mod constants;
pub mod vehicle;

pub use vehicle::{FleetSnapshot, GeoPoint, MovementMode, VehicleRecord, VehicleState};

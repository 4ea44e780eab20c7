use serde::{Deserialize, Serialize};

/// Fleet-wide feed frame: one snapshot of every tracked vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub vehicles: Vec<VehicleRecord>,
}

/// One ground vehicle's live telemetry.
///
/// Also the frame shape of the per-vehicle detail feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "type", default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub position: GeoPoint,
    /// Ground speed in km/h.
    #[serde(default)]
    pub speed: f64,
    /// Battery charge in percent.
    #[serde(default)]
    pub battery_level: f64,
    #[serde(default)]
    pub state: VehicleState,
    #[serde(default)]
    pub movement_mode: MovementMode,
    /// Planned route, most recent waypoint first.
    #[serde(default)]
    pub path: Vec<GeoPoint>,
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

/// Operational state reported by a vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VehicleState {
    Idle,
    Moving,
    Charging,
    Maintenance,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Whether a vehicle drives itself or is under manual control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementMode {
    Manual,
    Autonomous,
    #[default]
    #[serde(other)]
    Unknown,
}

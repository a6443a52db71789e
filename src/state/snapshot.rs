//! Simulator state snapshot for logging and ground-station telemetry.

use serde::Serialize;

use crate::error::Result;
use crate::kinematics::wrap_180;
use crate::packet::protocol::VehicleState;

/// Scale from degrees to the integer 1e-7 degree representation
const DEG_TO_E7: f64 = 1.0e7;

/// Latest simulator state, converted to the units telemetry consumers expect
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimStateSnapshot {
    pub time_us: u64,

    /// Attitude in radians; yaw wrapped to [-π, π]
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,

    /// Body-frame acceleration in m/s²
    pub xacc: f64,
    pub yacc: f64,
    pub zacc: f64,

    /// Angular rates in radians/s
    pub xgyro: f64,
    pub ygyro: f64,
    pub zgyro: f64,

    /// Position in degrees × 1e7
    pub lat: i32,
    pub lng: i32,

    /// Altitude above mean sea level in meters
    pub alt: f64,
}

impl SimStateSnapshot {
    pub fn from_vehicle(state: &VehicleState) -> Self {
        Self {
            time_us: state.timestamp_us,
            roll: state.roll_deg.to_radians(),
            pitch: state.pitch_deg.to_radians(),
            yaw: wrap_180(state.yaw_deg).to_radians(),
            xacc: state.x_accel,
            yacc: state.y_accel,
            zacc: state.z_accel,
            xgyro: state.roll_rate.to_radians(),
            ygyro: state.pitch_rate.to_radians(),
            zgyro: state.yaw_rate.to_radians(),
            lat: (state.latitude * DEG_TO_E7) as i32,
            lng: (state.longitude * DEG_TO_E7) as i32,
            alt: state.altitude,
        }
    }

    /// Format as a single JSON Lines record (no trailing newline)
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

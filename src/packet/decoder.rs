//! # FDM Packet Decoder
//!
//! Decodes and validates vehicle state and extra sensor packets.

use bytes::Buf;

use super::protocol::*;
use crate::error::{Result, SitlError};

/// Read the little-endian magic that terminates a packet of `size` bytes
///
/// Returns `None` if the buffer is shorter than `size`.
pub fn peek_magic(bytes: &[u8], size: usize) -> Option<u32> {
    if bytes.len() < size {
        return None;
    }
    let mut tail = &bytes[size - MAGIC_SIZE..size];
    Some(tail.get_u32_le())
}

/// Check length and magic before any field is decoded
fn check_frame(bytes: &[u8], size: usize, expected: u32) -> Result<()> {
    match peek_magic(bytes, size) {
        None => Err(SitlError::ShortBuffer {
            expected: size,
            actual: bytes.len(),
        }),
        Some(found) if found != expected => Err(SitlError::BadMagic { expected, found }),
        Some(_) => Ok(()),
    }
}

/// Decode a vehicle state packet
///
/// # Arguments
///
/// * `bytes` - At least [`VEHICLE_STATE_PACKET_SIZE`] bytes; anything past the
///   packet is ignored
///
/// # Returns
///
/// * `Result<VehicleState>` - Fully populated state, or error
///
/// # Errors
///
/// Returns error if:
/// - Buffer is shorter than the packet (`ShortBuffer`)
/// - Trailing magic is not [`FDM_MAGIC`] (`BadMagic`)
pub fn decode_vehicle_state(bytes: &[u8]) -> Result<VehicleState> {
    check_frame(bytes, VEHICLE_STATE_PACKET_SIZE, FDM_MAGIC)?;

    let mut buf = &bytes[..VEHICLE_STATE_PACKET_SIZE - MAGIC_SIZE];

    // Field order is the protocol; do not reorder
    Ok(VehicleState {
        timestamp_us: buf.get_u64_le(),
        latitude: buf.get_f64_le(),
        longitude: buf.get_f64_le(),
        altitude: buf.get_f64_le(),
        heading: buf.get_f64_le(),
        speed_n: buf.get_f64_le(),
        speed_e: buf.get_f64_le(),
        speed_d: buf.get_f64_le(),
        x_accel: buf.get_f64_le(),
        y_accel: buf.get_f64_le(),
        z_accel: buf.get_f64_le(),
        roll_rate: buf.get_f64_le(),
        pitch_rate: buf.get_f64_le(),
        yaw_rate: buf.get_f64_le(),
        roll_deg: buf.get_f64_le(),
        pitch_deg: buf.get_f64_le(),
        yaw_deg: buf.get_f64_le(),
        airspeed: buf.get_f64_le(),
    })
}

/// Decode an extra sensor packet
///
/// Presence bytes are taken as-is: any non-zero byte marks the sensor present.
/// No consistency check is made between a flag and its value.
///
/// # Errors
///
/// Returns `ShortBuffer` or `BadMagic` under the same rules as
/// [`decode_vehicle_state`], against [`FDM_EXTRAS_MAGIC`].
pub fn decode_extra_sensor_state(bytes: &[u8]) -> Result<ExtraSensorState> {
    check_frame(bytes, EXTRA_SENSOR_PACKET_SIZE, FDM_EXTRAS_MAGIC)?;

    let mut buf = &bytes[..EXTRA_SENSOR_PACKET_SIZE - MAGIC_SIZE];
    let mut extras = ExtraSensorState::new(buf.get_u64_le());

    for sensor in ExtraSensor::ALL {
        let value = buf.get_f64_le();
        let present = buf.get_u8() != 0;
        extras.set_raw(sensor, SensorReading { value, present });
    }

    Ok(extras)
}

/// Decode whichever packet kind the buffer starts with
///
/// The vehicle state magic is checked first, then the extra sensor magic.
///
/// # Errors
///
/// - `ShortBuffer` if neither magic matches and the buffer could still be a
///   partial vehicle state packet
/// - `BadMagic` if a full vehicle packet's worth of bytes matches neither kind
pub fn decode_packet(bytes: &[u8]) -> Result<Packet> {
    if peek_magic(bytes, VEHICLE_STATE_PACKET_SIZE) == Some(FDM_MAGIC) {
        return decode_vehicle_state(bytes).map(Packet::Vehicle);
    }

    if peek_magic(bytes, EXTRA_SENSOR_PACKET_SIZE) == Some(FDM_EXTRAS_MAGIC) {
        return decode_extra_sensor_state(bytes).map(Packet::ExtraSensors);
    }

    match peek_magic(bytes, VEHICLE_STATE_PACKET_SIZE) {
        Some(found) => Err(SitlError::BadMagic {
            expected: FDM_MAGIC,
            found,
        }),
        None => Err(SitlError::ShortBuffer {
            expected: VEHICLE_STATE_PACKET_SIZE,
            actual: bytes.len(),
        }),
    }
}

/// Size in bytes of a decoded packet's wire form
pub fn packet_size(packet: &Packet) -> usize {
    match packet {
        Packet::Vehicle(_) => VEHICLE_STATE_PACKET_SIZE,
        Packet::ExtraSensors(_) => EXTRA_SENSOR_PACKET_SIZE,
    }
}

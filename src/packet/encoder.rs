//! # FDM Packet Encoder
//!
//! Encodes vehicle and extra sensor state into their wire layout.

use bytes::BufMut;

use super::protocol::*;

/// Encode a vehicle state sample into a complete packet
///
/// # Arguments
///
/// * `state` - Vehicle state to encode
///
/// # Returns
///
/// * `Vec<u8>` - Complete packet (148 bytes, little-endian, magic last)
///
/// # Examples
///
/// ```no_run
/// use sitl_bridge::packet::encoder::encode_vehicle_state;
/// use sitl_bridge::packet::protocol::VehicleState;
///
/// let packet = encode_vehicle_state(&VehicleState::default());
/// assert_eq!(packet.len(), 148);
/// ```
pub fn encode_vehicle_state(state: &VehicleState) -> Vec<u8> {
    let mut packet = Vec::with_capacity(VEHICLE_STATE_PACKET_SIZE);

    packet.put_u64_le(state.timestamp_us);
    for value in [
        state.latitude,
        state.longitude,
        state.altitude,
        state.heading,
        state.speed_n,
        state.speed_e,
        state.speed_d,
        state.x_accel,
        state.y_accel,
        state.z_accel,
        state.roll_rate,
        state.pitch_rate,
        state.yaw_rate,
        state.roll_deg,
        state.pitch_deg,
        state.yaw_deg,
        state.airspeed,
    ] {
        packet.put_f64_le(value);
    }
    packet.put_u32_le(FDM_MAGIC);

    packet
}

/// Encode extra sensor readings into a complete packet
///
/// Each sensor contributes its raw value followed by a one-byte presence flag,
/// in [`ExtraSensor::ALL`] order.
pub fn encode_extra_sensor_state(extras: &ExtraSensorState) -> Vec<u8> {
    let mut packet = Vec::with_capacity(EXTRA_SENSOR_PACKET_SIZE);

    packet.put_u64_le(extras.timestamp_us);
    for sensor in ExtraSensor::ALL {
        let reading = extras.raw(sensor);
        packet.put_f64_le(reading.value);
        packet.put_u8(reading.present as u8);
    }
    packet.put_u32_le(FDM_EXTRAS_MAGIC);

    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_vehicle_state_length() {
        let packet = encode_vehicle_state(&VehicleState::default());
        assert_eq!(packet.len(), VEHICLE_STATE_PACKET_SIZE);
    }

    #[test]
    fn test_encode_vehicle_state_magic_is_last() {
        let packet = encode_vehicle_state(&VehicleState::default());
        assert_eq!(&packet[144..], &[0x4f, 0x41, 0x56, 0x4c]);
    }

    #[test]
    fn test_encode_vehicle_state_field_offsets() {
        let state = VehicleState {
            timestamp_us: 0x0102030405060708,
            latitude: 1.5,
            airspeed: -2.0,
            ..Default::default()
        };
        let packet = encode_vehicle_state(&state);

        assert_eq!(&packet[0..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&packet[8..16], &1.5f64.to_le_bytes());
        // airspeed is the 17th f64, right before the magic
        assert_eq!(&packet[136..144], &(-2.0f64).to_le_bytes());
    }

    #[test]
    fn test_encode_extra_sensor_state_layout() {
        let extras = ExtraSensorState::new(9).with(ExtraSensor::SonarDown, Some(4.0));
        let packet = encode_extra_sensor_state(&extras);

        assert_eq!(packet.len(), EXTRA_SENSOR_PACKET_SIZE);
        assert_eq!(&packet[0..8], &9u64.to_le_bytes());
        assert_eq!(&packet[8..16], &4.0f64.to_le_bytes());
        assert_eq!(packet[16], 1);
        assert_eq!(&packet[17..21], &FDM_EXTRAS_MAGIC.to_le_bytes());
    }

    #[test]
    fn test_encode_absent_sensor_flag() {
        let packet = encode_extra_sensor_state(&ExtraSensorState::new(0));
        assert_eq!(packet[16], 0);
    }
}

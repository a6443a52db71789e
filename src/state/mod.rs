//! # SITL State Module
//!
//! Latest simulator state shared between the packet receiver and the rest of
//! the autopilot.
//!
//! This module handles:
//! - Atomically replacing vehicle and extra sensor state on each valid packet
//! - Keeping the previous state when a packet fails to decode
//! - Flagging samples whose timestamp goes backwards
//! - Frame conversion helpers bound to the current attitude
//! - Telemetry snapshots of the current state
//!
//! [`PacketSink`] is the only writer. It is not `Clone` and its methods take
//! `&mut self`, so decodes can never run concurrently. Any number of
//! [`SitlState`] clones may read at the same time.

pub mod snapshot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, warn};

use crate::error::{Result, SitlError};
use crate::kinematics::{
    body_rates_from_euler, dcm_from_euler, earth_rates_from_body, Attitude, BodyRates, EulerRates,
};
use crate::packet::decoder::{decode_extra_sensor_state, decode_packet, decode_vehicle_state};
use crate::packet::protocol::{ExtraSensorState, Packet, VehicleState};
use crate::params::SimulationParameters;

pub use snapshot::SimStateSnapshot;

/// Outcome of storing a decoded packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    /// Timestamp did not go backwards
    Accepted,

    /// Stored, but older than the sample it replaced
    OutOfOrder { previous_us: u64, received_us: u64 },
}

impl PacketStatus {
    fn classify(previous_us: u64, received_us: u64) -> Self {
        if received_us < previous_us {
            PacketStatus::OutOfOrder { previous_us, received_us }
        } else {
            PacketStatus::Accepted
        }
    }

    pub fn is_out_of_order(&self) -> bool {
        matches!(self, PacketStatus::OutOfOrder { .. })
    }
}

/// Packet counters since startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
    pub out_of_order: u64,
}

#[derive(Debug)]
struct Shared {
    vehicle: RwLock<VehicleState>,
    extras: RwLock<Option<ExtraSensorState>>,
    params: Arc<RwLock<SimulationParameters>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
    out_of_order: AtomicU64,
}

// Guarded values are replaced wholesale, so a poisoned lock still holds a
// complete sample.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Writer handle owned by the packet-receiving transport
#[derive(Debug)]
pub struct PacketSink {
    shared: Arc<Shared>,
}

impl PacketSink {
    /// Decode a vehicle state packet and make it the latest state
    ///
    /// # Errors
    ///
    /// Returns the decode error unchanged; the stored state is left as it was.
    pub fn apply_vehicle_packet(&mut self, bytes: &[u8]) -> Result<PacketStatus> {
        let state = decode_vehicle_state(bytes).inspect_err(|e| self.reject(e))?;
        Ok(self.store_vehicle(state))
    }

    /// Decode an extra sensor packet and make it the latest extra sensor state
    pub fn apply_extra_sensor_packet(&mut self, bytes: &[u8]) -> Result<PacketStatus> {
        let extras = decode_extra_sensor_state(bytes).inspect_err(|e| self.reject(e))?;
        Ok(self.store_extras(extras))
    }

    /// Decode whichever packet kind the buffer holds and store it
    ///
    /// Returns the decoded packet alongside its status so the caller can
    /// advance past it in a stream.
    pub fn apply_packet(&mut self, bytes: &[u8]) -> Result<(Packet, PacketStatus)> {
        let packet = decode_packet(bytes).inspect_err(|e| self.reject(e))?;
        let status = match packet {
            Packet::Vehicle(state) => self.store_vehicle(state),
            Packet::ExtraSensors(extras) => self.store_extras(extras),
        };
        Ok((packet, status))
    }

    fn store_vehicle(&self, state: VehicleState) -> PacketStatus {
        let previous_us = {
            let mut guard = write(&self.shared.vehicle);
            let previous_us = guard.timestamp_us;
            *guard = state;
            previous_us
        };
        self.record(PacketStatus::classify(previous_us, state.timestamp_us), "vehicle state")
    }

    fn store_extras(&self, extras: ExtraSensorState) -> PacketStatus {
        let previous = write(&self.shared.extras).replace(extras);
        let previous_us = previous.map_or(0, |p| p.timestamp_us);
        self.record(PacketStatus::classify(previous_us, extras.timestamp_us), "extra sensor")
    }

    fn record(&self, status: PacketStatus, kind: &str) -> PacketStatus {
        self.shared.accepted.fetch_add(1, Ordering::Relaxed);
        if let PacketStatus::OutOfOrder { previous_us, received_us } = status {
            self.shared.out_of_order.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Out-of-order {} packet: {}us after {}us",
                kind, received_us, previous_us
            );
        }
        status
    }

    fn reject(&self, error: &SitlError) {
        self.shared.rejected.fetch_add(1, Ordering::Relaxed);
        debug!("Dropped packet: {}", error);
    }
}

/// Read handle on the latest simulator state
#[derive(Debug, Clone)]
pub struct SitlState {
    shared: Arc<Shared>,
}

impl SitlState {
    /// Create the state store
    ///
    /// # Returns
    ///
    /// * `(PacketSink, SitlState)` - The single writer and a reader handle
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sitl_bridge::params::SimulationParameters;
    /// use sitl_bridge::state::SitlState;
    ///
    /// let (mut sink, state) = SitlState::new(SimulationParameters::new());
    /// # let packet = [0u8; 148];
    /// if sink.apply_vehicle_packet(&packet).is_ok() {
    ///     println!("{:?}", state.latest_vehicle_state());
    /// }
    /// ```
    pub fn new(params: SimulationParameters) -> (PacketSink, SitlState) {
        let shared = Arc::new(Shared {
            vehicle: RwLock::new(VehicleState::default()),
            extras: RwLock::new(None),
            params: Arc::new(RwLock::new(params)),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
        });

        (
            PacketSink { shared: Arc::clone(&shared) },
            SitlState { shared },
        )
    }

    /// Most recent vehicle state; all zero until the first packet arrives
    pub fn latest_vehicle_state(&self) -> VehicleState {
        *read(&self.shared.vehicle)
    }

    /// Most recent extra sensor state, if any simulator has sent one
    pub fn latest_extra_sensor_state(&self) -> Option<ExtraSensorState> {
        *read(&self.shared.extras)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            accepted: self.shared.accepted.load(Ordering::Relaxed),
            rejected: self.shared.rejected.load(Ordering::Relaxed),
            out_of_order: self.shared.out_of_order.load(Ordering::Relaxed),
        }
    }

    /// Shared parameter table, for the configuration-load collaborator
    pub fn params(&self) -> Arc<RwLock<SimulationParameters>> {
        Arc::clone(&self.shared.params)
    }

    /// Run a closure against the current parameter table
    pub fn with_params<R>(&self, f: impl FnOnce(&SimulationParameters) -> R) -> R {
        f(&read(&self.shared.params))
    }

    pub fn attitude(&self) -> Attitude {
        let state = self.latest_vehicle_state();
        Attitude::new(state.roll_deg, state.pitch_deg, state.yaw_deg)
    }

    /// Body-to-earth rotation matrix for the current attitude
    pub fn attitude_dcm(&self) -> Matrix3<f64> {
        dcm_from_euler(&self.attitude())
    }

    /// The latest packet's Euler rates expressed as body rates (p, q, r)
    pub fn body_rates(&self) -> BodyRates {
        let state = self.latest_vehicle_state();
        body_rates_from_euler(
            &Attitude::new(state.roll_deg, state.pitch_deg, state.yaw_deg),
            &EulerRates::new(state.roll_rate, state.pitch_rate, state.yaw_rate),
        )
    }

    /// Convert Euler rates to body rates at the current attitude
    pub fn body_rates_from(&self, euler_rates: &EulerRates) -> BodyRates {
        body_rates_from_euler(&self.attitude(), euler_rates)
    }

    /// Convert body rates (deg/s) to Euler rates at the current attitude
    pub fn earth_rates_from(&self, body_rates: &Vector3<f64>) -> Vector3<f64> {
        earth_rates_from_body(&self.attitude_dcm(), body_rates)
    }

    pub fn snapshot(&self) -> SimStateSnapshot {
        SimStateSnapshot::from_vehicle(&self.latest_vehicle_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::encoder::{encode_extra_sensor_state, encode_vehicle_state};
    use crate::packet::protocol::ExtraSensor;
    use crate::params::ParamValue;
    use assert_approx_eq::assert_approx_eq;
    use std::thread;

    fn scenario_state() -> VehicleState {
        VehicleState {
            timestamp_us: 1_000_000,
            latitude: 37.0,
            longitude: -122.0,
            altitude: 100.0,
            heading: 90.0,
            yaw_deg: 90.0,
            airspeed: 15.0,
            ..Default::default()
        }
    }

    fn state_at(timestamp_us: u64) -> VehicleState {
        VehicleState { timestamp_us, ..scenario_state() }
    }

    #[test]
    fn test_initial_state() {
        let (_sink, state) = SitlState::new(SimulationParameters::new());

        assert_eq!(state.latest_vehicle_state(), VehicleState::default());
        assert_eq!(state.latest_extra_sensor_state(), None);
        assert_eq!(state.stats(), IngestStats::default());
    }

    #[test]
    fn test_concrete_scenario() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());

        let status = sink.apply_vehicle_packet(&encode_vehicle_state(&scenario_state())).unwrap();
        assert_eq!(status, PacketStatus::Accepted);
        assert_eq!(state.latest_vehicle_state(), scenario_state());

        let body = state.body_rates_from(&EulerRates::new(1.0, 0.0, 0.0));
        assert_eq!(body.p, 1.0);
        assert_eq!(body.q, 0.0);
        assert_eq!(body.r, 0.0);
    }

    #[test]
    fn test_bad_magic_keeps_previous_state() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        sink.apply_vehicle_packet(&encode_vehicle_state(&scenario_state())).unwrap();

        let mut corrupt = encode_vehicle_state(&state_at(2_000_000));
        corrupt[147] = 0x00;

        assert!(matches!(
            sink.apply_vehicle_packet(&corrupt),
            Err(SitlError::BadMagic { .. })
        ));
        assert_eq!(state.latest_vehicle_state(), scenario_state());
        assert_eq!(state.stats().rejected, 1);
        assert_eq!(state.stats().accepted, 1);
    }

    #[test]
    fn test_short_buffer_keeps_previous_state() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        sink.apply_vehicle_packet(&encode_vehicle_state(&scenario_state())).unwrap();

        let packet = encode_vehicle_state(&state_at(2_000_000));
        assert!(matches!(
            sink.apply_vehicle_packet(&packet[..60]),
            Err(SitlError::ShortBuffer { .. })
        ));
        assert_eq!(state.latest_vehicle_state(), scenario_state());
    }

    #[test]
    fn test_out_of_order_is_flagged_and_stored() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        sink.apply_vehicle_packet(&encode_vehicle_state(&state_at(5_000))).unwrap();

        let status = sink.apply_vehicle_packet(&encode_vehicle_state(&state_at(4_000))).unwrap();

        assert_eq!(
            status,
            PacketStatus::OutOfOrder { previous_us: 5_000, received_us: 4_000 }
        );
        assert!(status.is_out_of_order());
        assert_eq!(state.latest_vehicle_state().timestamp_us, 4_000);
        assert_eq!(state.stats().out_of_order, 1);
    }

    #[test]
    fn test_equal_timestamp_is_accepted() {
        let (mut sink, _state) = SitlState::new(SimulationParameters::new());
        sink.apply_vehicle_packet(&encode_vehicle_state(&state_at(7))).unwrap();
        let status = sink.apply_vehicle_packet(&encode_vehicle_state(&state_at(7))).unwrap();
        assert_eq!(status, PacketStatus::Accepted);
    }

    #[test]
    fn test_extra_sensor_packets() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());

        let extras = ExtraSensorState::new(10).with(ExtraSensor::SonarDown, Some(3.0));
        sink.apply_extra_sensor_packet(&encode_extra_sensor_state(&extras)).unwrap();
        assert_eq!(state.latest_extra_sensor_state().unwrap().sonar_down(), Some(3.0));

        let absent = ExtraSensorState::new(20);
        sink.apply_extra_sensor_packet(&encode_extra_sensor_state(&absent)).unwrap();
        assert_eq!(state.latest_extra_sensor_state().unwrap().sonar_down(), None);
    }

    #[test]
    fn test_extra_sensor_failure_keeps_previous() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());

        let extras = ExtraSensorState::new(10).with(ExtraSensor::SonarDown, Some(3.0));
        sink.apply_extra_sensor_packet(&encode_extra_sensor_state(&extras)).unwrap();

        // A vehicle packet is not an extra sensor packet
        let vehicle = encode_vehicle_state(&scenario_state());
        assert!(sink.apply_extra_sensor_packet(&vehicle).is_err());
        assert_eq!(state.latest_extra_sensor_state(), Some(extras));
    }

    #[test]
    fn test_apply_packet_dispatches_by_magic() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());

        let (packet, _) = sink.apply_packet(&encode_vehicle_state(&scenario_state())).unwrap();
        assert!(matches!(packet, Packet::Vehicle(_)));

        let extras = ExtraSensorState::new(11);
        let (packet, _) = sink.apply_packet(&encode_extra_sensor_state(&extras)).unwrap();
        assert!(matches!(packet, Packet::ExtraSensors(_)));

        assert_eq!(state.latest_vehicle_state(), scenario_state());
        assert_eq!(state.latest_extra_sensor_state(), Some(extras));
        assert_eq!(state.stats().accepted, 2);
    }

    #[test]
    fn test_body_rates_from_packet() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        let sample = VehicleState {
            pitch_deg: 30.0,
            yaw_rate: 10.0,
            ..scenario_state()
        };
        sink.apply_vehicle_packet(&encode_vehicle_state(&sample)).unwrap();

        let body = state.body_rates();
        assert_approx_eq!(body.p, -5.0, 1e-9);
        assert_approx_eq!(body.r, 10.0 * 30f64.to_radians().cos(), 1e-9);

        let recovered = state.earth_rates_from(&body.to_vector());
        assert_approx_eq!(recovered.x, 0.0, 1e-9);
        assert_approx_eq!(recovered.y, 0.0, 1e-9);
        assert_approx_eq!(recovered.z, 10.0, 1e-9);
    }

    #[test]
    fn test_snapshot_tracks_latest_state() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        sink.apply_vehicle_packet(&encode_vehicle_state(&scenario_state())).unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.time_us, 1_000_000);
        assert_eq!(snapshot.lat, 370_000_000);
    }

    #[test]
    fn test_params_shared_with_config_loader() {
        let (_sink, state) = SitlState::new(SimulationParameters::new());

        state
            .params()
            .write()
            .unwrap()
            .set("wind_speed", ParamValue::Float(6.5))
            .unwrap();

        let wind = state.with_params(|p| p.float("wind_speed").unwrap());
        assert_eq!(wind, 6.5);
    }

    #[test]
    fn test_readers_never_see_torn_state() {
        let (mut sink, state) = SitlState::new(SimulationParameters::new());

        // Every field carries the same value so a torn read is detectable
        let uniform = |n: u64| {
            let v = n as f64;
            VehicleState {
                timestamp_us: n,
                latitude: v,
                longitude: v,
                altitude: v,
                heading: v,
                speed_n: v,
                speed_e: v,
                speed_d: v,
                x_accel: v,
                y_accel: v,
                z_accel: v,
                roll_rate: v,
                pitch_rate: v,
                yaw_rate: v,
                roll_deg: v,
                pitch_deg: v,
                yaw_deg: v,
                airspeed: v,
            }
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let s = state.latest_vehicle_state();
                        let v = s.timestamp_us as f64;
                        assert_eq!(s.latitude, v);
                        assert_eq!(s.yaw_deg, v);
                        assert_eq!(s.airspeed, v);
                    }
                })
            })
            .collect();

        for n in 1..=2_000u64 {
            sink.apply_vehicle_packet(&encode_vehicle_state(&uniform(n))).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(state.latest_vehicle_state().timestamp_us, 2_000);
    }
}

//! # FDM Protocol Constants and Types
//!
//! Core definitions for the simulator-to-autopilot state packets.

/// Magic number terminating every vehicle state packet
pub const FDM_MAGIC: u32 = 0x4c56414f;

/// Magic number terminating every extra sensor packet
pub const FDM_EXTRAS_MAGIC: u32 = 0x65c4616f;

/// Size of the magic field in bytes
pub const MAGIC_SIZE: usize = 4;

/// Number of f64 fields between the timestamp and the magic of a vehicle state packet
pub const VEHICLE_STATE_F64_FIELDS: usize = 17;

/// Vehicle state packet size
/// Layout: timestamp(8) + 17 × f64(136) + magic(4) = 148 bytes
pub const VEHICLE_STATE_PACKET_SIZE: usize = 8 + VEHICLE_STATE_F64_FIELDS * 8 + MAGIC_SIZE;

/// Number of optional sensors carried by the extra sensor packet
pub const EXTRA_SENSOR_COUNT: usize = 1;

/// Extra sensor packet size
/// Layout: timestamp(8) + N × (f64 value(8) + bool flag(1)) + magic(4), packed
pub const EXTRA_SENSOR_PACKET_SIZE: usize = 8 + EXTRA_SENSOR_COUNT * 9 + MAGIC_SIZE;

/// One full-vehicle kinematic sample sent by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    /// Simulator timestamp in microseconds
    pub timestamp_us: u64,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Altitude above mean sea level in meters
    pub altitude: f64,

    /// Heading in degrees
    pub heading: f64,

    /// Velocity north in m/s
    pub speed_n: f64,

    /// Velocity east in m/s
    pub speed_e: f64,

    /// Velocity down in m/s
    pub speed_d: f64,

    /// Body-frame acceleration in m/s²
    pub x_accel: f64,
    pub y_accel: f64,
    pub z_accel: f64,

    /// Euler angle rates in degrees/s
    pub roll_rate: f64,
    pub pitch_rate: f64,
    pub yaw_rate: f64,

    /// Euler angles in degrees
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,

    /// Airspeed in m/s
    pub airspeed: f64,
}

/// Optional sensors that a simulator may fill in, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtraSensor {
    /// Downward-facing range finder, meters
    SonarDown,
}

impl ExtraSensor {
    /// Every sensor, in the order its pair appears on the wire
    pub const ALL: [ExtraSensor; EXTRA_SENSOR_COUNT] = [ExtraSensor::SonarDown];

    /// Position of this sensor's pair in the packet
    pub fn index(self) -> usize {
        match self {
            ExtraSensor::SonarDown => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExtraSensor::SonarDown => "sonar_down",
        }
    }
}

/// Raw value/presence pair as carried on the wire
///
/// `value` is only meaningful when `present` is true. Use [`SensorReading::get`]
/// rather than reading `value` directly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub value: f64,
    pub present: bool,
}

impl SensorReading {
    pub fn present(value: f64) -> Self {
        Self { value, present: true }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<f64> {
        self.present.then_some(self.value)
    }
}

/// Additional sensor readings not provided by every simulator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtraSensorState {
    /// Simulator timestamp in microseconds
    pub timestamp_us: u64,

    readings: [SensorReading; EXTRA_SENSOR_COUNT],
}

impl ExtraSensorState {
    /// Create a packet with every sensor absent
    pub fn new(timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            readings: [SensorReading::absent(); EXTRA_SENSOR_COUNT],
        }
    }

    /// Builder-style variant of [`ExtraSensorState::set`]
    pub fn with(mut self, sensor: ExtraSensor, value: Option<f64>) -> Self {
        self.set(sensor, value);
        self
    }

    /// Set or clear a sensor's value
    pub fn set(&mut self, sensor: ExtraSensor, value: Option<f64>) {
        self.readings[sensor.index()] = match value {
            Some(v) => SensorReading::present(v),
            None => SensorReading::absent(),
        };
    }

    /// Store a raw pair exactly as received
    pub fn set_raw(&mut self, sensor: ExtraSensor, reading: SensorReading) {
        self.readings[sensor.index()] = reading;
    }

    /// Sensor value, or `None` when the simulator does not supply it
    pub fn get(&self, sensor: ExtraSensor) -> Option<f64> {
        self.readings[sensor.index()].get()
    }

    /// Raw pair for a sensor, including the presence flag
    pub fn raw(&self, sensor: ExtraSensor) -> SensorReading {
        self.readings[sensor.index()]
    }

    pub fn sonar_down(&self) -> Option<f64> {
        self.get(ExtraSensor::SonarDown)
    }

    /// Iterate over every sensor with its decoded value
    pub fn readings(&self) -> impl Iterator<Item = (ExtraSensor, Option<f64>)> + '_ {
        ExtraSensor::ALL.iter().map(move |&sensor| (sensor, self.get(sensor)))
    }
}

/// Either kind of packet, as identified by its magic
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    Vehicle(VehicleState),
    ExtraSensors(ExtraSensorState),
}

impl Packet {
    pub fn timestamp_us(&self) -> u64 {
        match self {
            Packet::Vehicle(state) => state.timestamp_us,
            Packet::ExtraSensors(extras) => extras.timestamp_us,
        }
    }
}

//! # Parameter Schema
//!
//! Compile-time table of every simulation parameter, its type, default and
//! group. A parameter's name and its position in [`SCHEMA`] are its
//! persistence identity and must never change; new parameters are appended.

use std::fmt;

use crate::error::SitlError;

/// Declared storage type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Float,
    Int8,
    Int16,
    Vector3,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Float => "float",
            ParamType::Int8 => "int8",
            ParamType::Int16 => "int16",
            ParamType::Vector3 => "vector3",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int8(i8),
    Int16(i16),
    Vector3([f32; 3]),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Int8(_) => ParamType::Int8,
            ParamValue::Int16(_) => ParamType::Int16,
            ParamValue::Vector3(_) => ParamType::Vector3,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Int8(v) => write!(f, "{}", v),
            ParamValue::Int16(v) => write!(f, "{}", v),
            ParamValue::Vector3([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
        }
    }
}

/// Family a parameter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// Additive random noise magnitude
    Noise,
    /// Slow drift rate
    Drift,
    /// Probabilistic or fixed-offset glitch injection
    Glitch,
    /// Fixed bias or offset
    Bias,
    /// Propagation delay, in samples or milliseconds
    Delay,
    /// Enable/disable and failure flags or failure values
    Failure,
    /// Simulated GPS receiver configuration
    Gps,
    /// Wind, battery, engine and servo environment
    Environment,
    /// Other simulated sensor configuration
    Sensor,
}

/// Simulated GPS receiver protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum GpsType {
    None = 0,
    Ublox = 1,
    Mtk = 2,
    Mtk16 = 3,
    Mtk19 = 4,
    Nmea = 5,
    Sbp = 6,
    File = 7,
}

impl TryFrom<i8> for GpsType {
    type Error = SitlError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => GpsType::None,
            1 => GpsType::Ublox,
            2 => GpsType::Mtk,
            3 => GpsType::Mtk16,
            4 => GpsType::Mtk19,
            5 => GpsType::Nmea,
            6 => GpsType::Sbp,
            7 => GpsType::File,
            other => return Err(SitlError::InvalidGpsType(other)),
        })
    }
}

/// Static description of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub default: ParamValue,
    pub group: ParamGroup,
    pub units: &'static str,
    pub description: &'static str,
}

impl ParamDescriptor {
    const fn new(
        name: &'static str,
        default: ParamValue,
        group: ParamGroup,
        units: &'static str,
        description: &'static str,
    ) -> Self {
        Self { name, default, group, units, description }
    }

    pub fn param_type(&self) -> ParamType {
        self.default.param_type()
    }
}

use ParamGroup::*;
use ParamValue::{Float, Int16, Int8, Vector3};

/// Every simulation parameter, in persistence order
pub static SCHEMA: &[ParamDescriptor] = &[
    ParamDescriptor::new("baro_noise", Float(0.2), Noise, "m", "barometer noise"),
    ParamDescriptor::new("gyro_noise", Float(0.0), Noise, "deg/s", "gyro noise"),
    ParamDescriptor::new("accel_noise", Float(0.0), Noise, "m/s/s", "accelerometer noise"),
    ParamDescriptor::new("mag_noise", Float(0.0), Noise, "mGauss", "compass noise, earth field is 818"),
    ParamDescriptor::new("gps_disable", Int8(0), Failure, "", "disable simulated GPS"),
    ParamDescriptor::new("wind_speed", Float(0.0), Environment, "m/s", "wind speed"),
    ParamDescriptor::new("wind_direction", Float(180.0), Environment, "deg", "direction wind is coming from"),
    ParamDescriptor::new("wind_turbulance", Float(0.0), Environment, "m/s", "wind turbulence"),
    ParamDescriptor::new("gps_delay", Int8(1), Delay, "samples", "GPS data delay"),
    ParamDescriptor::new("servo_rate", Float(0.0), Environment, "deg/s", "servo slew rate, 0 for instant"),
    ParamDescriptor::new("batt_voltage", Float(12.6), Environment, "V", "battery base voltage"),
    ParamDescriptor::new("aspd_noise", Float(0.5), Noise, "m/s", "airspeed noise"),
    ParamDescriptor::new("accel_fail", Float(0.0), Failure, "m/s/s", "accelerometer failure value"),
    ParamDescriptor::new("baro_drift", Float(0.0), Drift, "m/s", "barometer drift rate"),
    ParamDescriptor::new("sonar_glitch", Float(0.0), Glitch, "", "probability 0-1 that a sonar sample reads max distance"),
    ParamDescriptor::new("sonar_noise", Float(0.0), Noise, "m", "sonar noise"),
    ParamDescriptor::new("rc_fail", Int8(0), Failure, "", "fail RC input"),
    ParamDescriptor::new("mag_mot", Vector3([0.0, 0.0, 0.0]), Bias, "mGauss/A", "motor current interference on compass"),
    ParamDescriptor::new("mag_error", Float(0.0), Bias, "deg", "compass orientation error"),
    ParamDescriptor::new("gps2_enable", Int8(0), Gps, "", "enable second simulated GPS"),
    ParamDescriptor::new("baro_disable", Int8(0), Failure, "", "disable simulated barometer"),
    ParamDescriptor::new("drift_speed", Float(0.05), Drift, "deg/s/min", "gyro drift speed"),
    ParamDescriptor::new("drift_time", Float(5.0), Drift, "min", "gyro drift period"),
    ParamDescriptor::new("gps_type", Int8(GpsType::Ublox as i8), Gps, "", "simulated GPS protocol"),
    ParamDescriptor::new("gps_byteloss", Float(0.0), Glitch, "%", "GPS byte loss"),
    ParamDescriptor::new("gps_numsats", Int8(10), Gps, "", "number of visible satellites"),
    ParamDescriptor::new("gps_glitch", Vector3([0.0, 0.0, 0.0]), Glitch, "deg, deg, m", "GPS glitch offsets in lat, lon and alt"),
    ParamDescriptor::new("gps_hertz", Int8(5), Gps, "Hz", "GPS update rate"),
    ParamDescriptor::new("sonar_scale", Float(12.1212), Sensor, "m/V", "sonar scale"),
    ParamDescriptor::new("engine_mul", Float(1.0), Environment, "", "engine thrust multiplier"),
    ParamDescriptor::new("float_exception", Int8(1), Failure, "", "enable floating point exception checks"),
    ParamDescriptor::new("flow_enable", Int8(0), Sensor, "", "enable simulated optical flow"),
    ParamDescriptor::new("terrain_enable", Int8(1), Sensor, "", "use terrain for height"),
    ParamDescriptor::new("flow_rate", Int16(10), Sensor, "Hz", "optical flow data rate"),
    ParamDescriptor::new("flow_delay", Int8(0), Delay, "samples", "optical flow data delay"),
    ParamDescriptor::new("gps_drift_alt", Float(0.0), Drift, "m", "GPS altitude drift"),
    ParamDescriptor::new("baro_delay", Int16(0), Delay, "ms", "barometer data delay"),
    ParamDescriptor::new("mag_delay", Int16(0), Delay, "ms", "compass data delay"),
    ParamDescriptor::new("wind_delay", Int16(0), Delay, "ms", "wind data delay"),
    ParamDescriptor::new("mag_ofs", Vector3([5.0, 13.0, -18.0]), Bias, "mGauss", "compass offsets"),
    ParamDescriptor::new("accel2_noise", Float(0.0), Noise, "m/s/s", "second accelerometer noise"),
    ParamDescriptor::new("accel_bias", Vector3([0.0, 0.0, 0.0]), Bias, "m/s/s", "accelerometer bias"),
    ParamDescriptor::new("aspd_fail", Float(0.0), Failure, "m/s", "airspeed sensor failure value"),
    ParamDescriptor::new("baro_glitch", Float(0.0), Glitch, "m", "barometer glitch"),
];

/// Position of a parameter in [`SCHEMA`]
pub fn index_of(name: &str) -> Option<usize> {
    SCHEMA.iter().position(|descriptor| descriptor.name == name)
}

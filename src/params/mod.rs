//! # Simulation Parameters Module
//!
//! Noise, drift, glitch, bias, delay and failure knobs for simulated sensors.
//!
//! This module handles:
//! - The fixed parameter schema with compiled-in defaults
//! - Type-checked get/set by name
//! - All-or-nothing loading from flat TOML files

pub mod schema;
pub mod registry;

pub use registry::{ParamEntry, SimulationParameters};
pub use schema::{GpsType, ParamDescriptor, ParamGroup, ParamType, ParamValue, SCHEMA};

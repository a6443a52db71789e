//! # FDM Packet Module
//!
//! Wire protocol between the flight-dynamics simulator and the autopilot.
//!
//! This module handles:
//! - Full vehicle state packets (position, velocity, acceleration, attitude)
//! - Extra sensor packets with per-sensor presence flags
//! - Magic-number validation of both packet kinds
//! - Little-endian, packed, fixed-order field layout

pub mod protocol;
pub mod encoder;
pub mod decoder;

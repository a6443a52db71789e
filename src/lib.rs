//! # SITL Bridge Library
//!
//! State exchange between a flight-dynamics simulator and an autopilot running
//! in software-in-the-loop.
//!
//! This library provides the FDM packet protocol, conversion between Euler and
//! body-frame angular rates, and the table of sensor noise and fault-injection
//! parameters consulted by simulated sensors.

pub mod error;
pub mod kinematics;
pub mod packet;
pub mod params;
pub mod state;

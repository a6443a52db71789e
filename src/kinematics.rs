//! # Frame Conversion
//!
//! Converts angular rates between Euler-angle rates and body-frame rates.
//!
//! All public functions take and return degrees and degrees/s, matching the
//! FDM packet. Trigonometry is done in radians internally. Nothing here fails:
//! at pitch = ±90° the Euler formulation is singular and the result simply
//! degrades numerically.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Below this |cos(pitch)| the pitch angle is nudged before dividing
///
/// `asin` at ±1 lands within one ulp of ±π/2, where cos is about 6e-17.
const COS_PITCH_EPSILON: f64 = 1.0e-12;

/// Pitch nudge applied at the singularity, radians
const PITCH_NUDGE_RAD: f64 = 1.0e-10;

/// Euler angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
}

impl Attitude {
    pub fn new(roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Self {
        Self { roll_deg, pitch_deg, yaw_deg }
    }
}

/// Euler angle rates in degrees/s
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerRates {
    pub roll_rate: f64,
    pub pitch_rate: f64,
    pub yaw_rate: f64,
}

impl EulerRates {
    pub fn new(roll_rate: f64, pitch_rate: f64, yaw_rate: f64) -> Self {
        Self { roll_rate, pitch_rate, yaw_rate }
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.roll_rate, self.pitch_rate, self.yaw_rate)
    }
}

/// Body-frame angular rates (p, q, r) in degrees/s
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyRates {
    pub p: f64,
    pub q: f64,
    pub r: f64,
}

impl BodyRates {
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.p, self.q, self.r)
    }
}

/// Convert Euler angle rates to body-frame angular rates
///
/// Only roll and pitch couple the rates; yaw has no effect.
///
/// ```text
/// p = φ' - ψ'·sin θ
/// q = θ'·cos φ + ψ'·sin φ·cos θ
/// r = ψ'·cos φ·cos θ - θ'·sin φ
/// ```
pub fn body_rates_from_euler(attitude: &Attitude, euler_rates: &EulerRates) -> BodyRates {
    let (sin_phi, cos_phi) = attitude.roll_deg.to_radians().sin_cos();
    let (sin_theta, cos_theta) = attitude.pitch_deg.to_radians().sin_cos();

    let roll_rate = euler_rates.roll_rate;
    let pitch_rate = euler_rates.pitch_rate;
    let yaw_rate = euler_rates.yaw_rate;

    BodyRates {
        p: roll_rate - yaw_rate * sin_theta,
        q: pitch_rate * cos_phi + yaw_rate * sin_phi * cos_theta,
        r: yaw_rate * cos_phi * cos_theta - pitch_rate * sin_phi,
    }
}

/// Convert body-frame angular rates to Euler angle rates
///
/// # Arguments
///
/// * `dcm` - Body-to-earth rotation matrix
/// * `body_rates` - (p, q, r) in degrees/s
///
/// # Returns
///
/// * `Vector3<f64>` - (roll rate, pitch rate, yaw rate) in degrees/s
///
/// The matrix is decomposed into Euler angles and the inverse of
/// [`body_rates_from_euler`] is evaluated:
///
/// ```text
/// φ' = p + tan θ·(q·sin φ + r·cos φ)
/// θ' = q·cos φ - r·sin φ
/// ψ' = (q·sin φ + r·cos φ) / cos θ
/// ```
pub fn earth_rates_from_body(dcm: &Matrix3<f64>, body_rates: &Vector3<f64>) -> Vector3<f64> {
    let p = body_rates.x.to_radians();
    let q = body_rates.y.to_radians();
    let r = body_rates.z.to_radians();

    let attitude = euler_from_dcm(dcm);
    let phi = attitude.roll_deg.to_radians();
    let mut theta = attitude.pitch_deg.to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let coupled = q * sin_phi + r * cos_phi;

    let phi_dot = p + theta.tan() * coupled;
    let theta_dot = q * cos_phi - r * sin_phi;
    if theta.cos().abs() < COS_PITCH_EPSILON {
        theta += PITCH_NUDGE_RAD;
    }
    let psi_dot = coupled / theta.cos();

    Vector3::new(phi_dot.to_degrees(), theta_dot.to_degrees(), psi_dot.to_degrees())
}

/// Body-to-earth rotation matrix for an attitude (yaw, then pitch, then roll)
pub fn dcm_from_euler(attitude: &Attitude) -> Matrix3<f64> {
    Rotation3::from_euler_angles(
        attitude.roll_deg.to_radians(),
        attitude.pitch_deg.to_radians(),
        attitude.yaw_deg.to_radians(),
    )
    .into_inner()
}

/// Decompose a body-to-earth rotation matrix into Euler angles
///
/// The pitch term is clamped so a slightly non-orthonormal matrix cannot push
/// `asin` out of its domain.
pub fn euler_from_dcm(dcm: &Matrix3<f64>) -> Attitude {
    let roll = dcm[(2, 1)].atan2(dcm[(2, 2)]);
    let pitch = -dcm[(2, 0)].clamp(-1.0, 1.0).asin();
    let yaw = dcm[(1, 0)].atan2(dcm[(0, 0)]);

    Attitude {
        roll_deg: roll.to_degrees(),
        pitch_deg: pitch.to_degrees(),
        yaw_deg: yaw.to_degrees(),
    }
}

/// Wrap an angle into [-180, 180] degrees
pub fn wrap_180(angle_deg: f64) -> f64 {
    let mut wrapped = angle_deg % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

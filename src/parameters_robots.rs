//! Hardcoded kinematic descriptions for a few robots

extern crate nalgebra as na;

use na::{Isometry3, Unit, Vector3};
use crate::constraints::JointLimits;
use crate::control_error::ControlError;
use crate::serial_chain::{RevoluteJoint, SerialChain};

/// Limits in degrees and degrees per second, converted on use. Preset data is known to be
/// valid, so the checked constructor is not needed.
fn limits_degrees(position: f64, velocity: f64) -> JointLimits {
    JointLimits {
        lower: -position.to_radians(),
        upper: position.to_radians(),
        velocity: velocity.to_radians(),
    }
}

impl SerialChain {
    /// KUKA LBR iiwa 14 R820, seven joints, zero configuration stretched straight up.
    /// Limits are from the KUKA LBR iiwa datasheet.
    pub fn kuka_iiwa14() -> Self {
        let minus_y = Unit::new_normalize(Vector3::new(0.0, -1.0, 0.0));
        let joints = vec![
            RevoluteJoint::offset(0.0, 0.0, 0.1575, Vector3::z_axis()),
            RevoluteJoint::offset(0.0, 0.0, 0.2025, Vector3::y_axis()),
            RevoluteJoint::offset(0.0, 0.0, 0.2045, Vector3::z_axis()),
            RevoluteJoint::offset(0.0, 0.0, 0.2155, minus_y),
            RevoluteJoint::offset(0.0, 0.0, 0.1845, Vector3::z_axis()),
            RevoluteJoint::offset(0.0, 0.0, 0.2155, Vector3::y_axis()),
            RevoluteJoint::offset(0.0, 0.0, 0.0810, Vector3::z_axis()),
        ];
        let limits = vec![
            limits_degrees(170.0, 85.0),
            limits_degrees(120.0, 85.0),
            limits_degrees(170.0, 100.0),
            limits_degrees(120.0, 75.0),
            limits_degrees(170.0, 130.0),
            limits_degrees(120.0, 135.0),
            limits_degrees(175.0, 135.0),
        ];
        SerialChain::assemble(joints, limits, Isometry3::translation(0.0, 0.0, 0.045))
    }

    /// Planar arm moving in the xy plane, all joints about z. Link `i` has length
    /// `lengths[i]` and every joint gets the same `limits`.
    pub fn planar(lengths: &[f64], limits: JointLimits) -> Result<Self, ControlError> {
        let Some((last, _)) = lengths.split_last() else {
            return Err(ControlError::DimensionMismatch { context: "Link lengths", expected: 1, found: 0 });
        };

        let mut joints = Vec::with_capacity(lengths.len());
        let mut previous = 0.0;
        for length in lengths {
            joints.push(RevoluteJoint::offset(previous, 0.0, 0.0, Vector3::z_axis()));
            previous = *length;
        }
        SerialChain::new(joints, vec![limits; lengths.len()], Isometry3::translation(*last, 0.0, 0.0))
    }
}

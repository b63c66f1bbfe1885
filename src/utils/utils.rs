//! Helper functions

use nalgebra::{Isometry3, UnitQuaternion};
use crate::kinematic_traits::{JointVector, Twist};

/// Checks if all elements are finite
pub fn is_valid(qs: &JointVector) -> bool {
    qs.iter().all(|q| q.is_finite())
}

/// Joint values as a row in degrees, like `[ 5.73 -11.46]`.
pub fn format_joints(joints: &JointVector) -> String {
    let mut row_str = String::new();
    for computed in joints.iter() {
        row_str.push_str(&format!("{:5.2} ", computed.to_degrees()));
    }
    format!("[{}]", row_str.trim_end())
}

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &JointVector) {
    println!("{}", format_joints(joints));
}

pub fn dump_pose(isometry: &Isometry3<f64>) {
    let translation = isometry.translation.vector;
    let rotation: UnitQuaternion<f64> = isometry.rotation;
    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
        translation.x, translation.y, translation.z, rotation.i, rotation.j, rotation.k, rotation.w
    );
}

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[f64]) -> JointVector {
    JointVector::from_iterator(degrees.len(), degrees.iter().map(|d| d.to_radians()))
}

/// Norms of the translation and the rotation part of a pose error.
pub fn error_norms(error: &Twist) -> (f64, f64) {
    (error.fixed_rows::<3>(0).norm(), error.fixed_rows::<3>(3).norm())
}

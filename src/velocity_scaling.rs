//! Keeps commanded joint velocities feasible by uniform scaling.
//!
//! All joints are scaled by the same factor so that the direction of the commanded motion,
//! and with it the direction the endpoint moves in, is preserved. Scaling each joint
//! separately would bend the path.

use tracing::debug;
use crate::control_error::{check_length, ControlError};
use crate::kinematic_traits::JointVector;

/// Fraction of the velocity limit the most restrictive joint is scaled down to.
pub const VELOCITY_SAFETY_FACTOR: f64 = 0.99;

/// Scales `candidate` so that `reference`, scaled by the same factor, stays within `limits`.
///
/// The reference may differ from the candidate: the null-space part of a command is scaled
/// relative to the whole command so that the task part is left untouched.
///
/// # Arguments
///
/// * `candidate` - The vector to scale, modified in place
/// * `reference` - The vector the limits are checked against
/// * `limits` - Symmetric velocity bound of each joint
///
/// # Returns
///
/// The applied scale factor in (0, 1], exactly 1 if the reference is already within limits.
/// A length mismatch is an error and leaves `candidate` untouched.
pub fn scale_velocity_vector(candidate: &mut JointVector,
                             reference: &JointVector,
                             limits: &[f64]) -> Result<f64, ControlError> {
    scale_velocity_vector_with_margin(candidate, reference, limits, VELOCITY_SAFETY_FACTOR)
}

/// As [`scale_velocity_vector`] with a configurable safety factor in (0, 1].
pub fn scale_velocity_vector_with_margin(candidate: &mut JointVector,
                                         reference: &JointVector,
                                         limits: &[f64],
                                         safety_factor: f64) -> Result<f64, ControlError> {
    check_length("Velocity reference", candidate.len(), reference.len())?;
    check_length("Velocity limits", candidate.len(), limits.len())?;

    let scale = feasibility_scale(reference, limits, safety_factor);
    if scale < 1.0 {
        debug!("Scaling joint velocities by {:.4}", scale);
        *candidate *= scale;
    }
    Ok(scale)
}

/// Largest factor not exceeding 1 that brings every component of `reference` within its limit.
fn feasibility_scale(reference: &JointVector, limits: &[f64], safety_factor: f64) -> f64 {
    reference.iter()
        .zip(limits.iter())
        .filter(|(v, limit)| v.abs() > **limit)
        .map(|(v, limit)| safety_factor * limit / v.abs())
        .fold(1.0, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limits_is_unchanged() {
        let mut v = JointVector::from_vec(vec![0.5, -0.9, 0.0]);
        let reference = v.clone();
        let s = scale_velocity_vector(&mut v, &reference, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(s, 1.0);
        assert_eq!(v, reference);
    }

    #[test]
    fn test_most_restrictive_joint_wins() {
        let mut v = JointVector::from_vec(vec![2.0, -4.0, 0.5]);
        let reference = v.clone();
        let s = scale_velocity_vector(&mut v, &reference, &[1.0, 1.0, 1.0]).unwrap();
        assert!((s - 0.99 / 4.0).abs() < 1e-12);
        assert!((v[1] + 0.99).abs() < 1e-12);
        // Direction is preserved
        assert!((v[0] / v[1] - 2.0 / -4.0).abs() < 1e-12);
        assert!(v.iter().zip([1.0, 1.0, 1.0]).all(|(x, l)| x.abs() <= l));
    }

    #[test]
    fn test_scaling_never_grows_components() {
        let command = JointVector::from_vec(vec![3.0, -0.2, 1.5, -7.0]);
        let limits = [1.0, 0.5, 2.0, 3.0];
        let mut v = command.clone();
        let s = scale_velocity_vector(&mut v, &command, &limits).unwrap();
        assert!(s > 0.0 && s <= 1.0);
        for i in 0..v.len() {
            assert!(v[i].abs() <= command[i].abs());
            assert!(v[i].abs() <= limits[i]);
        }
    }

    #[test]
    fn test_reference_differs_from_candidate() {
        let mut candidate = JointVector::from_vec(vec![0.1, 0.1]);
        let reference = JointVector::from_vec(vec![2.0, 0.0]);
        let s = scale_velocity_vector(&mut candidate, &reference, &[1.0, 1.0]).unwrap();
        assert!((s - 0.495).abs() < 1e-12);
        assert!((candidate[0] - 0.0495).abs() < 1e-12);
        // Reference is left alone
        assert_eq!(reference[0], 2.0);
    }

    #[test]
    fn test_length_mismatch_leaves_candidate() {
        let mut candidate = JointVector::from_vec(vec![5.0, 5.0]);
        let reference = JointVector::from_vec(vec![5.0, 5.0, 5.0]);
        let result = scale_velocity_vector(&mut candidate, &reference, &[1.0, 1.0]);
        assert!(matches!(result, Err(ControlError::DimensionMismatch { .. })));
        assert_eq!(candidate, JointVector::from_vec(vec![5.0, 5.0]));

        let reference = candidate.clone();
        let result = scale_velocity_vector(&mut candidate, &reference, &[1.0]);
        assert!(result.is_err());
        assert_eq!(candidate[0], 5.0);
    }
}

//! Joint limit avoidance by weighted least-norm resolution.
//!
//! Chan, T. F., & Dubey, R. V. (1995). A weighted least-norm solution based scheme
//! for avoiding joint limits for redundant joint manipulators.
//! IEEE Transactions on Robotics and Automation, 11(2), 286-292.
//!
//! The weighting matrix built here holds the *cost* of moving each joint: 1 means the
//! joint moves freely, larger values resist motion. It is inverted where it is used, in
//! [`crate::pseudoinverse::weighted_pseudo_inverse`] and in the null-space projection.

extern crate nalgebra as na;

use na::{DMatrix, DVector};
use tracing::warn;
use crate::constraints::JointLimits;
use crate::kinematic_traits::RobotModel;

/// Cost applied to a joint that sits on (or beyond) a limit and keeps moving outward.
/// Large enough to effectively freeze the joint, small enough to keep the matrix invertible.
pub const MAX_PENALTY: f64 = 1e6;

/// Penalty function of a single joint, `p = range² / (4 · upper · lower)` when the
/// joint moves toward its nearer limit, 1 otherwise.
///
/// # Arguments
///
/// * `position` - Current joint position
/// * `velocity` - Current joint velocity, its sign decides whether the penalty applies
/// * `limits` - Position limits of the joint
///
/// # Returns
///
/// The diagonal entry of the weighting matrix, never less than 1.
pub fn joint_penalty(position: f64, velocity: f64, limits: &JointLimits) -> f64 {
    let upper = limits.upper - position; // Distance to upper limit
    let lower = position - limits.lower; // Distance to lower limit

    // On or past a limit the penalty function is undefined: stop further outward motion
    if upper <= 0.0 || lower <= 0.0 {
        let outward = (upper <= 0.0 && velocity > 0.0) || (lower <= 0.0 && velocity < 0.0);
        if outward {
            warn!("Joint at {} is outside [{}, {}] and moving outward", position, limits.lower, limits.upper);
            return MAX_PENALTY;
        }
        return 1.0;
    }

    let range = limits.range();
    let gradient = range * range * (2.0 * position - limits.upper - limits.lower)
        / (4.0 * upper * upper * lower * lower);

    if gradient * velocity <= 0.0 {
        return 1.0; // Moving away from the limit, or stationary
    }

    let penalty = range * range / (4.0 * upper * lower);
    if !(penalty >= 1.0) {
        warn!("Penalty function is {} (less than 1) for q = {} in [{}, {}], using 1",
              penalty, position, limits.lower, limits.upper);
        return 1.0;
    }
    penalty.min(MAX_PENALTY)
}

/// Diagonal cost matrix for all joints of the robot at its current state.
pub fn joint_limit_weighting(robot: &dyn RobotModel) -> DMatrix<f64> {
    let positions = robot.joint_positions();
    let velocities = robot.joint_velocities();
    let diagonal = DVector::from_iterator(
        robot.joint_count(),
        robot.joint_limits().iter().enumerate()
            .map(|(i, limits)| joint_penalty(positions[i], velocities[i], limits)),
    );
    DMatrix::from_diagonal(&diagonal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> JointLimits {
        JointLimits::new(-1.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_stationary_joint_has_no_penalty() {
        assert_eq!(joint_penalty(0.8, 0.0, &limits()), 1.0);
    }

    #[test]
    fn test_moving_away_has_no_penalty() {
        assert_eq!(joint_penalty(0.8, -0.5, &limits()), 1.0);
        assert_eq!(joint_penalty(-0.8, 0.5, &limits()), 1.0);
    }

    #[test]
    fn test_moving_toward_limit_is_penalised() {
        // range = 2, upper = 0.2, lower = 1.8 -> p = 4 / (4 * 0.36)
        let p = joint_penalty(0.8, 0.5, &limits());
        assert!((p - 1.0 / 0.36).abs() < 1e-9);

        // Symmetric on the other side
        let q = joint_penalty(-0.8, -0.5, &limits());
        assert!((p - q).abs() < 1e-9);
    }

    #[test]
    fn test_penalty_grows_toward_limit() {
        let near = joint_penalty(0.9, 0.1, &limits());
        let nearer = joint_penalty(0.99, 0.1, &limits());
        assert!(nearer > near);
        assert!(near > 1.0);
    }

    #[test]
    fn test_center_moving_has_unit_penalty() {
        // At the middle of the range the gradient is zero
        assert_eq!(joint_penalty(0.0, 1.0, &limits()), 1.0);
    }

    #[test]
    fn test_at_limit_moving_outward_saturates() {
        assert_eq!(joint_penalty(1.0, 0.1, &limits()), MAX_PENALTY);
        assert_eq!(joint_penalty(-1.2, -0.1, &limits()), MAX_PENALTY);
        assert_eq!(joint_penalty(1.0, -0.1, &limits()), 1.0);
        assert!(joint_penalty(1.0, 0.1, &limits()).is_finite());
    }

    #[test]
    fn test_penalty_never_below_one() {
        let l = limits();
        for i in -99..=99 {
            let q = i as f64 / 100.0;
            for v in [-1.0, 0.0, 1.0] {
                assert!(joint_penalty(q, v, &l) >= 1.0);
            }
        }
    }
}

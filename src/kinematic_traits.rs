//! Types shared across the crate and the interface the controller needs from a robot model.

extern crate nalgebra as na;

use na::{DMatrix, DVector, Isometry3, Vector6};
use crate::constraints::JointLimits;

/// Ordered joint values (positions, velocities, accelerations or limits), one per joint.
/// The length always matches the joint count of the robot it belongs to.
pub type JointVector = DVector<f64>;

/// Pose of the endpoint. It contains both Cartesian position and rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Linear and angular components stacked as `[vx, vy, vz, wx, wy, wz]`. Used for endpoint
/// velocities, accelerations and pose errors, matching the row layout of the Jacobian.
pub type Twist = Vector6<f64>;

/// Number of task space degrees of freedom. Robots with more joints than this are redundant.
pub const TASK_DOF: usize = 6;

/// What the controller reads from the robot. Every call is a snapshot of the current
/// configuration; the controller never keeps any of it between calls.
pub trait RobotModel {
    fn joint_count(&self) -> usize;

    fn joint_positions(&self) -> JointVector;

    fn joint_velocities(&self) -> JointVector;

    /// Position and velocity limits, one entry per joint.
    fn joint_limits(&self) -> &[JointLimits];

    /// The 6 x n Jacobian of the endpoint at the current configuration. Rows 0..3 map to
    /// linear velocity, rows 3..6 to angular velocity.
    fn jacobian(&self) -> DMatrix<f64>;

    /// Partial derivative of the given Jacobian with respect to the joint `joint`.
    fn partial_derivative(&self, jacobian: &DMatrix<f64>, joint: usize) -> DMatrix<f64>;

    fn endpoint_pose(&self) -> Pose;

    fn joint_position(&self, joint: usize) -> f64 {
        self.joint_positions()[joint]
    }

    fn joint_velocity(&self, joint: usize) -> f64 {
        self.joint_velocities()[joint]
    }

    /// (lower, upper) position limits for each joint
    fn position_limits(&self) -> Vec<(f64, f64)> {
        self.joint_limits().iter().map(|l| (l.lower, l.upper)).collect()
    }

    /// Symmetric velocity bound for each joint
    fn velocity_limits(&self) -> Vec<f64> {
        self.joint_limits().iter().map(|l| l.velocity).collect()
    }
}

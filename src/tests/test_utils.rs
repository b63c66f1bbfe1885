//! Robots and helpers shared by the tests.

use nalgebra::{DMatrix, DVector, Isometry3, Vector3};
use crate::constraints::JointLimits;
use crate::kinematic_traits::{JointVector, Pose, RobotModel};
use crate::serial_chain::{RevoluteJoint, SerialChain};

/// Seven joint arm in a general configuration, away from singularities and limits.
pub fn redundant_arm() -> SerialChain {
    let mut robot = SerialChain::kuka_iiwa14();
    let q = DVector::from_vec(vec![0.1, 0.5, -0.2, -1.2, 0.3, 0.8, 0.2]);
    robot.update_state(&q, &DVector::zeros(7)).unwrap();
    robot
}

/// Six joint arm with a spherical wrist, in a general configuration.
pub fn six_axis_arm() -> SerialChain {
    let joints = vec![
        RevoluteJoint::offset(0.0, 0.0, 0.34, Vector3::z_axis()),
        RevoluteJoint::offset(0.0, 0.0, 0.0, Vector3::y_axis()),
        RevoluteJoint::offset(0.0, 0.0, 0.4, Vector3::y_axis()),
        RevoluteJoint::offset(0.0, 0.0, 0.4, Vector3::z_axis()),
        RevoluteJoint::offset(0.0, 0.0, 0.0, Vector3::y_axis()),
        RevoluteJoint::offset(0.0, 0.0, 0.0, Vector3::z_axis()),
    ];
    let limits = vec![
        JointLimits::symmetric(2.9, 1.5).unwrap(),
        JointLimits::symmetric(2.0, 1.5).unwrap(),
        JointLimits::symmetric(2.0, 1.7).unwrap(),
        JointLimits::symmetric(2.9, 2.0).unwrap(),
        JointLimits::symmetric(2.0, 2.5).unwrap(),
        JointLimits::symmetric(3.0, 2.5).unwrap(),
    ];
    let mut robot = SerialChain::new(joints, limits, Isometry3::translation(0.0, 0.0, 0.126)).unwrap();
    let q = DVector::from_vec(vec![0.2, 0.4, 0.8, 0.3, -0.6, 0.1]);
    robot.update_state(&q, &DVector::zeros(6)).unwrap();
    robot
}

/// Advances the robot by one explicit Euler step with the commanded velocities.
pub fn integrate(robot: &mut SerialChain, velocities: &JointVector, dt: f64) {
    let q = robot.joint_positions() + velocities * dt;
    robot.update_state(&q, velocities).unwrap();
}

/// Reports the state of a real robot, but with some parts cut short.
pub struct Misreporting {
    pub robot: SerialChain,
    /// Number of joint limits reported
    pub limits: usize,
    /// Number of rows of the reported Jacobian derivatives
    pub derivative_rows: usize,
}

impl Misreporting {
    pub fn new(robot: SerialChain) -> Self {
        let limits = robot.joint_count();
        Misreporting { robot, limits, derivative_rows: 6 }
    }
}

impl RobotModel for Misreporting {
    fn joint_count(&self) -> usize {
        self.robot.joint_count()
    }

    fn joint_positions(&self) -> JointVector {
        self.robot.joint_positions()
    }

    fn joint_velocities(&self) -> JointVector {
        self.robot.joint_velocities()
    }

    fn joint_limits(&self) -> &[JointLimits] {
        &self.robot.joint_limits()[..self.limits]
    }

    fn jacobian(&self) -> DMatrix<f64> {
        self.robot.jacobian()
    }

    fn partial_derivative(&self, jacobian: &DMatrix<f64>, joint: usize) -> DMatrix<f64> {
        self.robot.partial_derivative(jacobian, joint).rows(0, self.derivative_rows).into_owned()
    }

    fn endpoint_pose(&self) -> Pose {
        self.robot.endpoint_pose()
    }
}

pub fn assert_matrix_approx_eq(left: &DMatrix<f64>, right: &DMatrix<f64>, epsilon: f64) {
    assert_eq!(left.shape(), right.shape(), "matrix shapes differ");
    for i in 0..left.nrows() {
        for j in 0..left.ncols() {
            assert!((left[(i, j)] - right[(i, j)]).abs() < epsilon,
                    "left[{0},{1}] = {2} is not approximately equal to right[{0},{1}] = {3}",
                    i, j, left[(i, j)], right[(i, j)]);
        }
    }
}

//! A serial chain of revolute joints that implements [`RobotModel`].
//!
//! Each joint is described by the fixed transform from the previous joint frame to its
//! own frame and the axis it rotates about, expressed in its own frame. The state is
//! updated by the caller every control tick; forward kinematics is recomputed on update.

extern crate nalgebra as na;

use na::{DMatrix, Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use tracing::error;
use crate::constraints::JointLimits;
use crate::control_error::{check_length, ControlError};
use crate::kinematic_traits::{JointVector, Pose, RobotModel};

/// One revolute joint of the chain.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    /// Transform from the previous joint frame (after its rotation) to this joint frame.
    pub origin: Isometry3<f64>,

    /// Rotation axis in this joint frame.
    pub axis: Unit<Vector3<f64>>,
}

impl RevoluteJoint {
    pub fn new(origin: Isometry3<f64>, axis: Unit<Vector3<f64>>) -> Self {
        RevoluteJoint { origin, axis }
    }

    /// Joint displaced by `(x, y, z)` from the previous one, without extra rotation.
    pub fn offset(x: f64, y: f64, z: f64, axis: Unit<Vector3<f64>>) -> Self {
        Self::new(Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity()), axis)
    }
}

#[derive(Debug, Clone)]
pub struct SerialChain {
    joints: Vec<RevoluteJoint>,
    limits: Vec<JointLimits>,
    base: Isometry3<f64>,
    tool: Isometry3<f64>,

    positions: JointVector,
    velocities: JointVector,

    // Forward kinematics at the current positions, world frame
    axes: Vec<Vector3<f64>>,
    origins: Vec<Vector3<f64>>,
    endpoint: Pose,
}

impl SerialChain {
    /// Creates the chain at the zero configuration, at rest.
    ///
    /// # Arguments
    ///
    /// * `joints` - Joints from the base outward
    /// * `limits` - Limits of each joint, same length as `joints`
    /// * `tool` - Transform from the last joint frame to the endpoint
    pub fn new(joints: Vec<RevoluteJoint>, limits: Vec<JointLimits>, tool: Isometry3<f64>)
               -> Result<Self, ControlError> {
        check_length("Joint limits", joints.len(), limits.len())?;
        if joints.is_empty() {
            return Err(ControlError::DimensionMismatch { context: "Joints", expected: 1, found: 0 });
        }
        Ok(Self::assemble(joints, limits, tool))
    }

    /// Builds a chain from parts already known to be consistent.
    pub(crate) fn assemble(joints: Vec<RevoluteJoint>, limits: Vec<JointLimits>, tool: Isometry3<f64>) -> Self {
        let n = joints.len();
        let mut chain = SerialChain {
            joints,
            limits,
            base: Isometry3::identity(),
            tool,
            positions: JointVector::zeros(n),
            velocities: JointVector::zeros(n),
            axes: Vec::with_capacity(n),
            origins: Vec::with_capacity(n),
            endpoint: Isometry3::identity(),
        };
        chain.update_kinematics();
        chain
    }

    /// Places the robot base somewhere other than the world origin.
    pub fn with_base(mut self, base: Isometry3<f64>) -> Self {
        self.base = base;
        self.update_kinematics();
        self
    }

    /// Sets the joint state and recomputes the forward kinematics.
    /// Both vectors must have one element per joint; on error the state is unchanged.
    pub fn update_state(&mut self, positions: &JointVector, velocities: &JointVector) -> Result<(), ControlError> {
        check_length("Joint positions", self.joints.len(), positions.len())?;
        check_length("Joint velocities", self.joints.len(), velocities.len())?;
        self.positions.copy_from(positions);
        self.velocities.copy_from(velocities);
        self.update_kinematics();
        Ok(())
    }

    /// Pose of the endpoint for the given joint positions, without changing the state.
    pub fn forward(&self, positions: &JointVector) -> Result<Pose, ControlError> {
        check_length("Joint positions", self.joints.len(), positions.len())?;
        let mut transform = self.base;
        for (joint, q) in self.joints.iter().zip(positions.iter()) {
            transform = transform * joint.origin * UnitQuaternion::from_axis_angle(&joint.axis, *q);
        }
        Ok(transform * self.tool)
    }

    fn update_kinematics(&mut self) {
        self.axes.clear();
        self.origins.clear();
        let mut transform = self.base;
        for (joint, q) in self.joints.iter().zip(self.positions.iter()) {
            transform = transform * joint.origin;
            self.axes.push(transform.rotation * joint.axis.into_inner());
            self.origins.push(transform.translation.vector);
            transform = transform * UnitQuaternion::from_axis_angle(&joint.axis, *q);
        }
        self.endpoint = transform * self.tool;
    }
}

impl RobotModel for SerialChain {
    fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn joint_positions(&self) -> JointVector {
        self.positions.clone()
    }

    fn joint_velocities(&self) -> JointVector {
        self.velocities.clone()
    }

    fn joint_limits(&self) -> &[JointLimits] {
        &self.limits
    }

    fn jacobian(&self) -> DMatrix<f64> {
        let p_e = self.endpoint.translation.vector;
        let mut jacobian = DMatrix::zeros(6, self.joints.len());
        for (i, (a_i, p_i)) in self.axes.iter().zip(self.origins.iter()).enumerate() {
            // Pi: a_i x (p_e - p_i)
            // wi: a_i
            let linear = a_i.cross(&(p_e - p_i));
            jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&linear);
            jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(a_i);
        }
        jacobian
    }

    /// For a chain of revolute joints the derivative of column `i` with respect to joint `j` is
    /// `[a_j x Jv_i; a_j x a_i]` when `j <= i` and `[a_i x Jv_j; 0]` when `j > i`, so only
    /// the Jacobian itself is needed.
    fn partial_derivative(&self, jacobian: &DMatrix<f64>, joint: usize) -> DMatrix<f64> {
        let n = jacobian.ncols();
        let mut derivative = DMatrix::zeros(6, n);
        if let Err(e) = check_length("Jacobian rows", 6, jacobian.nrows()) {
            error!("partial_derivative: {}", e);
            return derivative;
        }
        if joint >= n {
            error!("partial_derivative: {}", ControlError::JointIndexOutOfRange { index: joint, count: n });
            return derivative;
        }

        let linear = |i: usize| -> Vector3<f64> { jacobian.fixed_view::<3, 1>(0, i).into_owned() };
        let angular = |i: usize| -> Vector3<f64> { jacobian.fixed_view::<3, 1>(3, i).into_owned() };

        let a_j = angular(joint);
        let jv_j = linear(joint);
        for i in 0..n {
            let a_i = angular(i);
            if joint <= i {
                derivative.fixed_view_mut::<3, 1>(0, i).copy_from(&a_j.cross(&linear(i)));
                derivative.fixed_view_mut::<3, 1>(3, i).copy_from(&a_j.cross(&a_i));
            } else {
                derivative.fixed_view_mut::<3, 1>(0, i).copy_from(&a_i.cross(&jv_j));
            }
        }
        derivative
    }

    fn endpoint_pose(&self) -> Pose {
        self.endpoint
    }

    fn joint_position(&self, joint: usize) -> f64 {
        self.positions[joint]
    }

    fn joint_velocity(&self, joint: usize) -> f64 {
        self.velocities[joint]
    }
}

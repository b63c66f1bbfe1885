//! Resolved motion rate control of serial link robots.
//!
//! The controller turns a desired endpoint motion (or a desired joint motion) into joint
//! velocity commands, one call per control tick. The endpoint velocity is resolved with
//! the weighted pseudoinverse of the Jacobian, where the weighting discourages motion toward
//! joint limits. Robots with more than six joints use the remaining freedom, in the null space
//! of the Jacobian, to stay away from singular configurations.

extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix6};
use tracing::{debug, error, warn};

use crate::config::ControllerConfig;
use crate::constraints::JointLimits;
use crate::control_error::{check_length, ControlError};
use crate::joint_limit_weighting::joint_limit_weighting;
use crate::kinematic_traits::{JointVector, Pose, RobotModel, Twist, TASK_DOF};
use crate::manipulability::manipulability_gradient;
use crate::parameter_error::ParameterError;
use crate::pseudoinverse::{pseudo_inverse_with_threshold, weighted_pseudo_inverse_with_threshold};
use crate::trajectory::{CartesianTrajectory, JointTrajectory, PEAK_VELOCITY_RATIO};
use crate::utils::is_valid;
use crate::velocity_scaling::scale_velocity_vector_with_margin;

/// Largest asymmetry tolerated in a Cartesian gain format.
const GAIN_FORMAT_SYMMETRY_TOLERANCE: f64 = 1e-4;

/// Capabilities of a velocity level controller for serial link robots. All methods read the
/// robot state afresh and never fail: a command that cannot be computed is all zeros.
pub trait SerialLinkControl {
    /// Joint velocities that produce the given endpoint twist.
    fn resolve_endpoint_motion(&mut self, robot: &dyn RobotModel, twist: &Twist) -> JointVector;

    /// Joint velocities to follow the Cartesian trajectory at `time`.
    fn track_endpoint_trajectory(&mut self, robot: &dyn RobotModel, time: f64) -> JointVector;

    /// Joint velocities to follow the joint trajectory at `time`.
    fn track_joint_trajectory(&self, robot: &dyn RobotModel, time: f64) -> JointVector;
}

/// Error between two poses as a twist: translation difference and the vector part of the
/// quaternion of `R_d · R_a⁻¹`, taken with non-negative scalar part so it points along the
/// shortest rotation.
pub fn pose_error(desired: &Pose, actual: &Pose) -> Twist {
    let translation = desired.translation.vector - actual.translation.vector;
    let rotation = (desired.rotation * actual.rotation.inverse()).into_inner();
    let orientation = if rotation.scalar() < 0.0 { -rotation.imag() } else { rotation.imag() };
    let mut error = Twist::zeros();
    error.fixed_rows_mut::<3>(0).copy_from(&translation);
    error.fixed_rows_mut::<3>(3).copy_from(&orientation);
    error
}

/// Controller based on the damped weighted pseudoinverse of the Jacobian.
///
/// Targets are set in joint space or in Cartesian space, each producing its own trajectory
/// that starts at the current state of the robot at time 0. The two modes are independent.
#[derive(Debug, Clone)]
pub struct RmrcController {
    config: ControllerConfig,
    feedback_gain: f64,
    gain_format: Matrix6<f64>,
    joint_trajectory: Option<JointTrajectory>,
    cartesian_trajectory: Option<CartesianTrajectory>,
    redundant_task: Option<JointVector>,
}

impl Default for RmrcController {
    fn default() -> Self {
        Self::new()
    }
}

impl RmrcController {
    pub fn new() -> Self {
        let config = ControllerConfig::default();
        RmrcController {
            config,
            feedback_gain: config.feedback_gain,
            gain_format: Matrix6::identity(),
            joint_trajectory: None,
            cartesian_trajectory: None,
            redundant_task: None,
        }
    }

    /// Controller with custom settings. The configuration is validated first.
    pub fn with_config(config: ControllerConfig) -> Result<Self, ParameterError> {
        config.validate()?;
        Ok(RmrcController {
            config,
            feedback_gain: config.feedback_gain,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn feedback_gain(&self) -> f64 {
        self.feedback_gain
    }

    pub fn gain_format(&self) -> &Matrix6<f64> {
        &self.gain_format
    }

    pub fn joint_trajectory(&self) -> Option<&JointTrajectory> {
        self.joint_trajectory.as_ref()
    }

    pub fn cartesian_trajectory(&self) -> Option<&CartesianTrajectory> {
        self.cartesian_trajectory.as_ref()
    }

    /// Plans a joint trajectory from the current positions to `target`.
    ///
    /// Target components on or past a position limit are moved inside by the configured
    /// margin. Non-finite components are refused. The duration is chosen so that no joint exceeds its velocity limit at the
    /// peak of the quintic profile, but is never shorter than the configured minimum.
    ///
    /// # Returns
    ///
    /// The end time of the new trajectory. On error the previous trajectory is kept.
    pub fn set_joint_target(&mut self, robot: &dyn RobotModel, target: &JointVector) -> Result<f64, ControlError> {
        check_length("Joint target", robot.joint_count(), target.len())
            .and_then(|_| check_finite_joints(target))
            .inspect_err(|e| error!("set_joint_target: {}, joint target has not been set", e))?;

        let start = robot.joint_positions();
        let (target, duration) = self.plan_joint_segment(robot.joint_limits(), &start, target)?;
        let end_time = duration.max(self.config.min_trajectory_time);

        self.joint_trajectory = Some(JointTrajectory::new(start, target, 0.0, end_time)?);
        Ok(end_time)
    }

    /// Plans a joint trajectory through several waypoints, resting at each.
    ///
    /// # Arguments
    ///
    /// * `targets` - Waypoints, each clamped to the limits like a single target
    /// * `times` - Arrival time of each waypoint, positive and strictly increasing
    ///
    /// # Returns
    ///
    /// The end time. A segment too short for the velocity limits is extended and all later
    /// arrival times are shifted by the same amount.
    pub fn set_joint_targets(&mut self, robot: &dyn RobotModel, targets: &[JointVector], times: &[f64])
                             -> Result<f64, ControlError> {
        check_waypoint_times(targets.len(), times)
            .inspect_err(|e| error!("set_joint_targets: {}", e))?;
        for target in targets {
            check_length("Joint target", robot.joint_count(), target.len())
                .and_then(|_| check_finite_joints(target))
                .inspect_err(|e| error!("set_joint_targets: {}", e))?;
        }

        let start = robot.joint_positions();
        let mut points = Vec::with_capacity(targets.len());
        let mut arrivals = Vec::with_capacity(times.len());
        let mut previous = start.clone();
        let mut previous_time = 0.0;
        let mut shift = 0.0;
        for (i, (target, time)) in targets.iter().zip(times).enumerate() {
            let (point, needed) = self.plan_joint_segment(robot.joint_limits(), &previous, target)?;
            let arrival = extend_segment(i, previous_time, time + shift, needed);
            shift = arrival - time;
            previous = point.clone();
            previous_time = arrival;
            points.push(point);
            arrivals.push(arrival);
        }

        let trajectory = JointTrajectory::with_waypoints(start, 0.0, points, arrivals)?;
        let end_time = trajectory.end_time();
        self.joint_trajectory = Some(trajectory);
        Ok(end_time)
    }

    /// Clamps `target` to the limits and returns it with the shortest duration that keeps
    /// every joint within its velocity limit, `15 |Δq| / (8 v)`.
    fn plan_joint_segment(&self, limits: &[JointLimits], from: &JointVector, target: &JointVector)
                          -> Result<(JointVector, f64), ControlError> {
        check_length("Joint limits", target.len(), limits.len())
            .and_then(|_| check_length("Joint positions", target.len(), from.len()))
            .inspect_err(|e| error!("Cannot plan the joint trajectory: {}", e))?;
        let margin = self.config.joint_limit_margin;
        let mut clamped = target.clone();
        let mut duration: f64 = 0.0;
        for (i, limit) in limits.iter().enumerate() {
            let (value, corrected) = limit.clamp_target(target[i], margin);
            if corrected {
                // Past half the range the margin would carry the value beyond the other limit
                if 2.0 * margin >= limit.range() {
                    error!("Margin {} does not fit into the range {} of joint {}", margin, limit.range(), i);
                    return Err(ControlError::MarginExceedsRange { joint: i, margin, range: limit.range() });
                }
                warn!("Target {} for joint {} is outside [{}, {}], using {}",
                      target[i], i, limit.lower, limit.upper, value);
            }
            clamped[i] = value;

            let distance = (value - from[i]).abs();
            if distance == 0.0 {
                continue;
            }
            if !(limit.velocity > 0.0) {
                error!("Joint {} has to move {} but cannot move at all", i, distance);
                return Err(ControlError::ImmobileJoint { joint: i });
            }
            duration = duration.max(PEAK_VELOCITY_RATIO * distance / limit.velocity);
        }
        Ok((clamped, duration))
    }

    /// Sets the gain on the tracking error. Negative values are refused.
    pub fn set_feedback_gain(&mut self, gain: f64) -> Result<(), ControlError> {
        if !(gain >= 0.0) || !gain.is_finite() {
            error!("set_feedback_gain: value cannot be negative, got {}", gain);
            return Err(ControlError::NegativeGain(gain));
        }
        self.feedback_gain = gain;
        Ok(())
    }

    /// Shapes the Cartesian feedback: the effective gain is `k · format`. The format must be
    /// symmetric with a positive diagonal, so it can weight the task directions differently.
    pub fn set_cartesian_gain_format(&mut self, format: &Matrix6<f64>) -> Result<(), ControlError> {
        let symmetric = (format - format.transpose()).norm() < GAIN_FORMAT_SYMMETRY_TOLERANCE;
        let positive = format.diagonal().iter().all(|d| *d > 0.0);
        if !symmetric || !positive || !format.iter().all(|x| x.is_finite()) {
            error!("set_cartesian_gain_format: format rejected\n{}", format);
            return Err(ControlError::AsymmetricGainFormat);
        }
        self.gain_format = *format;
        Ok(())
    }

    /// Plans a Cartesian trajectory from the current endpoint pose to `target`.
    ///
    /// # Returns
    ///
    /// The duration actually used. It is longer than `time` if reaching the target in
    /// `time` would exceed the configured linear or angular speed.
    pub fn set_target_pose(&mut self, robot: &dyn RobotModel, target: &Pose, time: f64) -> Result<f64, ControlError> {
        if !(time > 0.0) || !time.is_finite() {
            error!("set_target_pose: time must be greater than zero, got {}", time);
            return Err(ControlError::NonPositiveTime(time));
        }
        check_finite_pose(target).inspect_err(|e| error!("set_target_pose: {}", e))?;

        let current = robot.endpoint_pose();
        let (linear, angular) = self.min_cartesian_times(&current, target);
        let mut time = time;
        if linear > time {
            warn!("Linear velocity exceeds {} m/s, increasing the trajectory time from {} to {} s",
                  self.config.max_linear_speed, time, linear);
            time = linear;
        }
        if angular > time {
            warn!("Angular velocity exceeds {} rad/s, increasing the trajectory time from {} to {} s",
                  self.config.max_angular_speed, time, angular);
            time = angular;
        }
        self.cartesian_trajectory = Some(CartesianTrajectory::new(current, *target, 0.0, time)?);
        Ok(time)
    }

    /// Plans a Cartesian trajectory through several poses, resting at each. Times follow the
    /// same rules as in [`RmrcController::set_joint_targets`].
    pub fn set_target_poses(&mut self, robot: &dyn RobotModel, targets: &[Pose], times: &[f64])
                            -> Result<f64, ControlError> {
        check_waypoint_times(targets.len(), times)
            .inspect_err(|e| error!("set_target_poses: {}", e))?;
        for target in targets {
            check_finite_pose(target).inspect_err(|e| error!("set_target_poses: {}", e))?;
        }

        let start = robot.endpoint_pose();
        let mut arrivals = Vec::with_capacity(times.len());
        let mut previous = start;
        let mut previous_time = 0.0;
        let mut shift = 0.0;
        for (i, (target, time)) in targets.iter().zip(times).enumerate() {
            let (linear, angular) = self.min_cartesian_times(&previous, target);
            let needed = linear.max(angular);
            let arrival = extend_segment(i, previous_time, time + shift, needed);
            shift = arrival - time;
            previous = *target;
            previous_time = arrival;
            arrivals.push(arrival);
        }

        let trajectory = CartesianTrajectory::with_waypoints(start, 0.0, targets.to_vec(), arrivals)?;
        let end_time = trajectory.end_time();
        self.cartesian_trajectory = Some(trajectory);
        Ok(end_time)
    }

    /// Shortest times to move between two poses within the linear and the angular speed limit.
    fn min_cartesian_times(&self, from: &Pose, to: &Pose) -> (f64, f64) {
        let distance = (to.translation.vector - from.translation.vector).norm();
        let angle = from.rotation.angle_to(&to.rotation); // Shortest path, in [0, π]
        (distance / self.config.max_linear_speed, angle / self.config.max_angular_speed)
    }

    /// Task vector used once, in place of the manipulability gradient, on the next Cartesian
    /// control tick. It is projected into the null space so it does not disturb the endpoint.
    pub fn set_redundant_task(&mut self, robot: &dyn RobotModel, task: JointVector) -> Result<(), ControlError> {
        check_length("Redundant task", robot.joint_count(), task.len())
            .inspect_err(|e| error!("set_redundant_task: {}", e))?;
        self.redundant_task = Some(task);
        Ok(())
    }

    fn cartesian_gain(&self) -> Matrix6<f64> {
        self.gain_format * self.feedback_gain
    }

    /// Joint velocities to track the Cartesian trajectory at `time`:
    /// feedforward of the desired endpoint velocity plus feedback on the pose error.
    pub fn cartesian_control(&mut self, robot: &dyn RobotModel, time: f64) -> JointVector {
        let Some(trajectory) = &self.cartesian_trajectory else {
            debug!("No Cartesian trajectory, commanding zero velocity");
            return JointVector::zeros(robot.joint_count());
        };
        let desired = trajectory.state(time);
        let twist = desired.velocity + self.cartesian_gain() * pose_error(&desired.pose, &robot.endpoint_pose());
        self.resolve_endpoint_motion(robot, &twist)
    }

    /// Joint velocities to track the joint trajectory at `time`:
    /// `q̇_d + k (q_d − q)`.
    pub fn joint_control(&self, robot: &dyn RobotModel, time: f64) -> JointVector {
        let n = robot.joint_count();
        let Some(trajectory) = &self.joint_trajectory else {
            debug!("No joint trajectory, commanding zero velocity");
            return JointVector::zeros(n);
        };
        if trajectory.dimension() != n {
            error!("Joint trajectory has {} joints but the robot has {}", trajectory.dimension(), n);
            return JointVector::zeros(n);
        }
        let positions = robot.joint_positions();
        if let Err(e) = check_length("Joint positions", n, positions.len()) {
            error!("Cannot track the joint trajectory: {}", e);
            return JointVector::zeros(n);
        }
        let desired = trajectory.state(time);
        desired.velocity + (desired.position - positions) * self.feedback_gain
    }

    /// Range space solution plus, for redundant robots, a null space motion. Both are scaled
    /// to the velocity limits; the null space part is scaled relative to the whole command so
    /// that it gives way first.
    fn resolve(&mut self, robot: &dyn RobotModel, twist: &Twist) -> JointVector {
        let n = robot.joint_count();
        let zero = JointVector::zeros(n);
        let task = self.redundant_task.take();

        let jacobian = robot.jacobian();
        if jacobian.shape() != (TASK_DOF, n) {
            error!("Jacobian is {}x{}, expected {}x{}", jacobian.nrows(), jacobian.ncols(), TASK_DOF, n);
            return zero;
        }
        let snapshot = [
            ("Joint positions", robot.joint_positions().len()),
            ("Joint velocities", robot.joint_velocities().len()),
            ("Joint limits", robot.joint_limits().len()),
        ];
        for (context, found) in snapshot {
            if let Err(e) = check_length(context, n, found) {
                error!("Cannot resolve the endpoint motion: {}", e);
                return zero;
            }
        }
        let threshold = self.config.singular_value_threshold;
        let weighting = joint_limit_weighting(robot);
        let inv_j = weighted_pseudo_inverse_with_threshold(&jacobian, &weighting, threshold);

        let mut qdot_r = &inv_j * DVector::from_column_slice(twist.as_slice());
        let limits = robot.velocity_limits();
        let reference = qdot_r.clone();
        if let Err(e) = self.scale(&mut qdot_r, &reference, &limits) {
            error!("Cannot scale the joint velocities: {}", e);
            return zero;
        }

        if n <= TASK_DOF {
            return qdot_r; // No redundancy available
        }

        let null_space = DMatrix::identity(n, n) - &inv_j * &jacobian;
        let gradient = match task {
            Some(task) if task.len() == n => task,
            Some(task) => {
                warn!("Redundant task has {} elements but the robot has {} joints, ignored", task.len(), n);
                manipulability_gradient(robot, &jacobian, self.config.manipulability_scalar)
            }
            None => manipulability_gradient(robot, &jacobian, self.config.manipulability_scalar),
        };
        let inv_w = pseudo_inverse_with_threshold(&weighting, threshold);
        let mut qdot_n = null_space * inv_w * gradient;

        let qdot = &qdot_r + &qdot_n;
        if let Err(e) = self.scale(&mut qdot_n, &qdot, &limits) {
            error!("Cannot scale the null space velocities: {}", e);
            return qdot_r;
        }
        qdot_r + qdot_n
    }

    fn scale(&self, candidate: &mut JointVector, reference: &JointVector, limits: &[f64]) -> Result<f64, ControlError> {
        scale_velocity_vector_with_margin(candidate, reference, limits, self.config.velocity_safety_factor)
    }
}

impl SerialLinkControl for RmrcController {
    fn resolve_endpoint_motion(&mut self, robot: &dyn RobotModel, twist: &Twist) -> JointVector {
        self.resolve(robot, twist)
    }

    fn track_endpoint_trajectory(&mut self, robot: &dyn RobotModel, time: f64) -> JointVector {
        self.cartesian_control(robot, time)
    }

    fn track_joint_trajectory(&self, robot: &dyn RobotModel, time: f64) -> JointVector {
        self.joint_control(robot, time)
    }
}

fn check_finite_joints(target: &JointVector) -> Result<(), ControlError> {
    if !is_valid(target) {
        return Err(ControlError::NonFiniteTarget { context: "Joint target" });
    }
    Ok(())
}

fn check_finite_pose(target: &Pose) -> Result<(), ControlError> {
    let translation = target.translation.vector.iter();
    if !translation.chain(target.rotation.coords.iter()).all(|x| x.is_finite()) {
        return Err(ControlError::NonFiniteTarget { context: "Target pose" });
    }
    Ok(())
}

/// One arrival time per waypoint, positive and strictly increasing.
fn check_waypoint_times(waypoints: usize, times: &[f64]) -> Result<(), ControlError> {
    if waypoints == 0 {
        return Err(ControlError::EmptyTrajectory);
    }
    check_length("Waypoint times", waypoints, times.len())?;
    let mut previous = 0.0;
    for &time in times {
        if !time.is_finite() || time <= previous {
            return Err(ControlError::WaypointTimes(
                format!("{:?} must be positive and strictly increasing", times)));
        }
        previous = time;
    }
    Ok(())
}

/// Arrival time of segment `index` that leaves at least `needed` seconds after `previous`.
fn extend_segment(index: usize, previous: f64, requested: f64, needed: f64) -> f64 {
    if requested - previous >= needed {
        return requested;
    }
    warn!("Waypoint {} needs {:.4} s but only {:.4} s are available, extending the trajectory",
          index, needed, requested - previous);
    previous + needed
}

//! Rest-to-rest trajectories through a list of waypoints, in joint space and in Cartesian space.
//!
//! Every segment uses the quintic time scaling, so the robot starts and stops each segment
//! with zero velocity and zero acceleration. The state can be queried for any time: before
//! the start the trajectory holds the first waypoint, after the end it holds the last one.

extern crate nalgebra as na;

use na::{UnitQuaternion, Vector3};
use crate::control_error::{check_length, ControlError};
use crate::kinematic_traits::{JointVector, Pose, Twist};

/// Peak of `ds/dτ` for the quintic scaling, reached at τ = 0.5. A segment of duration `T`
/// covering distance `d` peaks at velocity `PEAK_VELOCITY_RATIO · d / T`.
pub const PEAK_VELOCITY_RATIO: f64 = 15.0 / 8.0;

/// Quintic time scaling `s(τ) = 10τ³ − 15τ⁴ + 6τ⁵` on the normalized time τ ∈ [0, 1].
///
/// # Returns
///
/// `(s, ds/dτ, d²s/dτ²)`. τ outside [0, 1] is clamped, so the derivatives vanish there.
pub fn quintic_time_scaling(tau: f64) -> (f64, f64, f64) {
    let t = tau.clamp(0.0, 1.0);
    let t2 = t * t;
    let t3 = t2 * t;
    let s = t3 * (10.0 - 15.0 * t + 6.0 * t2);
    let ds = 30.0 * t2 * (1.0 - 2.0 * t + t2);
    let dds = 60.0 * t * (1.0 - 3.0 * t + 2.0 * t2);
    (s, ds, dds)
}

/// Checks the arrival times of waypoints: one per point, finite and strictly increasing
/// after `start_time`.
fn check_times(start_time: f64, times: &[f64], points: usize) -> Result<(), ControlError> {
    if points == 0 {
        return Err(ControlError::EmptyTrajectory);
    }
    check_length("Waypoint times", points, times.len())?;
    let mut previous = start_time;
    for (i, &time) in times.iter().enumerate() {
        if !time.is_finite() || time <= previous {
            return Err(ControlError::WaypointTimes(
                format!("time {} of waypoint {} must be after {}", time, i, previous)));
        }
        previous = time;
    }
    Ok(())
}

/// Segment index and normalized time within it. `times` has at least two entries and
/// `time` lies strictly inside the trajectory.
fn locate(times: &[f64], time: f64) -> (usize, f64, f64) {
    let segment = times.windows(2)
        .position(|w| time < w[1])
        .unwrap_or(times.len() - 2);
    let duration = times[segment + 1] - times[segment];
    (segment, (time - times[segment]) / duration, duration)
}

fn stack(linear: &Vector3<f64>, angular: &Vector3<f64>) -> Twist {
    Twist::new(linear.x, linear.y, linear.z, angular.x, angular.y, angular.z)
}

/// Desired joint state at some instant.
#[derive(Debug, Clone, PartialEq)]
pub struct JointState {
    pub position: JointVector,
    pub velocity: JointVector,
    pub acceleration: JointVector,
}

impl JointState {
    fn at_rest(position: &JointVector) -> Self {
        JointState {
            position: position.clone(),
            velocity: JointVector::zeros(position.len()),
            acceleration: JointVector::zeros(position.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JointTrajectory {
    // knots[0] is the start, reached at times[0]
    knots: Vec<JointVector>,
    times: Vec<f64>,
}

impl JointTrajectory {
    /// Single segment from `start` at `start_time` to `end` at `end_time`.
    pub fn new(start: JointVector, end: JointVector, start_time: f64, end_time: f64)
               -> Result<Self, ControlError> {
        if !(end_time - start_time > 0.0) {
            return Err(ControlError::NonPositiveTime(end_time - start_time));
        }
        Self::with_waypoints(start, start_time, vec![end], vec![end_time])
    }

    /// Trajectory from `start` through all `points`, arriving at `points[i]` at `times[i]`
    /// and resting there for an instant.
    ///
    /// # Arguments
    ///
    /// * `start` - Initial joint positions
    /// * `start_time` - Time at which the motion starts
    /// * `points` - Waypoints, each with as many elements as `start`
    /// * `times` - Absolute arrival times, strictly increasing and after `start_time`
    pub fn with_waypoints(start: JointVector, start_time: f64, points: Vec<JointVector>, times: Vec<f64>)
                          -> Result<Self, ControlError> {
        if !start_time.is_finite() {
            return Err(ControlError::WaypointTimes(format!("start time {} is not finite", start_time)));
        }
        check_times(start_time, &times, points.len())?;
        for point in &points {
            check_length("Waypoint", start.len(), point.len())?;
        }

        let mut knots = Vec::with_capacity(points.len() + 1);
        knots.push(start);
        knots.extend(points);
        let mut all_times = Vec::with_capacity(times.len() + 1);
        all_times.push(start_time);
        all_times.extend(times);
        Ok(JointTrajectory { knots, times: all_times })
    }

    /// Desired position, velocity and acceleration at `time`.
    pub fn state(&self, time: f64) -> JointState {
        if time <= self.start_time() {
            return JointState::at_rest(&self.knots[0]);
        }
        if time >= self.end_time() {
            return JointState::at_rest(self.end_position());
        }

        let (segment, tau, duration) = locate(&self.times, time);
        let (s, ds, dds) = quintic_time_scaling(tau);
        let from = &self.knots[segment];
        let delta = &self.knots[segment + 1] - from;
        JointState {
            position: from + &delta * s,
            velocity: &delta * (ds / duration),
            acceleration: &delta * (dds / (duration * duration)),
        }
    }

    pub fn start_time(&self) -> f64 {
        self.times[0]
    }

    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn end_position(&self) -> &JointVector {
        &self.knots[self.knots.len() - 1]
    }

    /// Number of joints
    pub fn dimension(&self) -> usize {
        self.knots[0].len()
    }

    /// Arrival times of the waypoints, not including the start time.
    pub fn arrival_times(&self) -> &[f64] {
        &self.times[1..]
    }
}

/// Desired endpoint state at some instant. Velocity and acceleration are in the world frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianState {
    pub pose: Pose,
    pub velocity: Twist,
    pub acceleration: Twist,
}

#[derive(Debug, Clone)]
pub struct CartesianTrajectory {
    knots: Vec<Pose>,
    times: Vec<f64>,
    // Rotation of each segment as a rotation vector in the frame of its first pose
    rotations: Vec<Vector3<f64>>,
}

impl CartesianTrajectory {
    pub fn new(start: Pose, end: Pose, start_time: f64, end_time: f64) -> Result<Self, ControlError> {
        if !(end_time - start_time > 0.0) {
            return Err(ControlError::NonPositiveTime(end_time - start_time));
        }
        Self::with_waypoints(start, start_time, vec![end], vec![end_time])
    }

    /// Trajectory from `start` through all `points`. Position moves in a straight line and
    /// orientation turns about a fixed axis along the shortest rotation within each segment.
    pub fn with_waypoints(start: Pose, start_time: f64, points: Vec<Pose>, times: Vec<f64>)
                          -> Result<Self, ControlError> {
        if !start_time.is_finite() {
            return Err(ControlError::WaypointTimes(format!("start time {} is not finite", start_time)));
        }
        check_times(start_time, &times, points.len())?;

        let mut knots = Vec::with_capacity(points.len() + 1);
        knots.push(start);
        knots.extend(points);
        let rotations = knots.windows(2)
            .map(|w| (w[0].rotation.inverse() * w[1].rotation).scaled_axis())
            .collect();
        let mut all_times = Vec::with_capacity(times.len() + 1);
        all_times.push(start_time);
        all_times.extend(times);
        Ok(CartesianTrajectory { knots, times: all_times, rotations })
    }

    pub fn state(&self, time: f64) -> CartesianState {
        let at_rest = |pose: &Pose| CartesianState {
            pose: *pose,
            velocity: Twist::zeros(),
            acceleration: Twist::zeros(),
        };
        if time <= self.start_time() {
            return at_rest(&self.knots[0]);
        }
        if time >= self.end_time() {
            return at_rest(self.end_pose());
        }

        let (segment, tau, duration) = locate(&self.times, time);
        let (s, ds, dds) = quintic_time_scaling(tau);
        let from = &self.knots[segment];
        let to = &self.knots[segment + 1];

        let translation = to.translation.vector - from.translation.vector;
        let rotation = &self.rotations[segment];
        let axis_world = from.rotation * rotation; // Fixed during the segment

        let mut pose = *from;
        pose.translation.vector += translation * s;
        pose.rotation = from.rotation * UnitQuaternion::from_scaled_axis(rotation * s);

        let rate = ds / duration;
        let rate_dot = dds / (duration * duration);
        CartesianState {
            pose,
            velocity: stack(&(translation * rate), &(axis_world * rate)),
            acceleration: stack(&(translation * rate_dot), &(axis_world * rate_dot)),
        }
    }

    pub fn start_time(&self) -> f64 {
        self.times[0]
    }

    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn end_pose(&self) -> &Pose {
        &self.knots[self.knots.len() - 1]
    }

    pub fn arrival_times(&self) -> &[f64] {
        &self.times[1..]
    }
}

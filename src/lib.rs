//! Resolved motion rate control (RMRC) for serial link robots, including redundant ones.
//!
//! Each control tick, the controller maps a desired endpoint velocity (plus feedback on the
//! pose error) to joint velocities through the weighted, damped pseudoinverse of the Jacobian.
//! Singular values below a threshold are dropped instead of inverted, so commands stay
//! bounded near singularities.
//!
//! # Features
//!
//! - Joint space and Cartesian space targets, with quintic trajectories that respect the
//!   joint velocity limits and the endpoint speed limits. Several waypoints are supported.
//! - Joint limit avoidance with the weighted least-norm scheme of Chan and Dubey (1995):
//!   joints moving toward a limit are penalised.
//! - Commanded velocities are scaled uniformly into the velocity limits, so the direction of
//!   motion is preserved.
//! - Robots with more than six joints move in the null space of the Jacobian to increase
//!   manipulability, or follow a user supplied redundant task, without disturbing the endpoint.
//! - A ready [`serial_chain::SerialChain`] robot model with analytic Jacobian derivatives,
//!   and presets for a KUKA iiwa 14 and planar arms. Any other model can be used by
//!   implementing [`kinematic_traits::RobotModel`].
//! - Controller settings can be read from YAML (feature `allow_filesystem`, on by default).
//!
//! The library never blocks or panics inside the control loop. Problems are reported with
//! [`tracing`] events; install a subscriber to see them.
//!
//! # Example
//!
//! ```
//! use rs_rmrc_control::controller::RmrcController;
//! use rs_rmrc_control::kinematic_traits::RobotModel;
//! use rs_rmrc_control::serial_chain::SerialChain;
//! use rs_rmrc_control::utils::as_radians;
//!
//! let mut robot = SerialChain::kuka_iiwa14();
//! let mut controller = RmrcController::new();
//! let end_time = controller.set_joint_target(&robot, &as_radians(&[0.0, 20.0, 0.0, -40.0, 0.0, 30.0, 0.0]))
//!     .expect("valid target");
//!
//! let dt = 0.01;
//! let mut time = 0.0;
//! while time < end_time {
//!     let qdot = controller.joint_control(&robot, time);
//!     let q = robot.joint_positions() + &qdot * dt;
//!     robot.update_state(&q, &qdot).expect("same joint count");
//!     time += dt;
//! }
//! ```

pub mod kinematic_traits;
pub mod constraints;
pub mod control_error;
pub mod parameter_error;

pub mod pseudoinverse;
pub mod joint_limit_weighting;
pub mod velocity_scaling;
pub mod manipulability;

pub mod trajectory;
pub mod config;
pub mod controller;

pub mod serial_chain;
pub mod parameters_robots;

#[cfg(feature = "allow_filesystem")]
pub mod config_from_file;

#[path = "utils/utils.rs"]
pub mod utils;

#[cfg(test)]
mod tests;

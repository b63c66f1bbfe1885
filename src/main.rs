use anyhow::Result;
use nalgebra::{Translation3, UnitQuaternion, Vector3};
use tracing_subscriber::EnvFilter;

use rs_rmrc_control::controller::{pose_error, RmrcController};
use rs_rmrc_control::kinematic_traits::RobotModel;
use rs_rmrc_control::serial_chain::SerialChain;
use rs_rmrc_control::utils::{as_radians, dump_joints, dump_pose, error_norms};

/// Control rate of the simulated robot, Hz
const RATE: f64 = 100.0;

/// Usage example: move a simulated iiwa first in joint space, then in Cartesian space,
/// integrating the commanded velocities as a perfect velocity controlled robot would.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut robot = SerialChain::kuka_iiwa14();
    let mut controller = RmrcController::new();
    controller.set_feedback_gain(5.0)?;
    let dt = 1.0 / RATE;

    let target = as_radians(&[10.0, 30.0, 0.0, -60.0, 0.0, 45.0, 0.0]);
    let end_time = controller.set_joint_target(&robot, &target)?;
    println!("Joint trajectory of {:.3} s to:", end_time);
    dump_joints(&target);

    let mut time = 0.0;
    while time <= end_time + 0.5 {
        let qdot = controller.joint_control(&robot, time);
        let q = robot.joint_positions() + &qdot * dt;
        robot.update_state(&q, &qdot)?;
        time += dt;
    }
    println!("Reached:");
    dump_joints(&robot.joint_positions());

    let start = robot.endpoint_pose();
    let mut target = start;
    target.translation = Translation3::from(start.translation.vector + Vector3::new(0.1, -0.2, -0.1));
    target.rotation = UnitQuaternion::from_euler_angles(0.0, 0.3, 0.0) * start.rotation;
    let end_time = controller.set_target_pose(&robot, &target, 0.2)?;
    println!("Cartesian trajectory of {:.3} s to:", end_time);
    dump_pose(&target);

    let mut time = 0.0;
    let mut tick = 0;
    while time <= end_time + 0.5 {
        let qdot = controller.cartesian_control(&robot, time);
        let q = robot.joint_positions() + &qdot * dt;
        robot.update_state(&q, &qdot)?;
        if tick % 20 == 0 {
            let desired = controller.cartesian_trajectory().map(|t| t.state(time).pose).unwrap_or(target);
            let (linear, angular) = error_norms(&pose_error(&desired, &robot.endpoint_pose()));
            println!("t = {:5.2} s  tracking error {:.6} m, {:.6} rad", time, linear, angular);
        }
        time += dt;
        tick += 1;
    }

    let (linear, angular) = error_norms(&pose_error(&target, &robot.endpoint_pose()));
    println!("Residual error {:.6} m, {:.6} rad", linear, angular);
    dump_pose(&robot.endpoint_pose());
    Ok(())
}

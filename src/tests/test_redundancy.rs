#[cfg(test)]
mod tests {
    use crate::controller::{pose_error, RmrcController, SerialLinkControl};
    use crate::kinematic_traits::{JointVector, RobotModel, Twist};
    use crate::manipulability::manipulability;
    use crate::tests::test_utils::{integrate, redundant_arm};
    use crate::utils::error_norms;

    const DT: f64 = 0.01;

    #[test]
    fn test_null_space_motion_increases_manipulability() {
        let mut robot = redundant_arm();
        let mut controller = RmrcController::new();
        controller.set_feedback_gain(5.0).unwrap();
        let hold = robot.endpoint_pose();
        controller.set_target_pose(&robot, &hold, 1.0).unwrap();

        let before = manipulability(&robot.jacobian());
        let start = robot.joint_positions();
        for step in 0..200 {
            let qdot = controller.track_endpoint_trajectory(&robot, step as f64 * DT);
            integrate(&mut robot, &qdot, DT);
        }
        let after = manipulability(&robot.jacobian());

        // The arm reconfigured itself while the endpoint stayed put
        assert!(after > before, "manipulability {} -> {}", before, after);
        assert!((robot.joint_positions() - start).norm() > 1e-4);
        let (linear, angular) = error_norms(&pose_error(&hold, &robot.endpoint_pose()));
        assert!(linear < 1e-3 && angular < 1e-3);
    }

    #[test]
    fn test_joint_moving_toward_limit_moves_less() {
        // Joint 6 close to its upper limit of 120 degrees
        let q = JointVector::from_vec(vec![0.1, 0.5, -0.2, -1.2, 0.3, 2.05, 0.2]);
        let twist = Twist::new(0.02, -0.01, 0.03, 0.0, 0.05, 0.0);
        let mut controller = RmrcController::new();

        let mut at_rest = redundant_arm();
        at_rest.update_state(&q, &JointVector::zeros(7)).unwrap();
        controller.set_redundant_task(&at_rest, JointVector::zeros(7)).unwrap();
        let free = controller.resolve_endpoint_motion(&at_rest, &twist);

        let mut velocity = JointVector::zeros(7);
        velocity[5] = 0.5;
        let mut approaching = redundant_arm();
        approaching.update_state(&q, &velocity).unwrap();
        controller.set_redundant_task(&approaching, JointVector::zeros(7)).unwrap();
        let weighted = controller.resolve_endpoint_motion(&approaching, &twist);

        assert!(free[5].abs() > 1e-6);
        assert!(weighted[5].abs() < 0.9 * free[5].abs(), "{} vs {}", weighted[5], free[5]);

        // Both still produce the requested endpoint velocity
        let expected = nalgebra::DVector::from_column_slice(twist.as_slice());
        assert!((approaching.jacobian() * &weighted - &expected).norm() < 1e-9);
        assert!((at_rest.jacobian() * &free - &expected).norm() < 1e-9);
    }
}

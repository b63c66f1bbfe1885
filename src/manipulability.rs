//! Singularity avoidance for redundant robots.
//!
//! The manipulability `μ = sqrt(det(J Jᵗ))` drops to zero at a kinematic singularity.
//! Following its gradient in the null space of the Jacobian moves the robot away from
//! singular configurations without changing the endpoint motion.

extern crate nalgebra as na;

use na::{DMatrix, DVector};
use tracing::{debug, error};
use crate::control_error::ControlError;
use crate::kinematic_traits::{JointVector, RobotModel};
use crate::pseudoinverse::pseudo_inverse;

/// Manipulability measure `sqrt(det(J Jᵗ))` of the given Jacobian, 0 when singular.
pub fn manipulability(jacobian: &DMatrix<f64>) -> f64 {
    let determinant = (jacobian * jacobian.transpose()).determinant();
    if determinant > 0.0 { determinant.sqrt() } else { 0.0 }
}

/// Gradient of manipulability with respect to the joint positions, scaled by `scalar`.
///
/// Component `i` is `scalar · μ · trace(∂J/∂qᵢ · J⁺)`. The first joint of a chain on a fixed
/// base only rotates the whole robot, which leaves manipulability unchanged, so its
/// component is always zero.
///
/// # Arguments
///
/// * `robot` - Supplies the partial derivatives of the Jacobian
/// * `jacobian` - The Jacobian at the current configuration
/// * `scalar` - Step size weight, must be positive
///
/// # Returns
///
/// The gradient, or all zeros if `scalar` is not positive or a derivative of the Jacobian
/// has the wrong shape.
pub fn manipulability_gradient(robot: &dyn RobotModel,
                               jacobian: &DMatrix<f64>,
                               scalar: f64) -> JointVector {
    let n = jacobian.ncols();
    let mut gradient = DVector::zeros(n);

    if !(scalar > 0.0) || !scalar.is_finite() {
        error!("manipulability_gradient: {}", ControlError::NonPositiveScalar(scalar));
        return gradient;
    }

    let jjt = jacobian * jacobian.transpose();
    let inv_j = jacobian.transpose() * pseudo_inverse(&jjt);
    let mu = manipulability(jacobian);
    debug!("Manipulability {:.6}", mu);
    if mu == 0.0 {
        return gradient; // No direction out of the singularity from the first derivative
    }

    for i in 1..n {
        let dj = robot.partial_derivative(jacobian, i);
        if dj.shape() != jacobian.shape() {
            error!("Derivative of the Jacobian for joint {} is {}x{}, expected {}x{}",
                   i, dj.nrows(), dj.ncols(), jacobian.nrows(), jacobian.ncols());
            return DVector::zeros(n);
        }
        gradient[i] = scalar * mu * (dj * &inv_j).trace();
    }
    gradient
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::{redundant_arm, six_axis_arm, Misreporting};

    #[test]
    fn test_identity_jacobian_manipulability() {
        let j = DMatrix::<f64>::identity(6, 6);
        assert!((manipulability(&j) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_jacobian_manipulability() {
        let mut j = DMatrix::<f64>::identity(6, 7);
        j.set_column(0, &DVector::zeros(6));
        assert_eq!(manipulability(&j), 0.0);
    }

    #[test]
    fn test_non_positive_scalar_gives_zero() {
        let robot = redundant_arm();
        let j = robot.jacobian();
        assert_eq!(manipulability_gradient(&robot, &j, 0.0), DVector::zeros(7));
        assert_eq!(manipulability_gradient(&robot, &j, -1.0), DVector::zeros(7));
        assert_eq!(manipulability_gradient(&robot, &j, f64::NAN), DVector::zeros(7));
    }

    #[test]
    fn test_misshapen_derivative_gives_zero() {
        let mut model = Misreporting::new(redundant_arm());
        model.derivative_rows = 3;
        let j = model.jacobian();
        assert_eq!(manipulability_gradient(&model, &j, 1.0), DVector::zeros(7));
    }

    #[test]
    fn test_first_joint_component_is_zero() {
        let robot = redundant_arm();
        let gradient = manipulability_gradient(&robot, &robot.jacobian(), 1.0);
        assert_eq!(gradient[0], 0.0);
        assert!(gradient.iter().any(|g| g.abs() > 1e-9));
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let mut robot = redundant_arm();
        let q = robot.joint_positions();
        let gradient = manipulability_gradient(&robot, &robot.jacobian(), 1.0);

        let step = 1e-6;
        for i in 1..q.len() {
            let mut plus = q.clone();
            plus[i] += step;
            robot.update_state(&plus, &DVector::zeros(q.len())).unwrap();
            let mu_plus = manipulability(&robot.jacobian());

            let mut minus = q.clone();
            minus[i] -= step;
            robot.update_state(&minus, &DVector::zeros(q.len())).unwrap();
            let mu_minus = manipulability(&robot.jacobian());

            let numeric = (mu_plus - mu_minus) / (2.0 * step);
            assert!((numeric - gradient[i]).abs() < 1e-5,
                    "joint {}: numeric {} analytic {}", i, numeric, gradient[i]);
        }
    }

    #[test]
    fn test_gradient_scales_linearly() {
        let robot = six_axis_arm();
        let j = robot.jacobian();
        let one = manipulability_gradient(&robot, &j, 1.0);
        let half = manipulability_gradient(&robot, &j, 0.5);
        assert!((one * 0.5 - half).norm() < 1e-12);
    }
}

//! Tunable settings of the controller

use crate::parameter_error::ParameterError;
use crate::pseudoinverse::SINGULAR_VALUE_THRESHOLD;
use crate::velocity_scaling::VELOCITY_SAFETY_FACTOR;

/// Settings of [`crate::controller::RmrcController`]. The defaults suit a typical
/// industrial arm driven at 100 Hz or faster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Initial feedback gain on the tracking error. Can be changed later with
    /// `set_feedback_gain`.
    pub feedback_gain: f64,

    /// Endpoint speed in m/s that a Cartesian trajectory may not exceed. Longer times
    /// are chosen for targets that are too far away.
    pub max_linear_speed: f64,

    /// Endpoint angular speed in rad/s that a Cartesian trajectory may not exceed.
    pub max_angular_speed: f64,

    /// Singular values at or below this are not inverted.
    pub singular_value_threshold: f64,

    /// Weight of the manipulability gradient in the null space of redundant robots.
    pub manipulability_scalar: f64,

    /// Distance inside the position limits where joint targets on or past a limit are moved.
    /// Must stay below half the range of every joint; a target that would need a wider
    /// margin is refused when it is set.
    pub joint_limit_margin: f64,

    /// Shortest duration of a joint trajectory, in seconds.
    pub min_trajectory_time: f64,

    /// Fraction of the velocity limit the fastest joint is scaled down to.
    pub velocity_safety_factor: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            feedback_gain: 1.0,
            max_linear_speed: 1.0,
            max_angular_speed: 10.5,
            singular_value_threshold: SINGULAR_VALUE_THRESHOLD,
            manipulability_scalar: 0.5,
            joint_limit_margin: 0.01,
            min_trajectory_time: 1.0,
            velocity_safety_factor: VELOCITY_SAFETY_FACTOR,
        }
    }
}

impl ControllerConfig {
    /// Checks that all values are finite and in range. The feedback gain may be zero
    /// (pure feedforward), everything else must be positive.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(ParameterError::InvalidValue { field, reason: format!("{} is not finite", value) });
            }
        }
        if self.feedback_gain < 0.0 {
            return Err(ParameterError::InvalidValue {
                field: "feedback_gain",
                reason: format!("{} is negative", self.feedback_gain),
            });
        }
        for (field, value) in self.fields().into_iter().skip(1) {
            if value <= 0.0 {
                return Err(ParameterError::InvalidValue { field, reason: format!("{} is not positive", value) });
            }
        }
        if self.velocity_safety_factor > 1.0 {
            return Err(ParameterError::InvalidValue {
                field: "velocity_safety_factor",
                reason: format!("{} is above 1", self.velocity_safety_factor),
            });
        }
        Ok(())
    }

    /// Names and values in declaration order, feedback gain first.
    pub(crate) fn fields(&self) -> [(&'static str, f64); 8] {
        [
            ("feedback_gain", self.feedback_gain),
            ("max_linear_speed", self.max_linear_speed),
            ("max_angular_speed", self.max_angular_speed),
            ("singular_value_threshold", self.singular_value_threshold),
            ("manipulability_scalar", self.manipulability_scalar),
            ("joint_limit_margin", self.joint_limit_margin),
            ("min_trajectory_time", self.min_trajectory_time),
            ("velocity_safety_factor", self.velocity_safety_factor),
        ]
    }

    /// Convert to string yaml representation (quick viewing, etc).
    pub fn to_yaml(&self) -> String {
        let mut yaml = String::from("rmrc_controller:\n");
        for (field, value) in self.fields() {
            yaml.push_str(&format!("  {}: {:?}\n", field, value));
        }
        yaml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_angular_speed, 10.5);
        assert_eq!(config.singular_value_threshold, 1e-6);
        assert_eq!(config.velocity_safety_factor, 0.99);
    }

    #[test]
    fn test_zero_gain_is_valid() {
        let config = ControllerConfig { feedback_gain: 0.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let negative_gain = ControllerConfig { feedback_gain: -1.0, ..Default::default() };
        assert!(matches!(negative_gain.validate(),
                         Err(ParameterError::InvalidValue { field: "feedback_gain", .. })));

        let zero_speed = ControllerConfig { max_linear_speed: 0.0, ..Default::default() };
        assert!(matches!(zero_speed.validate(),
                         Err(ParameterError::InvalidValue { field: "max_linear_speed", .. })));

        let nan = ControllerConfig { joint_limit_margin: f64::NAN, ..Default::default() };
        assert!(nan.validate().is_err());

        let factor = ControllerConfig { velocity_safety_factor: 1.5, ..Default::default() };
        assert!(matches!(factor.validate(),
                         Err(ParameterError::InvalidValue { field: "velocity_safety_factor", .. })));
    }

    #[test]
    fn test_to_yaml_lists_all_fields() {
        let yaml = ControllerConfig::default().to_yaml();
        assert!(yaml.starts_with("rmrc_controller:\n"));
        assert!(yaml.contains("  max_angular_speed: 10.5\n"));
        assert!(yaml.contains("  feedback_gain: 1.0\n"));
        assert_eq!(yaml.lines().count(), 9);
    }
}

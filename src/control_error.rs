//! Errors reported by the controller setters and the checked numerical routines.
//!
//! None of these are raised from inside a control tick: the control functions
//! degrade to a zero (or scaled back) command and report through `tracing` instead.

use std::error::Error;
use std::fmt;

/// Reasons why an input to the controller or to a checked numerical routine was refused.
/// When a setter returns one of these, the previous configuration stays in place.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    /// A vector or matrix does not have as many elements as the robot has joints.
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    /// A weighting matrix must be square.
    NonSquareMatrix { rows: usize, cols: usize },
    /// Columns of the matrix to invert do not match the rows of the weighting matrix.
    IncompatibleShapes { columns: usize, weighting_rows: usize },
    NegativeGain(f64),
    NonPositiveTime(f64),
    NonPositiveScalar(f64),
    /// Lower limit must be below upper limit, velocity limit must be non-negative, all finite.
    InvalidJointLimits { lower: f64, upper: f64, velocity: f64 },
    JointIndexOutOfRange { index: usize, count: usize },
    /// The joint would have to move but its velocity limit is zero.
    ImmobileJoint { joint: usize },
    /// Waypoint arrival times are missing, not positive or not strictly increasing.
    WaypointTimes(String),
    AsymmetricGainFormat,
    EmptyTrajectory,
    /// A target contains NaN or infinite values.
    NonFiniteTarget { context: &'static str },
    /// Moving a target inside by the margin would overshoot the other limit.
    MarginExceedsRange { joint: usize, margin: f64, range: f64 },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ControlError::DimensionMismatch { context, expected, found } =>
                write!(f, "{}: expected {} elements, found {}", context, expected, found),
            ControlError::NonSquareMatrix { rows, cols } =>
                write!(f, "Weighting matrix is {}x{}, but it must be square", rows, cols),
            ControlError::IncompatibleShapes { columns, weighting_rows } =>
                write!(f, "Matrix has {} columns and weighting matrix has {} rows, \
                           but they must be the same", columns, weighting_rows),
            ControlError::NegativeGain(gain) =>
                write!(f, "Gain cannot be negative (got {})", gain),
            ControlError::NonPositiveTime(time) =>
                write!(f, "Time must be greater than zero (got {})", time),
            ControlError::NonPositiveScalar(scalar) =>
                write!(f, "Scalar must be positive (got {})", scalar),
            ControlError::InvalidJointLimits { lower, upper, velocity } =>
                write!(f, "Invalid joint limits: position [{}, {}], velocity {}", lower, upper, velocity),
            ControlError::JointIndexOutOfRange { index, count } =>
                write!(f, "Joint index {} is out of range, the robot has {} joints", index, count),
            ControlError::ImmobileJoint { joint } =>
                write!(f, "Joint {} must move but its velocity limit is zero", joint),
            ControlError::WaypointTimes(ref msg) =>
                write!(f, "Invalid waypoint times: {}", msg),
            ControlError::AsymmetricGainFormat =>
                write!(f, "Gain format must be a symmetric 6x6 matrix with positive diagonal"),
            ControlError::EmptyTrajectory =>
                write!(f, "At least one waypoint is required"),
            ControlError::NonFiniteTarget { context } =>
                write!(f, "{} contains non-finite values", context),
            ControlError::MarginExceedsRange { joint, margin, range } =>
                write!(f, "Joint limit margin {} is too large for joint {} with range {}", margin, joint, range),
        }
    }
}

impl Error for ControlError {}

/// Checks that `found` matches `expected`, naming the offending input in the error.
pub(crate) fn check_length(context: &'static str, expected: usize, found: usize) -> Result<(), ControlError> {
    if expected != found {
        return Err(ControlError::DimensionMismatch { context, expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length() {
        assert!(check_length("target", 3, 3).is_ok());
        assert_eq!(
            check_length("target", 3, 2),
            Err(ControlError::DimensionMismatch { context: "target", expected: 3, found: 2 })
        );
    }

    #[test]
    fn test_display_mentions_values() {
        let text = ControlError::NonSquareMatrix { rows: 2, cols: 3 }.to_string();
        assert!(text.contains("2x3"));
        let text = ControlError::JointIndexOutOfRange { index: 9, count: 7 }.to_string();
        assert!(text.contains('9') && text.contains('7'));
        let text = ControlError::NonFiniteTarget { context: "Joint target" }.to_string();
        assert!(text.starts_with("Joint target"));
    }
}

use crate::control_error::ControlError;

/// Position range and symmetric velocity bound of a single joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    /// Lowest reachable position, always below `upper`
    pub lower: f64,

    /// Highest reachable position
    pub upper: f64,

    /// Velocity magnitude bound, the joint may move within [-velocity, velocity]
    pub velocity: f64,
}

impl JointLimits {
    pub fn new(lower: f64, upper: f64, velocity: f64) -> Result<Self, ControlError> {
        let finite = lower.is_finite() && upper.is_finite() && velocity.is_finite();
        if !finite || lower >= upper || velocity < 0.0 {
            return Err(ControlError::InvalidJointLimits { lower, upper, velocity });
        }
        Ok(JointLimits { lower, upper, velocity })
    }

    /// Same position range on both sides of zero.
    pub fn symmetric(position: f64, velocity: f64) -> Result<Self, ControlError> {
        Self::new(-position, position, velocity)
    }

    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn compliant(&self, position: f64) -> bool {
        position > self.lower && position < self.upper
    }

    /// Pulls a target that touches or crosses a limit back inside by `margin`.
    /// Returns the corrected value and whether a correction was made.
    pub fn clamp_target(&self, target: f64, margin: f64) -> (f64, bool) {
        if target <= self.lower {
            (self.lower + margin, true)
        } else if target >= self.upper {
            (self.upper - margin, true)
        } else {
            (target, false)
        }
    }
}

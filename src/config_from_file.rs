//! Supports reading the controller configuration from YAML file (optional)

use std::path::Path;
use yaml_rust2::{Yaml, YamlLoader};

use crate::config::ControllerConfig;
use crate::parameter_error::ParameterError;

const ROOT_KEY: &str = "rmrc_controller";

impl ControllerConfig {
    /// Read the controller configuration from YAML file. YAML file like this is supported:
    /// ```yaml
    /// rmrc_controller:
    ///   feedback_gain: 2.0
    ///   max_linear_speed: 0.5
    ///   max_angular_speed: 3
    /// ```
    /// Keys that are not present keep their default values, unknown keys are ignored.
    /// The result is validated.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [`ControllerConfig::from_yaml_file`] for YAML already in memory.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let docs = YamlLoader::load_from_str(contents)
            .map_err(|e| ParameterError::ParseError(format!("{}", e)))?;
        let doc = docs.first()
            .ok_or_else(|| ParameterError::ParseError("Empty YAML document".to_string()))?;

        let section = match &doc[ROOT_KEY] {
            Yaml::Hash(section) => section,
            Yaml::BadValue => return Err(ParameterError::ParseError(
                format!("Missing '{}' section", ROOT_KEY))),
            _ => return Err(ParameterError::ParseError(
                format!("'{}' must be a mapping", ROOT_KEY))),
        };

        let mut config = ControllerConfig::default();
        for (key, value) in section {
            let Some(name) = key.as_str() else {
                continue;
            };
            let Some(slot) = config.field_mut(name) else {
                continue; // Not ours
            };
            *slot = as_real(value).ok_or_else(|| ParameterError::ParseError(
                format!("'{}' must be a number, found {:?}", name, value)))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "feedback_gain" => Some(&mut self.feedback_gain),
            "max_linear_speed" => Some(&mut self.max_linear_speed),
            "max_angular_speed" => Some(&mut self.max_angular_speed),
            "singular_value_threshold" => Some(&mut self.singular_value_threshold),
            "manipulability_scalar" => Some(&mut self.manipulability_scalar),
            "joint_limit_margin" => Some(&mut self.joint_limit_margin),
            "min_trajectory_time" => Some(&mut self.min_trajectory_time),
            "velocity_safety_factor" => Some(&mut self.velocity_safety_factor),
            _ => None,
        }
    }
}

/// Real or integer YAML value as f64
fn as_real(value: &Yaml) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|i| i as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = ControllerConfig::from_yaml_str("rmrc_controller:\n  feedback_gain: 2.5\n").unwrap();
        assert_eq!(config.feedback_gain, 2.5);
        assert_eq!(config.max_linear_speed, ControllerConfig::default().max_linear_speed);
    }

    #[test]
    fn test_integers_are_accepted() {
        let config = ControllerConfig::from_yaml_str("rmrc_controller:\n  max_angular_speed: 3\n").unwrap();
        assert_eq!(config.max_angular_speed, 3.0);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = ControllerConfig::from_yaml_str("rmrc_controller:\n  colour: blue\n").unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let result = ControllerConfig::from_yaml_str("rmrc_controller:\n  feedback_gain: fast\n");
        assert!(matches!(result, Err(ParameterError::ParseError(_))));
    }

    #[test]
    fn test_missing_section() {
        let result = ControllerConfig::from_yaml_str("something_else:\n  a: 1\n");
        assert!(matches!(result, Err(ParameterError::ParseError(_))));
    }

    #[test]
    fn test_out_of_range_is_invalid_value() {
        let result = ControllerConfig::from_yaml_str("rmrc_controller:\n  min_trajectory_time: -2.0\n");
        assert!(matches!(result, Err(ParameterError::InvalidValue { field: "min_trajectory_time", .. })));
    }

    #[test]
    fn test_to_yaml_reads_back() {
        let config = ControllerConfig {
            feedback_gain: 3.0,
            singular_value_threshold: 1e-5,
            ..Default::default()
        };
        assert_eq!(ControllerConfig::from_yaml_str(&config.to_yaml()).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ControllerConfig::from_yaml_file("src/tests/data/no_such_file.yaml");
        assert!(matches!(result, Err(ParameterError::IoError(_))));
    }
}

//! Config validation.
//!
//! Field-level rules come from the `validator` derives on `HubConfig`.
//! Cross-field rules:
//! - sensor names resolve to a known sensor
//! - each sensor is listed at most once
//! - only batchable sensors carry a non-zero batch timeout

use std::collections::{BTreeMap, HashSet};

use contracts::{HubConfig, HubError, SensorId};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a parsed config, returning the first violation found
pub fn validate(config: &HubConfig) -> Result<(), HubError> {
    validate_fields(config)?;
    validate_sensor_names(config)?;
    validate_batch_timeouts(config)?;
    Ok(())
}

fn validate_fields(config: &HubConfig) -> Result<(), HubError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, String::new())
            .unwrap_or_else(|| (String::from("<root>"), errors.to_string()));
        HubError::config_validation(field, message)
    })
}

/// First violation in key order, as `(field.path[0].leaf, message)`
fn first_violation(errors: &ValidationErrors, prefix: String) -> Option<(String, String)> {
    let sorted: BTreeMap<_, _> = errors.errors().iter().collect();
    for (name, kind) in sorted {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", e.code));
                (path, message)
            }),
            ValidationErrorsKind::Struct(inner) => first_violation(inner, path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_violation(inner, format!("{path}[{idx}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn validate_sensor_names(config: &HubConfig) -> Result<(), HubError> {
    let mut seen = HashSet::new();
    for (idx, setting) in config.sensors.iter().enumerate() {
        let id: SensorId = setting
            .name
            .parse()
            .map_err(|e: String| HubError::config_validation(format!("sensors[{idx}].name"), e))?;
        if !seen.insert(id) {
            return Err(HubError::config_validation(
                format!("sensors[{idx}].name"),
                format!("duplicate sensor '{}'", setting.name),
            ));
        }
    }
    Ok(())
}

fn validate_batch_timeouts(config: &HubConfig) -> Result<(), HubError> {
    for (idx, setting) in config.sensors.iter().enumerate() {
        let Ok(id) = setting.name.parse::<SensorId>() else {
            continue;
        };
        if setting.timeout_ms.unwrap_or(0) > 0 && !id.class().is_batchable() {
            return Err(HubError::config_validation(
                format!("sensors[{idx}].timeout_ms"),
                format!("sensor '{}' cannot batch with a timeout", setting.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorSetting;

    fn setting(name: &str) -> SensorSetting {
        SensorSetting {
            name: name.to_string(),
            period_ms: Some(20),
            timeout_ms: None,
        }
    }

    fn field_of(err: HubError) -> String {
        match err {
            HubError::ConfigValidation { field, .. } => field,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = HubConfig::default();
        config.sensors = vec![setting("accelerometer"), setting("step_counter")];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_sensor_name() {
        let mut config = HubConfig::default();
        config.sensors = vec![setting("gyroscope"), setting("barometer")];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("barometer"), "got: {err}");
        assert_eq!(field_of(err), "sensors[1].name");
    }

    #[test]
    fn test_duplicate_sensor() {
        let mut config = HubConfig::default();
        config.sensors = vec![setting("light"), setting("light")];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got: {err}");
    }

    #[test]
    fn test_timeout_on_non_batchable() {
        let mut config = HubConfig::default();
        let mut light = setting("light");
        light.timeout_ms = Some(100);
        config.sensors = vec![light];
        assert_eq!(field_of(validate(&config).unwrap_err()), "sensors[0].timeout_ms");

        // zero timeout is allowed
        config.sensors[0].timeout_ms = Some(0);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_field_range_names_path() {
        let mut config = HubConfig::default();
        config.device.buffer_length = 0;
        assert_eq!(field_of(validate(&config).unwrap_err()), "device.buffer_length");
    }

    #[test]
    fn test_nested_list_path() {
        let mut config = HubConfig::default();
        let mut bad = setting("gravity");
        bad.period_ms = Some(0);
        config.sensors = vec![setting("accelerometer"), bad];
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "sensors[1].period_ms"
        );
    }

    #[test]
    fn test_zero_drain_capacity() {
        let mut config = HubConfig::default();
        config.engine.drain_capacity = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "engine.drain_capacity"
        );
    }
}

//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, HubConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    device_name: String,
    buffer_length: u32,
    timestamp_policy: String,
    drain_capacity: usize,
    startup_sensors: Vec<String>,
    restore_calibration: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &HubConfig) -> ConfigSummary {
    ConfigSummary {
        device_name: config.device.device_name.clone(),
        buffer_length: config.device.buffer_length,
        timestamp_policy: format!("{:?}", config.engine.timestamp_policy),
        drain_capacity: config.engine.drain_capacity,
        startup_sensors: ConfigLoader::startup_sensors(config)
            .into_iter()
            .map(|(id, _)| id.name().to_string())
            .collect(),
        restore_calibration: config.calibration.restore_on_start,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &HubConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sensors.is_empty() {
        warnings.push("No start-up sensors configured - the hub will stay silent".to_string());
    }

    let calibration = &config.calibration;
    if calibration.restore_on_start
        && calibration.accelerometer_path.is_none()
        && calibration.gyroscope_path.is_none()
        && calibration.magnetometer_path.is_none()
    {
        warnings.push("calibration.restore_on_start is set but no calibration paths are configured".to_string());
    }

    for (id, setting) in ConfigLoader::startup_sensors(config) {
        if id.is_one_shot() && setting.period_ms.is_some() {
            warnings.push(format!(
                "Sensor '{}' is one-shot - period_ms has no effect",
                id.name()
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Device: {}", summary.device_name);
            println!("  Buffer length: {}", summary.buffer_length);
            println!("  Timestamp policy: {}", summary.timestamp_policy);
            println!("  Drain capacity: {}", summary.drain_capacity);
            println!("  Start-up sensors: {}", summary.startup_sensors.join(", "));
            println!("  Restore calibration: {}", summary.restore_calibration);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}

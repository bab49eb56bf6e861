//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{SensorClass, SensorId};
use serde::Serialize;

use crate::cli::InfoArgs;

/// Sensor table row for JSON output
#[derive(Serialize)]
struct SensorInfo {
    name: &'static str,
    handle: i32,
    wire_id: u8,
    class: SensorClass,
    one_shot: bool,
    batchable: bool,
}

impl From<SensorId> for SensorInfo {
    fn from(id: SensorId) -> Self {
        Self {
            name: id.name(),
            handle: id.handle().0,
            wire_id: id.wire_id(),
            class: id.class(),
            one_shot: id.is_one_shot(),
            batchable: id.class().is_batchable(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let sensors: Vec<SensorInfo> = SensorId::ALL.into_iter().map(SensorInfo::from).collect();

    if args.json {
        let json =
            serde_json::to_string_pretty(&sensors).context("Failed to serialize sensor table")?;
        println!("{json}");
    } else {
        print_sensor_table(&sensors);
    }
    Ok(())
}

fn print_sensor_table(sensors: &[SensorInfo]) {
    println!(
        "{:<32} {:>6} {:>7}  {:<20} {:<8} {:<9}",
        "SENSOR", "HANDLE", "WIRE", "CLASS", "ONESHOT", "BATCHABLE"
    );
    for s in sensors {
        println!(
            "{:<32} {:>6} {:>#7x}  {:<20} {:<8} {:<9}",
            s.name,
            s.handle,
            s.wire_id,
            format!("{:?}", s.class),
            yes_no(s.one_shot),
            yes_no(s.batchable),
        );
    }
    println!("\n{} sensors", sensors.len());
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_rows() {
        let rows: Vec<SensorInfo> = SensorId::ALL.into_iter().map(SensorInfo::from).collect();
        assert_eq!(rows.len(), contracts::SENSOR_COUNT);

        let json = serde_json::to_value(SensorInfo::from(SensorId::WakeGesture)).unwrap();
        assert_eq!(json["name"], "wake_gesture");
        assert_eq!(json["class"], "wake_gesture");
        assert_eq!(json["one_shot"], true);
    }
}

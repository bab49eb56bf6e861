//! Calibration data contracts
//!
//! Calibration blobs are fixed-size integer arrays, stored as one line of
//! whitespace-separated decimal integers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{HubError, Result};

/// Calibrated sensor family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

impl CalibrationKind {
    /// Number of integers in one blob
    pub const fn blob_len(self) -> usize {
        match self {
            CalibrationKind::Accelerometer | CalibrationKind::Gyroscope => 3,
            CalibrationKind::Magnetometer => 26,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CalibrationKind::Accelerometer => "accelerometer",
            CalibrationKind::Gyroscope => "gyroscope",
            CalibrationKind::Magnetometer => "magnetometer",
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One calibration blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationData {
    kind: CalibrationKind,
    values: Vec<i32>,
}

impl CalibrationData {
    /// Build from values, checking the length
    pub fn new(kind: CalibrationKind, values: Vec<i32>) -> Result<Self> {
        if values.len() != kind.blob_len() {
            return Err(HubError::calibration(
                kind,
                format!("expected {} values, got {}", kind.blob_len(), values.len()),
            ));
        }
        Ok(Self { kind, values })
    }

    /// Parse whitespace-separated integers
    ///
    /// Trailing values beyond the blob size are ignored; too few is an error.
    pub fn parse(kind: CalibrationKind, text: &str) -> Result<Self> {
        let values = text
            .split_whitespace()
            .take(kind.blob_len())
            .map(|token| {
                token.parse::<i32>().map_err(|e| {
                    HubError::calibration(kind, format!("invalid value '{token}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(kind, values)
    }

    /// Text form, newline-terminated
    pub fn to_line(&self) -> String {
        let mut line = self
            .values
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        line.push('\n');
        line
    }

    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// All values zero (an uncalibrated blob)
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }
}

/// Load/save calibration blobs
///
/// A missing blob is `HubError::CalibrationNotFound`.
pub trait CalibrationStore: Send + Sync {
    fn load(&self, kind: CalibrationKind) -> Result<CalibrationData>;

    fn save(&self, data: &CalibrationData) -> Result<()>;
}

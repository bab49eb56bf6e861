//! Layered error definitions
//!
//! Categorized by source: control / record / transport / calibration / config

use thiserror::Error;

use crate::{CalibrationKind, SensorHandle};

/// Unified error type
#[derive(Debug, Error)]
pub enum HubError {
    // ===== Control Errors =====
    /// Unknown external handle presented to a control operation
    #[error("invalid sensor handle: {handle}")]
    InvalidHandle { handle: SensorHandle },

    /// Operation the sensor class structurally cannot support
    #[error("unsupported operation '{operation}' for sensor '{sensor}': {message}")]
    Unsupported {
        sensor: String,
        operation: &'static str,
        message: String,
    },

    // ===== Record Errors =====
    /// Short or corrupt record window
    #[error("malformed record: expected {expected} bytes, got {actual}")]
    MalformedRecord { expected: usize, actual: usize },

    // ===== Transport Errors =====
    /// Channel read/write failure
    #[error("transport failure during {operation}: {message}")]
    TransportFailure {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ===== Calibration Errors =====
    /// No stored calibration for this kind
    #[error("calibration data not found for {kind:?}")]
    CalibrationNotFound { kind: CalibrationKind },

    /// Stored calibration is unreadable
    #[error("calibration error for {kind:?}: {message}")]
    Calibration {
        kind: CalibrationKind,
        message: String,
    },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HubError {
    /// Create transport failure without an underlying IO error
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Create transport failure wrapping an IO error
    pub fn transport_io(operation: &'static str, source: std::io::Error) -> Self {
        Self::TransportFailure {
            operation,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create unsupported-operation error
    pub fn unsupported(
        sensor: impl Into<String>,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            sensor: sensor.into(),
            operation,
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create calibration error
    pub fn calibration(kind: CalibrationKind, message: impl Into<String>) -> Self {
        Self::Calibration {
            kind,
            message: message.into(),
        }
    }

    /// Whether the error came from the underlying channel
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}

/// Contracts Result alias
pub type Result<T> = std::result::Result<T, HubError>;

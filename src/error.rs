//! Error types for meshcam

use thiserror::Error;

/// Main error type for meshcam
#[derive(Error, Debug)]
pub enum MeshcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Triangulation topology errors
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Failed to read topology asset: {0}")]
    ReadFile(String),

    #[error("Failed to parse topology asset: {0}")]
    Parse(String),

    #[error("Topology table contains no triangles")]
    Empty,

    #[error("A topology needs at least 3 keypoints, got {0}")]
    TooFewKeypoints(usize),
}

/// Landmark detector errors
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to launch landmark helper: {0}")]
    Spawn(String),

    #[error("Landmark helper stdio error: {0}")]
    Stdio(String),

    #[error("Landmark helper wire error: {0}")]
    Wire(String),

    #[error("Landmark helper parse error: {0}")]
    Parse(String),
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Result type alias for meshcam operations
pub type Result<T> = std::result::Result<T, MeshcamError>;

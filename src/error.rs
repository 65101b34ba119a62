use thiserror::Error;

/// Errors raised while setting up a run.
///
/// The daily step itself never fails: numeric faults are clamped and
/// recorded as diagnostics instead.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("land-use code {code} has no row in the crop table")]
    MissingCropCode { code: u32 },
    #[error("farmer/crop code {code} is scheduled for application but has no dose")]
    MissingDose { code: u32 },
    #[error("crop table row {row} is malformed: {reason}")]
    MalformedTable { row: u32, reason: String },
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: String,
    },
    #[error("raster {name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("drainage graph contains a cycle ({cells} cells never reach a sink)")]
    DrainageCycle { cells: usize },
    #[error("cell {cell} is a drainage sink that is not an outlet, or an outlet that is not a sink")]
    DisconnectedOutlet { cell: usize },
    #[error("cell {cell} has invalid drainage direction code {code}")]
    InvalidDrainageDirection { cell: usize, code: u32 },
    #[error("forcing series {name} has {len} days, the run needs {needed}")]
    ForcingTooShort {
        name: String,
        len: usize,
        needed: usize,
    },
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModelError {
    pub(crate) fn invalid(name: &str, value: f64, reason: &str) -> Self {
        ModelError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        }
    }
}

/// Convenience type for `Result<T, ModelError>`.
pub type ModelResult<T> = Result<T, ModelError>;

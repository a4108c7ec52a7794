use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CnAlignError>;

#[derive(Debug, Error)]
pub enum CnAlignError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid table header: {0}")]
    TableHeader(String),

    #[error("Invalid table row {row}: expected {expected} columns, got {got}")]
    TableRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Invalid value for column '{column}' at row {row}: {value}")]
    ValueParse {
        row: usize,
        column: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Value out of range for column '{column}' at row {row}: {value}")]
    ValueRange {
        row: usize,
        column: &'static str,
        value: f64,
    },

    #[error("Duplicate observation for sample '{sample}' at segment '{segment}'")]
    DuplicateObservation { sample: String, segment: String },

    #[error("Sample '{sample}' does not cover the shared segment set: {detail}")]
    NonRectangular { sample: String, detail: String },

    #[error("Segment '{segment}' has inconsistent '{column}' across samples")]
    InconsistentSegment {
        segment: String,
        column: &'static str,
    },

    #[error("Observation table is empty")]
    EmptyTable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Solver license error ({path}): {reason}")]
    License { path: PathBuf, reason: String },

    #[error("Optimization solver error: {0}")]
    Solver(String),

    #[error("No solution: {0}")]
    NoSolution(String),

    #[error("Model construction error: {message}")]
    Model { message: String },

    #[error("Failed to write {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for CnAlignError {
    fn from(err: serde_json::Error) -> Self {
        CnAlignError::Io(std::io::Error::other(err))
    }
}

impl CnAlignError {
    /// Infeasible models are reported, not treated as crashes
    pub fn is_no_solution(&self) -> bool {
        matches!(self, CnAlignError::NoSolution(_))
    }
}

//! Error types for the IBIS core.
//!
//! This module provides a unified error type [`IbisError`] that covers
//! grammar errors while reading an IBIS file, lookups in the parsed model
//! graph, driver characterization and the circuit engine underneath it.

use thiserror::Error;

/// Result type alias using [`IbisError`].
pub type Result<T> = std::result::Result<T, IbisError>;

/// Unified error type for all IBIS core operations.
#[derive(Error, Debug)]
pub enum IbisError {
    // ============ Grammar Errors ============
    /// A line matches no rule at its position in the grammar
    #[error("Grammar error at line {line_number}: no rule matches '{line}'")]
    Grammar { line_number: usize, line: String },

    /// A mandatory numeric token could not be read
    #[error("Invalid number '{token}' at line {line_number}")]
    InvalidNumber { line_number: usize, token: String },

    /// Only the default comment character is understood
    #[error("Unsupported comment character '{comment_char}' at line {line_number}")]
    UnsupportedCommentChar {
        line_number: usize,
        comment_char: String,
    },

    /// A VI table was closed without any samples
    #[error("Empty [{table}] table in model '{model}'")]
    EmptyTable { model: String, table: String },

    // ============ Model Graph Errors ============
    /// A device, component, pin or model name is not in the graph
    #[error("Unknown {kind} '{name}'")]
    UnknownDevice { kind: &'static str, name: String },

    /// The model type cannot be turned into a receiver or driver
    #[error("Model '{model}' has unsupported type '{model_type}'")]
    UnsupportedModelType { model: String, model_type: String },

    /// A driving model has no K-tables to switch its pull networks
    #[error("Model '{model}' is a driver but has no K-tables")]
    Uncharacterized { model: String },

    /// Deriving K-tables failed
    #[error("Characterization of model '{model}' failed: {message}")]
    Characterization { model: String, message: String },

    // ============ Circuit Errors ============
    /// Node not found in circuit
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// Duplicate device name
    #[error("Duplicate device name '{name}'")]
    DuplicateComponent { name: String },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - circuit may have a short circuit or floating node")]
    SingularMatrix,

    /// Newton-Raphson iteration did not converge
    #[error("Newton-Raphson did not converge after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ I/O Errors ============
    /// Error reading an IBIS file
    #[error("Failed to read IBIS file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing results
    #[error("Output error: {message}")]
    OutputError { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl IbisError {
    /// Create a grammar error for a raw input line
    pub fn grammar(line_number: usize, line: impl Into<String>) -> Self {
        Self::Grammar {
            line_number,
            line: line.into(),
        }
    }

    /// Create an unknown device error
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownDevice {
            kind,
            name: name.into(),
        }
    }

    /// Create a characterization failure for a model
    pub fn characterization(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Characterization {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            iterations,
            residual,
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }
}

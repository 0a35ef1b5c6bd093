//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine behind K-table derivation and
//! pin simulations.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources to nodes
//! - D holds the companion resistance of inductors
//! - v is the vector of node voltages
//! - j is the vector of voltage source currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values
//!
//! A transient run first solves the operating point, then advances with
//! fixed trapezoidal steps. Table-driven and behavioral sources are solved
//! with Newton-Raphson at every time point.

mod mna;
mod newton;
mod simulator;

pub use mna::{stamp_linear_components, MnaMatrix, SolutionView};
pub use newton::NewtonRaphson;
pub use simulator::{Simulator, SimulatorConfig, Trace};

/// Default absolute convergence tolerance for Newton-Raphson iteration.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default convergence tolerance relative to each unknown.
pub const DEFAULT_RELTOL: f64 = 1e-6;

/// Default maximum Newton-Raphson iterations per time point.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default cap on time points in one transient run.
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;

/// Minimum conductance to prevent singular matrix.
pub const MIN_CONDUCTANCE: f64 = 1e-12;

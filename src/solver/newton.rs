//! Newton-Raphson iteration for nonlinear components.

use super::mna::{stamp_linear_components, MnaMatrix, SolutionView};
use super::{DEFAULT_MAX_ITERATIONS, DEFAULT_RELTOL, DEFAULT_TOLERANCE};
use crate::circuit::Circuit;
use crate::components::Component;
use crate::error::{IbisError, Result};

/// Newton-Raphson solver for nonlinear circuits.
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute convergence tolerance
    pub tolerance: f64,
    /// Convergence tolerance relative to the unknown's magnitude
    pub reltol: f64,
    /// Previous solution for convergence check
    x_prev: Vec<f64>,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new()
    }
}

impl NewtonRaphson {
    /// Create a new Newton-Raphson solver.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, DEFAULT_RELTOL)
    }

    pub fn with_config(max_iterations: usize, tolerance: f64, reltol: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            reltol,
            x_prev: Vec::new(),
        }
    }

    /// Solve the circuit at `time`. `dt` is the step just taken, or `None`
    /// for the operating point.
    ///
    /// Returns the number of iterations used.
    pub fn solve(
        &mut self,
        circuit: &mut Circuit,
        matrix: &mut MnaMatrix,
        time: f64,
        dt: Option<f64>,
    ) -> Result<usize> {
        let has_nonlinear = circuit.components.iter().any(|c| c.is_nonlinear());

        if !has_nonlinear {
            // Purely linear circuit - solve directly
            Self::assemble(circuit, matrix, time, dt);
            matrix.factor()?;
            matrix.solve()?;
            return Ok(1);
        }

        if self.x_prev.len() != matrix.size {
            self.x_prev = vec![0.0; matrix.size];
        }

        for iter in 0..self.max_iterations {
            // Use previous solution as the linearization point
            self.x_prev.copy_from_slice(&matrix.x);

            Self::update_behavioral(circuit, matrix, time, dt);
            Self::assemble(circuit, matrix, time, dt);
            Self::stamp_nonlinear_components(circuit, matrix, time);

            matrix.factor()?;
            matrix.solve()?;

            // The first solve is linearized at the previous time point
            if iter > 0 && self.converged(matrix) {
                return Ok(iter + 1);
            }
        }

        Err(IbisError::convergence_failure(
            self.max_iterations,
            self.residual(matrix),
        ))
    }

    fn assemble(circuit: &Circuit, matrix: &mut MnaMatrix, time: f64, dt: Option<f64>) {
        matrix.clear();
        stamp_linear_components(circuit, matrix, time, dt);
        matrix.stamp_gmin(circuit.num_nodes());
    }

    /// Re-evaluate behavioral sources from the present iterate.
    fn update_behavioral(circuit: &mut Circuit, matrix: &MnaMatrix, time: f64, dt: Option<f64>) {
        for index in 0..circuit.components.len() {
            let value = match &circuit.components[index] {
                Component::Behavioral(source) => source.voltage(&SolutionView {
                    circuit: &*circuit,
                    matrix,
                    time,
                    dt,
                }),
                _ => continue,
            };
            if let Component::Behavioral(source) = &mut circuit.components[index] {
                source.last_value = value;
            }
        }
    }

    /// Stamp linearized nonlinear components into the matrix.
    fn stamp_nonlinear_components(circuit: &Circuit, matrix: &mut MnaMatrix, time: f64) {
        for component in &circuit.components {
            match component {
                Component::Vi(vi) => {
                    let n1 = circuit.node_index(vi.nodes[0]);
                    let n2 = circuit.node_index(vi.nodes[1]);

                    // Branch voltage from previous iteration
                    let v_op = matrix.voltage(n1) - matrix.voltage(n2);
                    let (g, i_eq) = vi.linearize(v_op, time);

                    // Stamp as conductance + current source
                    matrix.stamp_conductance(n1, n2, g);
                    matrix.stamp_current_source(n1, n2, i_eq);
                }

                Component::Behavioral(b) => {
                    let n1 = circuit.node_index(b.nodes[0]);
                    let n2 = circuit.node_index(b.nodes[1]);
                    let br = circuit.branch_index(b.branch);
                    matrix.stamp_voltage_source(n1, n2, br, b.last_value);
                }

                _ => {} // Linear components already handled
            }
        }
    }

    fn converged(&self, matrix: &MnaMatrix) -> bool {
        matrix
            .x
            .iter()
            .zip(&self.x_prev)
            .all(|(x, prev)| (x - prev).abs() <= self.tolerance + self.reltol * x.abs())
    }

    /// Calculate the residual for error reporting.
    fn residual(&self, matrix: &MnaMatrix) -> f64 {
        matrix
            .x
            .iter()
            .zip(&self.x_prev)
            .map(|(x, prev)| (x - prev).abs())
            .fold(0.0, f64::max)
    }
}

//! MNA matrix assembly and solving.

use crate::circuit::{Circuit, NodeId};
use crate::components::{Component, Signals};
use crate::error::{IbisError, Result};

use super::MIN_CONDUCTANCE;

/// MNA matrix system Ax = z.
#[derive(Debug)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A (for efficient solving)
    pub lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pub pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a new MNA matrix for the given circuit.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and vectors to zero.
    pub fn clear(&mut self) {
        self.a.fill(0.0);
        self.z.fill(0.0);
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a voltage source between two nodes with branch current at index br.
    /// V[n+] - V[n-] = E
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: f64,
    ) {
        // KVL equation: V[n+] - V[n-] = E
        if let Some(i) = n_pos {
            self.add(br, i, 1.0);
            self.add(i, br, 1.0);
        }
        if let Some(j) = n_neg {
            self.add(br, j, -1.0);
            self.add(j, br, -1.0);
        }
        self.z[br] = voltage;
    }

    /// Stamp a current source between two nodes.
    /// Current flows from n+ to n-.
    pub fn stamp_current_source(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, current: f64) {
        // Current enters n- and leaves n+
        if let Some(i) = n_pos {
            self.add_source(i, -current);
        }
        if let Some(j) = n_neg {
            self.add_source(j, current);
        }
    }

    /// Tie every node to ground through the minimum conductance.
    pub fn stamp_gmin(&mut self, num_nodes: usize) {
        for i in 0..num_nodes.saturating_sub(1) {
            self.add(i, i, MIN_CONDUCTANCE);
        }
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < 1e-15 {
                return Err(IbisError::SingularMatrix);
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            let diag = self.lu[i * n + i];
            if diag.abs() < 1e-15 {
                return Err(IbisError::SingularMatrix);
            }
            self.x[i] /= diag;
        }

        Ok(())
    }

    /// Get the voltage at a node.
    pub fn voltage(&self, node: Option<usize>) -> f64 {
        match node {
            Some(i) => self.x[i],
            None => 0.0, // Ground
        }
    }

    /// Get the voltage at a NodeId (handling ground).
    pub fn node_voltage(&self, circuit: &Circuit, node: NodeId) -> f64 {
        self.voltage(circuit.node_index(node))
    }

    /// Current from n+ to n- through `component` for the present solution.
    pub fn device_current(&self, circuit: &Circuit, component: &Component, time: f64, dt: Option<f64>) -> f64 {
        let [n1, n2] = component.nodes();
        let v = self.node_voltage(circuit, n1) - self.node_voltage(circuit, n2);
        match component {
            Component::Resistor(r) => v * r.conductance(),
            Component::Capacitor(c) => c.current(v, dt),
            Component::CurrentSource(i) => i.current(time),
            Component::Vi(vi) => vi.current(v, time),
            Component::Inductor(_) | Component::VoltageSource(_) | Component::Behavioral(_) => {
                component
                    .branch()
                    .map_or(0.0, |branch| self.x[circuit.branch_index(branch)])
            }
        }
    }
}

/// Signal values of a solution, as read by behavioral expressions.
pub struct SolutionView<'s> {
    pub circuit: &'s Circuit,
    pub matrix: &'s MnaMatrix,
    pub time: f64,
    pub dt: Option<f64>,
}

impl Signals for SolutionView<'_> {
    fn voltage(&self, node: &str) -> Option<f64> {
        let node = self.circuit.find_node(node)?;
        Some(self.matrix.node_voltage(self.circuit, node))
    }

    fn current(&self, device: &str) -> Option<f64> {
        let component = self.circuit.find_component(device)?;
        Some(
            self.matrix
                .device_current(self.circuit, component, self.time, self.dt),
        )
    }
}

/// Stamp all linear components into the MNA matrix.
///
/// With `dt` unset the operating point is stamped: capacitors open and
/// inductors shorted.
pub fn stamp_linear_components(circuit: &Circuit, matrix: &mut MnaMatrix, time: f64, dt: Option<f64>) {
    for component in &circuit.components {
        match component {
            Component::Resistor(r) => {
                let n1 = circuit.node_index(r.nodes[0]);
                let n2 = circuit.node_index(r.nodes[1]);
                matrix.stamp_conductance(n1, n2, r.conductance());
            }

            Component::Capacitor(c) => {
                let Some(dt) = dt else { continue };
                let n1 = circuit.node_index(c.nodes[0]);
                let n2 = circuit.node_index(c.nodes[1]);
                matrix.stamp_conductance(n1, n2, c.conductance(dt));
                // Companion current source
                matrix.stamp_current_source(n1, n2, c.current_source(dt));
            }

            Component::Inductor(l) => {
                let n1 = circuit.node_index(l.nodes[0]);
                let n2 = circuit.node_index(l.nodes[1]);
                let br = circuit.branch_index(l.branch);
                match dt {
                    Some(dt) => {
                        // Stamp as voltage source with series resistance
                        matrix.stamp_voltage_source(n1, n2, br, l.voltage_source(dt));
                        matrix.add(br, br, -l.resistance(dt));
                    }
                    None => matrix.stamp_voltage_source(n1, n2, br, 0.0),
                }
            }

            Component::VoltageSource(v) => {
                let n1 = circuit.node_index(v.nodes[0]);
                let n2 = circuit.node_index(v.nodes[1]);
                let br = circuit.branch_index(v.branch);
                matrix.stamp_voltage_source(n1, n2, br, v.voltage(time));
            }

            Component::CurrentSource(i) => {
                let n1 = circuit.node_index(i.nodes[0]);
                let n2 = circuit.node_index(i.nodes[1]);
                matrix.stamp_current_source(n1, n2, i.current(time));
            }

            // Nonlinear components handled separately
            Component::Vi(_) | Component::Behavioral(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lu_solves_small_system() {
        // [2 1; 1 3] x = [3; 5]
        let mut m = MnaMatrix::new(2);
        m.add(0, 0, 2.0);
        m.add(0, 1, 1.0);
        m.add(1, 0, 1.0);
        m.add(1, 1, 3.0);
        m.z.copy_from_slice(&[3.0, 5.0]);
        m.factor().unwrap();
        m.solve().unwrap();
        assert!((m.x[0] - 0.8).abs() < 1e-12);
        assert!((m.x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let mut m = MnaMatrix::new(2);
        m.add(0, 0, 1.0);
        m.add(0, 1, 1.0);
        m.add(1, 0, 1.0);
        m.add(1, 1, 1.0);
        assert!(matches!(m.factor(), Err(IbisError::SingularMatrix)));
    }

    #[test]
    fn test_divider_operating_point() {
        let mut circuit = Circuit::new("divider");
        circuit.add_voltage_source("V1", "in", "0", 2.0).unwrap();
        circuit.add_resistor("R1", "in", "out", 100.0).unwrap();
        circuit.add_resistor("R2", "out", "0", 300.0).unwrap();
        circuit.add_capacitor("C1", "out", "0", 1e-9).unwrap();

        let mut m = MnaMatrix::new(circuit.matrix_size());
        stamp_linear_components(&circuit, &mut m, 0.0, None);
        m.stamp_gmin(circuit.num_nodes());
        m.factor().unwrap();
        m.solve().unwrap();

        let out = circuit.find_node("out").unwrap();
        assert!((m.node_voltage(&circuit, out) - 1.5).abs() < 1e-6);
        // Source current runs from + through the source to -
        let v1 = circuit.find_component("v1").unwrap();
        assert!((m.device_current(&circuit, v1, 0.0, None) + 5e-3).abs() < 1e-9);
    }
}

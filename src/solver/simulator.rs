//! Main simulator interface.

use std::collections::HashMap;

use crate::circuit::{validate_circuit, Circuit, NodeId};
use crate::components::Component;
use crate::error::{IbisError, Result};

use super::mna::MnaMatrix;
use super::{
    NewtonRaphson, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_STEPS, DEFAULT_RELTOL, DEFAULT_TOLERANCE,
};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Maximum Newton-Raphson iterations per time point.
    pub max_iterations: usize,
    /// Absolute convergence tolerance for Newton-Raphson.
    pub tolerance: f64,
    /// Relative convergence tolerance for Newton-Raphson.
    pub reltol: f64,
    /// Most time steps a transient run may take.
    pub max_steps: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            reltol: DEFAULT_RELTOL,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the absolute convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the relative convergence tolerance.
    pub fn with_reltol(mut self, reltol: f64) -> Self {
        self.reltol = reltol;
        self
    }

    /// Set the most time steps a transient run may take.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Recorded results of a transient run.
///
/// Sample 0 is the operating point at t = 0.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub times: Vec<f64>,
    /// Per node (ground excluded), one value per time point
    voltages: Vec<Vec<f64>>,
    /// Per device, one value per time point
    currents: Vec<Vec<f64>>,
    nodes: HashMap<String, usize>,
    devices: HashMap<String, usize>,
}

impl Trace {
    fn for_circuit(circuit: &Circuit) -> Self {
        let node_count = circuit.num_nodes() - 1;
        let nodes = (1..circuit.num_nodes())
            .map(|id| (circuit.node_name(NodeId(id)).to_string(), id - 1))
            .collect();
        let devices = circuit
            .components
            .iter()
            .enumerate()
            .map(|(index, component)| (component.name().to_string(), index))
            .collect();
        Self {
            times: Vec::new(),
            voltages: vec![Vec::new(); node_count],
            currents: vec![Vec::new(); circuit.components.len()],
            nodes,
            devices,
        }
    }

    fn record(&mut self, circuit: &Circuit, matrix: &MnaMatrix, time: f64, dt: Option<f64>) {
        self.times.push(time);
        for (index, column) in self.voltages.iter_mut().enumerate() {
            column.push(matrix.x[index]);
        }
        for (component, column) in circuit.components.iter().zip(self.currents.iter_mut()) {
            column.push(matrix.device_current(circuit, component, time, dt));
        }
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `(time, voltage)` of a node.
    pub fn voltage_array(&self, node: &str) -> Result<Vec<(f64, f64)>> {
        let key = node.to_lowercase();
        if key == "0" || key == "gnd" {
            return Ok(self.times.iter().map(|&t| (t, 0.0)).collect());
        }
        let index = *self.nodes.get(&key).ok_or_else(|| IbisError::NodeNotFound {
            node: node.to_string(),
        })?;
        Ok(self.zip(&self.voltages[index]))
    }

    /// `(time, current)` through a device, n+ to n-.
    pub fn current_array(&self, device: &str) -> Result<Vec<(f64, f64)>> {
        let index = *self
            .devices
            .get(&device.to_lowercase())
            .ok_or_else(|| IbisError::unknown("device", device))?;
        Ok(self.zip(&self.currents[index]))
    }

    fn zip(&self, values: &[f64]) -> Vec<(f64, f64)> {
        self.times.iter().copied().zip(values.iter().copied()).collect()
    }
}

/// The transient simulator.
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    /// MNA matrix system
    matrix: MnaMatrix,
    /// Newton-Raphson solver
    newton: NewtonRaphson,
    /// Time of the last solution
    time: f64,
    max_steps: usize,
}

impl Simulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(circuit: Circuit) -> Result<Self> {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Result<Self> {
        validate_circuit(&circuit)?;
        let matrix = MnaMatrix::new(circuit.matrix_size());
        let newton = NewtonRaphson::with_config(config.max_iterations, config.tolerance, config.reltol);
        Ok(Self {
            circuit,
            matrix,
            newton,
            time: 0.0,
            max_steps: config.max_steps,
        })
    }

    /// Solve the DC operating point at t = 0 and initialise reactive state.
    pub fn operating_point(&mut self) -> Result<()> {
        self.time = 0.0;
        self.newton
            .solve(&mut self.circuit, &mut self.matrix, 0.0, None)?;
        self.update_reactive_states(None);
        Ok(())
    }

    /// Advance by `dt`.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        self.time += dt;
        self.newton
            .solve(&mut self.circuit, &mut self.matrix, self.time, Some(dt))?;
        self.update_reactive_states(Some(dt));
        Ok(())
    }

    /// Run a transient analysis from the operating point to `tstop`.
    pub fn tran(&mut self, tstep: f64, tstop: f64) -> Result<Trace> {
        if !(tstep.is_finite() && tstep > 0.0) {
            return Err(IbisError::invalid_param(format!("time step must be positive, got {tstep}")));
        }
        if !(tstop.is_finite() && tstop > 0.0) {
            return Err(IbisError::invalid_param(format!("stop time must be positive, got {tstop}")));
        }

        let steps = ((tstop / tstep) - 1e-9).ceil().max(1.0);
        if steps > self.max_steps as f64 {
            return Err(IbisError::invalid_param(format!(
                "{steps} time steps exceed the limit of {}",
                self.max_steps
            )));
        }
        let steps = steps as usize;
        tracing::debug!(circuit = %self.circuit.title, steps, tstep, "transient analysis");

        let mut trace = Trace::for_circuit(&self.circuit);
        self.time = 0.0;
        self.newton
            .solve(&mut self.circuit, &mut self.matrix, 0.0, None)?;
        trace.record(&self.circuit, &self.matrix, 0.0, None);
        self.update_reactive_states(None);

        let mut previous = 0.0;
        for k in 1..=steps {
            let time = (k as f64 * tstep).min(tstop);
            let dt = time - previous;
            self.time = time;
            self.newton
                .solve(&mut self.circuit, &mut self.matrix, time, Some(dt))?;
            trace.record(&self.circuit, &self.matrix, time, Some(dt));
            self.update_reactive_states(Some(dt));
            previous = time;
        }

        Ok(trace)
    }

    /// Update the state of reactive components (capacitors, inductors).
    fn update_reactive_states(&mut self, dt: Option<f64>) {
        let num_nodes = self.circuit.num_nodes();
        let x = &self.matrix.x;
        let voltage = |node: NodeId| {
            if node.is_ground() {
                0.0
            } else {
                x[node.0 - 1]
            }
        };

        for component in &mut self.circuit.components {
            match component {
                Component::Capacitor(c) => {
                    let v = voltage(c.nodes[0]) - voltage(c.nodes[1]);
                    c.update_state(v, dt);
                }

                Component::Inductor(l) => {
                    // Branch index calculation without borrowing circuit
                    let br = (num_nodes - 1) + l.branch.0;
                    l.update_state(x[br], dt);
                }

                _ => {}
            }
        }
    }

    /// Time of the last solution.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Get the current voltage at a node by name.
    pub fn node_voltage(&self, name: &str) -> Option<f64> {
        let node = self.circuit.find_node(name)?;
        Some(self.matrix.node_voltage(&self.circuit, node))
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{i, v, SourceWaveform};
    use approx::assert_relative_eq;

    #[test]
    fn test_rc_step_response() {
        let mut circuit = Circuit::new("rc");
        circuit
            .add_voltage_source("V1", "in", "0", SourceWaveform::pwl(vec![(0.0, 0.0), (1e-9, 1.0)]))
            .unwrap();
        circuit.add_resistor("R1", "in", "out", 1e3).unwrap();
        circuit.add_capacitor("C1", "out", "0", 1e-9).unwrap();

        let mut sim = Simulator::new(circuit).unwrap();
        let trace = sim.tran(1e-8, 2e-6).unwrap();
        let out = trace.voltage_array("OUT").unwrap();
        assert_eq!(out.len(), 201);
        assert_eq!(out[0], (0.0, 0.0));

        // tau = 1us
        let (t, v) = out[100];
        assert_relative_eq!(t, 1e-6, epsilon = 1e-15);
        assert_relative_eq!(v, 1.0 - (-1.0f64).exp(), epsilon = 5e-3);
        let (_, v_end) = out[200];
        assert_relative_eq!(v_end, 1.0 - (-2.0f64).exp(), epsilon = 5e-3);
    }

    #[test]
    fn test_inductor_is_short_at_operating_point() {
        let mut circuit = Circuit::new("rl");
        circuit.add_voltage_source("V1", "in", "0", 1.0).unwrap();
        circuit.add_inductor("L1", "in", "out", 1e-9).unwrap();
        circuit.add_resistor("R1", "out", "0", 10.0).unwrap();

        let mut sim = Simulator::new(circuit).unwrap();
        sim.operating_point().unwrap();
        assert_relative_eq!(sim.node_voltage("out").unwrap(), 1.0, epsilon = 1e-9);

        let trace = sim.tran(1e-11, 1e-10).unwrap();
        let current = trace.current_array("L1").unwrap();
        assert!(current.iter().all(|&(_, i)| (i - 0.1).abs() < 1e-9));
    }

    #[test]
    fn test_vi_source_matches_resistor() {
        let mut circuit = Circuit::new("vi");
        circuit.add_voltage_source("V1", "a", "0", 2.0).unwrap();
        circuit.add_resistor("R1", "a", "b", 100.0).unwrap();
        // 100 ohm as a table, with a multiplier of 1/2 from t = 0 on
        circuit
            .add_vi_source("G1", "b", "0", vec![(0.0, 0.0), (1.0, 0.01)], Some(vec![(0.0, 0.5)]))
            .unwrap();

        let mut sim = Simulator::new(circuit).unwrap();
        let trace = sim.tran(1e-9, 2e-9).unwrap();
        let b = trace.voltage_array("b").unwrap();
        // 100 ohm in series with 200 ohm
        assert_relative_eq!(b[2].1, 2.0 * 200.0 / 300.0, epsilon = 1e-6);
        let g1 = trace.current_array("g1").unwrap();
        assert_relative_eq!(g1[2].1, 2.0 / 300.0, epsilon = 1e-8);
    }

    #[test]
    fn test_behavioral_source_reads_currents() {
        let mut circuit = Circuit::new("b");
        circuit.add_voltage_source("V1", "a", "0", 3.0).unwrap();
        circuit.add_resistor("R1", "a", "0", 1e3).unwrap();
        // Current into V1's + terminal is -3 mA
        circuit
            .add_behavioral("B1", "k", "0", -i("v1") * 1e3 + v("a"))
            .unwrap();
        circuit.add_behavioral("B2", "q", "0", v("a") / (v("a") - v("a"))).unwrap();

        let mut sim = Simulator::new(circuit).unwrap();
        let trace = sim.tran(1e-9, 2e-9).unwrap();
        let k = trace.voltage_array("k").unwrap();
        assert_relative_eq!(k[2].1, 6.0, epsilon = 1e-6);
        // Division by zero keeps the last finite value
        let q = trace.voltage_array("q").unwrap();
        assert!(q.iter().all(|&(_, value)| value == 0.0));
    }

    #[test]
    fn test_invalid_parameters() {
        let mut circuit = Circuit::new("r");
        circuit.add_resistor("R1", "a", "0", 1.0).unwrap();
        let mut sim = Simulator::new(circuit).unwrap();
        assert!(matches!(
            sim.tran(0.0, 1e-9),
            Err(IbisError::InvalidSimulationParam { .. })
        ));
        assert!(matches!(
            sim.tran(1e-9, -1.0),
            Err(IbisError::InvalidSimulationParam { .. })
        ));
    }

    #[test]
    fn test_step_count_is_capped() {
        let mut circuit = Circuit::new("r");
        circuit.add_resistor("R1", "a", "0", 1.0).unwrap();
        let config = SimulatorConfig::new().with_max_steps(100);
        let mut sim = Simulator::with_config(circuit, config).unwrap();
        assert_eq!(sim.tran(1e-11, 1e-9).unwrap().len(), 101);
        assert!(matches!(
            sim.tran(1e-12, 1e-9),
            Err(IbisError::InvalidSimulationParam { .. })
        ));

        // A femtosecond step over nanoseconds is refused before any allocation
        let mut circuit = Circuit::new("r");
        circuit.add_resistor("R1", "a", "0", 1.0).unwrap();
        let mut sim = Simulator::new(circuit).unwrap();
        assert!(matches!(
            sim.tran(1e-15, 1e-6),
            Err(IbisError::InvalidSimulationParam { .. })
        ));
    }

    #[test]
    fn test_unknown_names() {
        let mut circuit = Circuit::new("r");
        circuit.add_resistor("R1", "a", "0", 1.0).unwrap();
        let trace = Simulator::new(circuit).unwrap().tran(1e-9, 1e-9).unwrap();
        assert!(matches!(trace.voltage_array("zz"), Err(IbisError::NodeNotFound { .. })));
        assert!(matches!(trace.current_array("R9"), Err(IbisError::UnknownDevice { .. })));
        assert_eq!(trace.voltage_array("gnd").unwrap().len(), 2);
    }
}

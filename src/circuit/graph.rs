//! Circuit graph structure.

use std::collections::HashMap;

use super::types::{BranchId, ComponentId, NodeId};
use crate::components::{
    BehavioralSource, Capacitor, Component, CurrentSource, Expr, Inductor, Resistor,
    SourceWaveform, ViSource, VoltageSource,
};
use crate::error::{IbisError, Result};

/// A circuit ready for simulation, built device by device.
///
/// Node and device names are case-insensitive. `"0"` and `"gnd"` name the
/// ground node; every other node is created on first use.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub title: String,

    /// All components in the circuit
    pub components: Vec<Component>,

    /// Mapping from node names to node IDs
    node_map: HashMap<String, NodeId>,

    /// Reverse mapping from node IDs to names (for error messages)
    node_names: Vec<String>,

    /// Mapping from device names to positions in `components`
    component_map: HashMap<String, usize>,

    /// Number of branch current variables (voltage sources, inductors)
    pub num_branches: usize,
}

impl Circuit {
    pub fn new(title: impl Into<String>) -> Self {
        let mut node_map = HashMap::new();
        // Ground is always node 0
        node_map.insert("0".to_string(), NodeId::GROUND);
        node_map.insert("gnd".to_string(), NodeId::GROUND);
        Self {
            title: title.into(),
            components: Vec::new(),
            node_map,
            node_names: vec!["0".to_string()],
            component_map: HashMap::new(),
            num_branches: 0,
        }
    }

    /// Get or create the node called `name`.
    pub fn node(&mut self, name: &str) -> NodeId {
        let key = name.to_lowercase();
        if let Some(&id) = self.node_map.get(&key) {
            return id;
        }
        let id = NodeId(self.node_names.len());
        self.node_names.push(key.clone());
        self.node_map.insert(key, id);
        id
    }

    /// Number of nodes (including ground)
    pub fn num_nodes(&self) -> usize {
        self.node_names.len()
    }

    fn next_branch(&mut self) -> BranchId {
        let branch = BranchId(self.num_branches);
        self.num_branches += 1;
        branch
    }

    /// Reserve `name` and resolve both terminals.
    fn claim(&mut self, name: &str, n1: &str, n2: &str) -> Result<(ComponentId, String, [NodeId; 2])> {
        let key = name.to_lowercase();
        if self.component_map.contains_key(&key) {
            return Err(IbisError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        let id = ComponentId(self.components.len());
        self.component_map.insert(key.clone(), id.0);
        let nodes = [self.node(n1), self.node(n2)];
        Ok((id, key, nodes))
    }

    fn push(&mut self, component: Component) -> ComponentId {
        let id = component.id();
        self.components.push(component);
        id
    }

    pub fn add_resistor(&mut self, name: &str, n1: &str, n2: &str, resistance: f64) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        Ok(self.push(Component::Resistor(Resistor::new(id, name, nodes, resistance))))
    }

    pub fn add_capacitor(&mut self, name: &str, n1: &str, n2: &str, capacitance: f64) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        Ok(self.push(Component::Capacitor(Capacitor::new(id, name, nodes, capacitance))))
    }

    pub fn add_inductor(&mut self, name: &str, n1: &str, n2: &str, inductance: f64) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        let branch = self.next_branch();
        Ok(self.push(Component::Inductor(Inductor::new(id, name, nodes, inductance, branch))))
    }

    pub fn add_voltage_source(
        &mut self,
        name: &str,
        n1: &str,
        n2: &str,
        waveform: impl Into<SourceWaveform>,
    ) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        let branch = self.next_branch();
        let source = VoltageSource::new(id, name, nodes, waveform.into(), branch);
        Ok(self.push(Component::VoltageSource(source)))
    }

    /// Current flows from `n1` through the source to `n2`.
    pub fn add_current_source(
        &mut self,
        name: &str,
        n1: &str,
        n2: &str,
        waveform: impl Into<SourceWaveform>,
    ) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        let source = CurrentSource::new(id, name, nodes, waveform.into());
        Ok(self.push(Component::CurrentSource(source)))
    }

    /// Table-driven source: current `n1 -> n2` is
    /// `multiplier(t) * table(V(n1) - V(n2))`.
    pub fn add_vi_source(
        &mut self,
        name: &str,
        n1: &str,
        n2: &str,
        table: Vec<(f64, f64)>,
        multiplier: Option<Vec<(f64, f64)>>,
    ) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        let source = ViSource::new(id, name, nodes, table, multiplier);
        Ok(self.push(Component::Vi(source)))
    }

    /// Voltage source with `V(n1) - V(n2) = expr`.
    pub fn add_behavioral(&mut self, name: &str, n1: &str, n2: &str, expr: Expr) -> Result<ComponentId> {
        let (id, name, nodes) = self.claim(name, n1, n2)?;
        let branch = self.next_branch();
        let source = BehavioralSource::new(id, name, nodes, expr, branch);
        Ok(self.push(Component::Behavioral(source)))
    }

    /// Get the total size of the MNA solution vector.
    pub fn matrix_size(&self) -> usize {
        // Nodes (excluding ground) + branch currents
        (self.num_nodes() - 1) + self.num_branches
    }

    /// Get the matrix index for a node voltage.
    /// Returns None for ground (node 0).
    pub fn node_index(&self, node: NodeId) -> Option<usize> {
        if node.is_ground() {
            None
        } else {
            Some(node.0 - 1)
        }
    }

    /// Get the matrix index for a branch current.
    pub fn branch_index(&self, branch: BranchId) -> usize {
        (self.num_nodes() - 1) + branch.0
    }

    /// Find a node ID by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_map.get(&name.to_lowercase()).copied()
    }

    /// Find a device by name.
    pub fn find_component(&self, name: &str) -> Option<&Component> {
        self.component_map
            .get(&name.to_lowercase())
            .map(|&index| &self.components[index])
    }

    /// Get the name of a node.
    pub fn node_name(&self, node: NodeId) -> &str {
        &self.node_names[node.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_are_case_insensitive() {
        let mut circuit = Circuit::new("t");
        let a = circuit.node("Out");
        assert_eq!(circuit.node("OUT"), a);
        assert_eq!(circuit.node("GND"), NodeId::GROUND);
        assert_eq!(circuit.node("0"), NodeId::GROUND);
        assert_eq!(circuit.num_nodes(), 2);
    }

    #[test]
    fn test_duplicate_device_name() {
        let mut circuit = Circuit::new("t");
        circuit.add_resistor("R1", "a", "0", 50.0).unwrap();
        let err = circuit.add_capacitor("r1", "a", "0", 1e-12).unwrap_err();
        assert!(matches!(err, IbisError::DuplicateComponent { .. }));
    }

    #[test]
    fn test_branches_are_allocated() {
        let mut circuit = Circuit::new("t");
        circuit.add_voltage_source("V1", "a", "0", 1.0).unwrap();
        circuit.add_resistor("R1", "a", "b", 1.0).unwrap();
        circuit.add_inductor("L1", "b", "0", 1e-9).unwrap();
        assert_eq!(circuit.num_branches, 2);
        assert_eq!(circuit.matrix_size(), 4);
        assert!(circuit.find_component("l1").is_some());
    }
}

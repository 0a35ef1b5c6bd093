//! Subcircuit instances and their elements.
//!
//! Every pin model is built as an instance with its own namespace, so any
//! number of pins can share one [`Circuit`]. Instance `n` names its internal
//! nodes `n@local` and its devices `n#local`.

use crate::circuit::Circuit;
use crate::error::Result;
use crate::ibis::Table;

/// Hands out instance ids for one circuit.
#[derive(Debug, Clone, Default)]
pub struct SubcktNamer {
    next: usize,
}

impl SubcktNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new instance namespace.
    pub fn instance(&mut self) -> Instance {
        let id = self.next;
        self.next += 1;
        Instance { id }
    }
}

/// Namespace of one subcircuit instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    id: usize,
}

impl Instance {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Internal node name.
    pub fn node(&self, local: &str) -> String {
        format!("{}@{}", self.id, local)
    }

    /// Device name.
    pub fn device(&self, local: &str) -> String {
        format!("{}#{}", self.id, local)
    }
}

/// One device of an equivalent circuit, with global node and device names.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Resistor { name: String, n1: String, n2: String, value: f64 },
    Capacitor { name: String, n1: String, n2: String, value: f64 },
    Inductor { name: String, n1: String, n2: String, value: f64 },
    VoltageSource { name: String, n1: String, n2: String, value: f64 },
    /// Current `n1 -> n2` is `multiplier(t) * table(V(n1) - V(n2))`
    Vi {
        name: String,
        n1: String,
        n2: String,
        table: Table,
        multiplier: Option<Table>,
    },
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Resistor { name, .. }
            | Element::Capacitor { name, .. }
            | Element::Inductor { name, .. }
            | Element::VoltageSource { name, .. }
            | Element::Vi { name, .. } => name,
        }
    }

    /// Add this element to `circuit`.
    pub fn attach(&self, circuit: &mut Circuit) -> Result<()> {
        match self {
            Element::Resistor { name, n1, n2, value } => circuit.add_resistor(name, n1, n2, *value)?,
            Element::Capacitor { name, n1, n2, value } => circuit.add_capacitor(name, n1, n2, *value)?,
            Element::Inductor { name, n1, n2, value } => circuit.add_inductor(name, n1, n2, *value)?,
            Element::VoltageSource { name, n1, n2, value } => {
                circuit.add_voltage_source(name, n1, n2, *value)?
            }
            Element::Vi {
                name,
                n1,
                n2,
                table,
                multiplier,
            } => circuit.add_vi_source(name, n1, n2, table.clone(), multiplier.clone())?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_get_distinct_namespaces() {
        let mut namer = SubcktNamer::new();
        let a = namer.instance();
        let b = namer.instance();
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(a.node("die"), "0@die");
        assert_eq!(b.device("pullup"), "1#pullup");
        assert_ne!(a.node("vcc"), b.node("vcc"));
    }

    #[test]
    fn test_attach_adds_device() {
        let mut circuit = Circuit::new("attach");
        let element = Element::Resistor {
            name: "0#r".to_string(),
            n1: "pad".to_string(),
            n2: "0@mid".to_string(),
            value: 0.25,
        };
        element.attach(&mut circuit).unwrap();
        assert!(circuit.find_component("0#r").is_some());
        assert!(circuit.find_node("0@mid").is_some());
        assert!(element.attach(&mut circuit).is_err());
    }
}

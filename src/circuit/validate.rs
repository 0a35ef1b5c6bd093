//! Circuit validation.

use crate::components::{Component, Signal};
use crate::error::{IbisError, Result};

use super::Circuit;

/// Validate a circuit for simulation.
///
/// Checks:
/// - The circuit has at least one device
/// - Behavioral expressions only read existing nodes and devices
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components.is_empty() {
        return Err(IbisError::InvalidTopology {
            message: format!("Circuit '{}' has no components", circuit.title),
        });
    }

    for component in &circuit.components {
        let Component::Behavioral(source) = component else {
            continue;
        };
        for signal in source.expr.signals() {
            match signal {
                Signal::Voltage(node) if circuit.find_node(node).is_none() => {
                    return Err(IbisError::NodeNotFound {
                        node: node.to_string(),
                    });
                }
                Signal::Current(device) if circuit.find_component(device).is_none() => {
                    return Err(IbisError::unknown("device", device));
                }
                _ => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{i, v};

    #[test]
    fn test_empty_circuit_is_rejected() {
        let err = validate_circuit(&Circuit::new("empty")).unwrap_err();
        assert!(matches!(err, IbisError::InvalidTopology { .. }));
    }

    #[test]
    fn test_behavioral_references_must_exist() {
        let mut circuit = Circuit::new("b");
        circuit.add_voltage_source("V1", "a", "0", 1.0).unwrap();
        circuit.add_behavioral("B1", "k", "0", v("a") * 2.0).unwrap();
        assert!(validate_circuit(&circuit).is_ok());

        circuit.add_behavioral("B2", "k2", "0", i("vmissing")).unwrap();
        let err = validate_circuit(&circuit).unwrap_err();
        assert!(matches!(err, IbisError::UnknownDevice { kind: "device", .. }));
    }
}

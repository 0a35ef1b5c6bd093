//! Voltage and current sources.

use super::waveform::SourceWaveform;
use crate::circuit::{BranchId, ComponentId, NodeId};

/// A voltage source component.
///
/// Voltage sources require an extra row/column in the MNA matrix for the
/// branch current. The source enforces: V+ - V- = V_source
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub waveform: SourceWaveform,
    pub branch: BranchId,
}

impl VoltageSource {
    /// Create a new voltage source.
    pub fn new(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        waveform: SourceWaveform,
        branch: BranchId,
    ) -> Self {
        Self {
            id,
            name,
            nodes,
            waveform,
            branch,
        }
    }

    /// Get the source voltage at time `t`.
    pub fn voltage(&self, t: f64) -> f64 {
        self.waveform.value_at(t)
    }
}

/// A current source component.
///
/// Current sources add directly to the RHS vector of the MNA equations.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative] - current flows from + to -
    pub waveform: SourceWaveform,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(id: ComponentId, name: String, nodes: [NodeId; 2], waveform: SourceWaveform) -> Self {
        Self {
            id,
            name,
            nodes,
            waveform,
        }
    }

    /// Get the source current at time `t`.
    pub fn current(&self, t: f64) -> f64 {
        self.waveform.value_at(t)
    }
}

//! Device models for circuit simulation.
//!
//! This module provides models for all supported devices:
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source, Current Source with DC, PWL or Gauss waveforms
//! - Nonlinear: table-driven VI source, behavioral voltage source
//!
//! Each device implements stamping into the MNA matrix.

mod behavioral;
mod linear;
mod sources;
mod vicurve;
mod waveform;

pub use behavioral::{i, v, BehavioralSource, Expr, Signal, Signals};
pub use linear::{Capacitor, Inductor, Resistor};
pub use sources::{CurrentSource, VoltageSource};
pub use vicurve::ViSource;
pub use waveform::{erf, Extrapolation, GaussEdge, Pwl, SourceWaveform};

use crate::circuit::{BranchId, ComponentId, NodeId};

/// A circuit device.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Vi(ViSource),
    Behavioral(BehavioralSource),
}

impl Component {
    /// Get the component ID.
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Resistor(r) => r.id,
            Component::Capacitor(c) => c.id,
            Component::Inductor(l) => l.id,
            Component::VoltageSource(v) => v.id,
            Component::CurrentSource(i) => i.id,
            Component::Vi(vi) => vi.id,
            Component::Behavioral(b) => b.id,
        }
    }

    /// Get the component name.
    pub fn name(&self) -> &str {
        match self {
            Component::Resistor(r) => &r.name,
            Component::Capacitor(c) => &c.name,
            Component::Inductor(l) => &l.name,
            Component::VoltageSource(v) => &v.name,
            Component::CurrentSource(i) => &i.name,
            Component::Vi(vi) => &vi.name,
            Component::Behavioral(b) => &b.name,
        }
    }

    /// Terminals as `[n+, n-]`.
    pub fn nodes(&self) -> [NodeId; 2] {
        match self {
            Component::Resistor(r) => r.nodes,
            Component::Capacitor(c) => c.nodes,
            Component::Inductor(l) => l.nodes,
            Component::VoltageSource(v) => v.nodes,
            Component::CurrentSource(i) => i.nodes,
            Component::Vi(vi) => vi.nodes,
            Component::Behavioral(b) => b.nodes,
        }
    }

    /// Branch current unknown, for devices that have one.
    pub fn branch(&self) -> Option<BranchId> {
        match self {
            Component::Inductor(l) => Some(l.branch),
            Component::VoltageSource(v) => Some(v.branch),
            Component::Behavioral(b) => Some(b.branch),
            _ => None,
        }
    }

    /// Check if this component is nonlinear (requires Newton-Raphson iteration).
    pub fn is_nonlinear(&self) -> bool {
        matches!(self, Component::Vi(_) | Component::Behavioral(_))
    }
}

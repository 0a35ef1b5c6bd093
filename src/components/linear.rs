//! Linear passive components: Resistor, Capacitor, Inductor.

use crate::circuit::{BranchId, ComponentId, NodeId};

/// A resistor component.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(id: ComponentId, name: String, nodes: [NodeId; 2], resistance: f64) -> Self {
        Self {
            id,
            name,
            nodes,
            resistance: resistance.max(1e-12), // Minimum resistance to avoid singularity
        }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

/// A capacitor component.
///
/// In discrete-time simulation, a capacitor is modeled using a companion model.
/// Using the trapezoidal rule:
///   i(t) = (2C/dt) * v(t) - i_eq(t-dt)
///
/// where i_eq(t-dt) = (2C/dt) * v(t-dt) + i(t-dt)
///
/// This gives an equivalent conductance G_eq = 2C/dt and an equivalent
/// current source I_eq = -i_eq(t-dt). At the operating point the capacitor
/// is open.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub capacitance: f64,

    // State for discrete-time model
    /// Previous voltage across capacitor
    pub v_prev: f64,
    /// Previous current through capacitor
    pub i_prev: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(id: ComponentId, name: String, nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self {
            id,
            name,
            nodes,
            capacitance,
            v_prev: 0.0,
            i_prev: 0.0,
        }
    }

    /// Get the equivalent conductance for the trapezoidal companion model.
    pub fn conductance(&self, dt: f64) -> f64 {
        2.0 * self.capacitance / dt
    }

    /// Get the equivalent current source value for the companion model.
    ///
    /// The companion current source represents the "history" term and
    /// should be SUBTRACTED from the current. In MNA terms, we add a
    /// negative current source (current flowing out of node n+).
    pub fn current_source(&self, dt: f64) -> f64 {
        -(self.conductance(dt) * self.v_prev + self.i_prev)
    }

    /// Current for a solved voltage `v`; zero at the operating point.
    pub fn current(&self, v: f64, dt: Option<f64>) -> f64 {
        match dt {
            Some(dt) => self.conductance(dt) * (v - self.v_prev) - self.i_prev,
            None => 0.0,
        }
    }

    /// Update the state after solving.
    pub fn update_state(&mut self, v_new: f64, dt: Option<f64>) {
        self.i_prev = self.current(v_new, dt);
        self.v_prev = v_new;
    }
}

/// An inductor component.
///
/// In discrete-time simulation, an inductor is modeled using a companion model.
/// Using the trapezoidal rule:
///   v(t) = (2L/dt) * (i(t) - i(t-dt)) - v(t-dt)
///
/// This requires an additional branch current variable in the MNA matrix.
/// At the operating point the inductor is a short.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub inductance: f64,
    pub branch: BranchId,

    // State for discrete-time model
    /// Previous current through inductor
    pub i_prev: f64,
    /// Previous voltage across inductor
    pub v_prev: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        inductance: f64,
        branch: BranchId,
    ) -> Self {
        Self {
            id,
            name,
            nodes,
            inductance,
            branch,
            i_prev: 0.0,
            v_prev: 0.0,
        }
    }

    /// Get the equivalent resistance for the trapezoidal companion model.
    pub fn resistance(&self, dt: f64) -> f64 {
        2.0 * self.inductance / dt
    }

    /// Right-hand side of the branch equation `v - R_eq * i = V_eq`.
    pub fn voltage_source(&self, dt: f64) -> f64 {
        -(self.resistance(dt) * self.i_prev + self.v_prev)
    }

    /// Update the state after solving.
    pub fn update_state(&mut self, i_new: f64, dt: Option<f64>) {
        self.v_prev = match dt {
            Some(dt) => self.resistance(dt) * (i_new - self.i_prev) - self.v_prev,
            None => 0.0,
        };
        self.i_prev = i_new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(
            ComponentId(0),
            "R1".to_string(),
            [NodeId(1), NodeId(0)],
            1000.0,
        );
        assert!((r.conductance() - 0.001).abs() < 1e-10);
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut c = Capacitor::new(
            ComponentId(0),
            "C1".to_string(),
            [NodeId(1), NodeId(0)],
            1e-12,
        );
        let dt = 1e-12;
        let g = c.conductance(dt);
        assert!((g - 2.0).abs() < 1e-9);

        // Initial current source should be 0
        assert!((c.current_source(dt)).abs() < 1e-10);

        // Operating point leaves the capacitor charged with no current
        c.update_state(1.0, None);
        assert!((c.v_prev - 1.0).abs() < 1e-10);
        assert_eq!(c.i_prev, 0.0);

        c.update_state(1.5, Some(dt));
        assert!((c.i_prev - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inductor_companion_model() {
        let mut l = Inductor::new(
            ComponentId(0),
            "L1".to_string(),
            [NodeId(1), NodeId(0)],
            1e-9,
            BranchId(0),
        );
        l.update_state(0.1, None);
        assert_eq!(l.v_prev, 0.0);

        let dt = 1e-10;
        // v = R_eq * (i - i_prev) - v_prev
        l.update_state(0.2, Some(dt));
        assert!((l.v_prev - 2.0).abs() < 1e-9);
        assert!((l.voltage_source(dt) + (20.0 * 0.2 + 2.0)).abs() < 1e-9);
    }
}

//! Table-driven current source.
//!
//! The current from n+ to n- is `k(t) * f(V+ - V-)` where `f` is a
//! piecewise-linear VI table continued linearly past its ends and `k` an
//! optional time table held at its end values. For Newton-Raphson the device
//! is linearized around the previous iterate like any other nonlinear
//! element:
//!   I ≈ G * V + I_eq,  G = k * f'(V0),  I_eq = k * f(V0) - G * V0

use super::waveform::Pwl;
use crate::circuit::{ComponentId, NodeId};

#[derive(Debug, Clone)]
pub struct ViSource {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub table: Pwl,
    pub multiplier: Option<Pwl>,
}

impl ViSource {
    pub fn new(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        table: Vec<(f64, f64)>,
        multiplier: Option<Vec<(f64, f64)>>,
    ) -> Self {
        Self {
            id,
            name,
            nodes,
            table: Pwl::linear(table),
            multiplier: multiplier.map(Pwl::hold),
        }
    }

    /// Scale factor at time `t`.
    pub fn scale(&self, t: f64) -> f64 {
        self.multiplier.as_ref().map_or(1.0, |k| k.eval(t))
    }

    /// Current n+ -> n- for a branch voltage `v` at time `t`.
    pub fn current(&self, v: f64, t: f64) -> f64 {
        self.scale(t) * self.table.eval(v)
    }

    /// Returns (conductance G, equivalent current source I_eq)
    /// such that I = G * V + I_eq near `v_op`.
    pub fn linearize(&self, v_op: f64, t: f64) -> (f64, f64) {
        let k = self.scale(t);
        let g = k * self.table.slope(v_op);
        let i_eq = self.current(v_op, t) - g * v_op;
        (g, i_eq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn source(multiplier: Option<Vec<(f64, f64)>>) -> ViSource {
        ViSource::new(
            ComponentId(0),
            "pd".to_string(),
            [NodeId(1), NodeId(0)],
            vec![(0.0, 0.0), (1.0, 0.01), (2.0, 0.015)],
            multiplier,
        )
    }

    #[test]
    fn test_current_extrapolates_table() {
        let vi = source(None);
        assert_relative_eq!(vi.current(0.5, 0.0), 0.005);
        assert_relative_eq!(vi.current(3.0, 0.0), 0.02);
        assert_relative_eq!(vi.current(-1.0, 0.0), -0.01);
    }

    #[test]
    fn test_multiplier_holds_past_ends() {
        let vi = source(Some(vec![(0.0, 0.0), (1e-9, 1.0)]));
        assert_relative_eq!(vi.current(1.0, -1.0), 0.0);
        assert_relative_eq!(vi.current(1.0, 0.5e-9), 0.005);
        assert_relative_eq!(vi.current(1.0, 5e-9), 0.01);
    }

    #[test]
    fn test_linearization_is_exact_on_segment() {
        let vi = source(None);
        let (g, i_eq) = vi.linearize(1.5, 0.0);
        assert_relative_eq!(g, 0.005);
        assert_relative_eq!(g * 1.8 + i_eq, vi.current(1.8, 0.0));
    }
}

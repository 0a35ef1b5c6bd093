//! K-tables from `[Ramp]` data.
//!
//! A Gaussian edge through the full supply swing stands in for a measured
//! waveform. A single bench gives one equation, closed with `ku - kd = 1`:
//!
//! ```text
//!      Imeas - Ipu - Ifix          Imeas - Ipd - Ifix
//! kd = ------------------     ku = ------------------
//!          Ipu - Ipd                   Ipu - Ipd
//! ```
//!
//! `Ipu` is the current of the raw pullup table, which is negative while the
//! pullup sources current into the pin. The denominator keeps one sign over
//! the whole edge. On a rising edge ku runs from 0 to 1 and kd from -1 to 0.

use super::{add_bench, read_tables, supply, Fixture};
use crate::circuit::Circuit;
use crate::components::{i, GaussEdge, SourceWaveform};
use crate::config::CharacterizationConfig;
use crate::error::{IbisError, Result};
use crate::ibis::{Direction, Model, Speed, Table};
use crate::solver::{Simulator, Trace};

pub(super) fn k_tables(
    model: &Model,
    direction: Direction,
    speed: Speed,
    config: &CharacterizationConfig,
) -> Result<(Table, Table)> {
    let trace = simulate(model, direction, speed, config)?;
    read_tables(&trace)
}

pub(super) fn simulate(
    model: &Model,
    direction: Direction,
    speed: Speed,
    config: &CharacterizationConfig,
) -> Result<Trace> {
    let vcc = supply(model, speed)?;
    let ramp = model
        .ramp
        .as_ref()
        .ok_or_else(|| IbisError::characterization(&model.name, "no [Ramp] to derive K-tables from"))?;
    let slew = ramp.slew(direction).ok_or_else(|| {
        IbisError::characterization(&model.name, format!("[Ramp] has no {direction} slew"))
    })?;
    let tr = slew.dt[speed];
    if !(tr.is_finite() && tr > 0.0) {
        return Err(IbisError::characterization(
            &model.name,
            format!("[Ramp] {direction} time {tr} is not positive"),
        ));
    }

    let (edge, v_fixture) = match direction {
        Direction::Rising => (GaussEdge::new(0.0, vcc, 0.0, tr), 0.0),
        Direction::Falling => (GaussEdge::new(vcc, 0.0, 0.0, tr), vcc),
    };
    let fixture = Fixture {
        r: ramp.r_load,
        l: None,
        c: None,
        v: v_fixture,
    };

    let mut circuit = Circuit::new(format!("{} {direction} {speed} ramp", model.name));
    circuit.add_voltage_source("vcc", "vcc", "0", vcc)?;
    add_bench(&mut circuit, model, speed, "", SourceWaveform::Gauss(edge), &fixture)?;

    // The bench places the pullup power-referenced; undo that for the raw current
    let ipu = -i("gpu");
    let den = ipu.clone() - i("gpd");
    circuit.add_behavioral("bkd", "kd", "0", (i("vmeas") - ipu - i("vfix")) / den.clone())?;
    circuit.add_behavioral("bku", "ku", "0", (i("vmeas") - i("gpd") - i("vfix")) / den)?;

    let tstop = 4.0 * tr;
    let tstep = tr / 2.0 / config.accuracy_divisor;
    tracing::debug!(model = %model.name, %direction, %speed, tstep, tstop, "ramp bench");
    Simulator::with_config(circuit, config.simulator.clone())?.tran(tstep, tstop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::tests::demo;

    #[test]
    fn test_multipliers_differ_by_one() {
        let ibis = demo();
        let model = ibis.model("drv_ramp").unwrap();
        for direction in Direction::ALL {
            for speed in Speed::ALL {
                let (ku, kd) = k_tables(model, direction, speed, &CharacterizationConfig::default()).unwrap();
                assert_eq!(ku.len(), kd.len());
                for (&(t, up), &(t_d, down)) in ku.iter().zip(&kd) {
                    assert_eq!(t, t_d);
                    let scale = up.abs().max(down.abs()).max(1.0);
                    assert!(
                        (up - down - 1.0).abs() <= 1e-6 * scale,
                        "{direction} {speed} t={t}: ku={up} kd={down}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_pulldown_hands_over_to_pullup() {
        let ibis = demo();
        let model = ibis.model("drv_ramp").unwrap();
        let (ku, kd) = k_tables(model, Direction::Rising, Speed::Typical, &CharacterizationConfig::default()).unwrap();
        assert!(kd[0].1 < -0.9 && ku[0].1.abs() < 0.1, "start: ku={} kd={}", ku[0].1, kd[0].1);
        let last = ku.len() - 1;
        assert!(ku[last].1 > 0.9 && kd[last].1.abs() < 0.1, "end: ku={} kd={}", ku[last].1, kd[last].1);
    }

    #[test]
    fn test_falling_edge_releases_pullup() {
        let ibis = demo();
        let model = ibis.model("drv_ramp").unwrap();
        let (ku, kd) = k_tables(model, Direction::Falling, Speed::Typical, &CharacterizationConfig::default()).unwrap();
        assert!(ku[0].1 > 0.9 && kd[0].1.abs() < 0.1, "start: ku={} kd={}", ku[0].1, kd[0].1);
        let last = ku.len() - 1;
        assert!(kd[last].1 < -0.9 && ku[last].1.abs() < 0.1, "end: ku={} kd={}", ku[last].1, kd[last].1);
    }

    #[test]
    fn test_horizon_is_four_ramp_times() {
        let ibis = demo();
        let model = ibis.model("drv_ramp").unwrap();
        let (ku, _) = k_tables(model, Direction::Rising, Speed::Typical, &CharacterizationConfig::default()).unwrap();
        // tr = 0.5 ns, step = 0.025 ns
        assert_eq!(ku.len(), 80);
        assert!((ku[ku.len() - 1].0 - 2e-9).abs() < 1e-18);
    }

    #[test]
    fn test_finer_divisor_gives_more_samples() {
        let ibis = demo();
        let model = ibis.model("drv_ramp").unwrap();
        let config = CharacterizationConfig::default().with_accuracy_divisor(20.0);
        let (ku, _) = k_tables(model, Direction::Falling, Speed::Typical, &config).unwrap();
        assert_eq!(ku.len(), 160);
    }

    #[test]
    fn test_missing_ramp() {
        let ibis = demo();
        let mut model = ibis.model("drv_ramp").unwrap().clone();
        model.ramp = None;
        let err = k_tables(&model, Direction::Rising, Speed::Typical, &CharacterizationConfig::default())
            .unwrap_err();
        assert!(matches!(err, IbisError::Characterization { .. }));
    }
}

//! Driver K-table derivation.
//!
//! A driving buffer switches by scaling its pullup and pulldown VI tables
//! with time-dependent multipliers ku(t) and kd(t). The multipliers are not
//! part of an IBIS file; they are recovered by forcing the published
//! switching waveforms onto the buffer in a test bench and solving for the
//! scale factors that make the pull networks deliver the measured current.
//!
//! The strategy is chosen per direction:
//!
//! | waveforms | strategy                                  |
//! |-----------|-------------------------------------------|
//! | 2 or more | double waveform, first two are used       |
//! | 1         | single waveform, computed as ramp         |
//! | 0         | ramp                                      |
//!
//! Every bench places the pull networks on the forced node and measures the
//! current into the rest of the buffer (C_comp, clamps) and the load through
//! a 0 V probe:
//!
//! ```text
//!   vcc --[pullup]--+                         +--[power clamp]-- vcc
//!                   |                         |
//!  (forced wave) -- wv --(probe)-- ts --+-----+--[C_comp]-- gnd
//!                   |                   |     |
//!   gnd -[pulldown]-+                 load    +--[gnd clamp]--- gnd
//! ```
//!
//! Behavioral sources evaluate the closed-form multipliers at every time
//! point; their node voltages are the tables.

mod double;
mod ramp;

use crate::components::SourceWaveform;
use crate::config::CharacterizationConfig;
use crate::error::{IbisError, Result};
use crate::ibis::{ByDirection, Direction, KTables, Model, Speed, Strategy, Table, TypMinMax};
use crate::solver::Trace;

/// K-tables of one driving model.
#[derive(Debug, Clone, PartialEq)]
pub struct Characterization {
    pub pullup_k: KTables,
    pub pulldown_k: KTables,
    /// How each direction was derived
    pub strategy: ByDirection<Strategy>,
}

/// Pick the derivation for one direction from the waveforms available.
pub fn select_strategy(model: &Model, direction: Direction) -> Strategy {
    match model.waveforms(direction).len() {
        0 => Strategy::Ramp,
        1 => Strategy::SingleWaveform,
        _ => Strategy::DoubleWaveform,
    }
}

/// Derive pullup and pulldown K-tables for every direction and corner.
pub fn characterize(model: &Model, config: &CharacterizationConfig) -> Result<Characterization> {
    let mut pullup_k = KTables::default();
    let mut pulldown_k = KTables::default();
    let mut strategy = ByDirection {
        rising: Strategy::Ramp,
        falling: Strategy::Ramp,
    };

    for direction in Direction::ALL {
        let chosen = select_strategy(model, direction);
        match chosen {
            Strategy::SingleWaveform => tracing::warn!(
                model = %model.name,
                %direction,
                "single waveform cannot separate ku from kd; using ramp data"
            ),
            Strategy::Ramp => tracing::warn!(
                model = %model.name,
                %direction,
                "K-tables from ramp data only; accuracy is limited"
            ),
            Strategy::DoubleWaveform => {
                tracing::debug!(model = %model.name, %direction, "K-tables from two waveforms")
            }
        }

        let mut ku = TypMinMax::<Table>::default();
        let mut kd = TypMinMax::<Table>::default();
        for speed in Speed::ALL {
            let (up, down) = match chosen {
                Strategy::DoubleWaveform => double::k_tables(model, direction, speed, config)?,
                Strategy::SingleWaveform | Strategy::Ramp => {
                    ramp::k_tables(model, direction, speed, config)?
                }
            };
            *ku.get_mut(speed) = up;
            *kd.get_mut(speed) = down;
        }

        *pullup_k.get_mut(direction) = ku;
        *pulldown_k.get_mut(direction) = kd;
        *strategy.get_mut(direction) = chosen;
    }

    Ok(Characterization {
        pullup_k,
        pulldown_k,
        strategy,
    })
}

/// Load seen by the buffer in a bench.
struct Fixture {
    r: f64,
    l: Option<f64>,
    c: Option<f64>,
    v: f64,
}

/// Add one buffer bench with devices and nodes suffixed by `tag`.
///
/// Devices of interest: `vmeas{tag}` (probe, current into the buffer
/// remainder and load), `gpu{tag}` (pullup current from vcc into the pin),
/// `gpd{tag}` (pulldown current from the pin to ground) and `vfix{tag}`
/// (current from the load into the fixture source).
fn add_bench(
    circuit: &mut crate::circuit::Circuit,
    model: &Model,
    speed: Speed,
    tag: &str,
    stimulus: SourceWaveform,
    fixture: &Fixture,
) -> Result<()> {
    let missing = |table: &str| IbisError::characterization(&model.name, format!("no [{table}] table"));
    let pullup = model.pullup.as_ref().ok_or_else(|| missing("Pullup"))?;
    let pulldown = model.pulldown.as_ref().ok_or_else(|| missing("Pulldown"))?;

    let wv = format!("wv{tag}");
    let ts = format!("ts{tag}");
    let fix = format!("fix{tag}");

    circuit.add_voltage_source(&format!("vwv{tag}"), &wv, "0", stimulus)?;
    circuit.add_vi_source(&format!("gpu{tag}"), "vcc", &wv, power_referenced(&pullup[speed]), None)?;
    circuit.add_vi_source(&format!("gpd{tag}"), &wv, "0", pulldown[speed].clone(), None)?;
    circuit.add_voltage_source(&format!("vmeas{tag}"), &wv, &ts, 0.0)?;

    if let Some(c_comp) = &model.c_comp {
        circuit.add_capacitor(&format!("cc{tag}"), &ts, "0", c_comp[speed])?;
    }
    if let Some(clamp) = &model.power_clamp {
        circuit.add_vi_source(&format!("gcu{tag}"), "vcc", &ts, power_referenced(&clamp[speed]), None)?;
    }
    if let Some(clamp) = &model.gnd_clamp {
        circuit.add_vi_source(&format!("gcd{tag}"), &ts, "0", clamp[speed].clone(), None)?;
    }

    match fixture.l {
        Some(l) => {
            let lf = format!("lf{tag}");
            circuit.add_inductor(&format!("lfix{tag}"), &ts, &lf, l)?;
            circuit.add_resistor(&format!("rfix{tag}"), &lf, &fix, fixture.r)?;
        }
        None => {
            circuit.add_resistor(&format!("rfix{tag}"), &ts, &fix, fixture.r)?;
        }
    }
    if let Some(c) = fixture.c {
        circuit.add_capacitor(&format!("cfix{tag}"), &ts, "0", c)?;
    }
    circuit.add_voltage_source(&format!("vfix{tag}"), &fix, "0", fixture.v)?;
    Ok(())
}

/// Flip the current of a table referenced to the supply, so that placed
/// from vcc to the pin its current flows out of the supply.
pub(crate) fn power_referenced(table: &Table) -> Table {
    table.iter().map(|&(v, i)| (v, -i)).collect()
}

/// Pulldown multiplier to switch a buffer with, from the derived `kd`.
///
/// Ramp-derived tables hold `ku - kd = 1` against the raw pullup current,
/// so their kd runs between -1 and 0 and is negated here.
pub(crate) fn pulldown_drive(kd: &Table, strategy: Strategy) -> Table {
    match strategy {
        Strategy::DoubleWaveform => kd.clone(),
        Strategy::SingleWaveform | Strategy::Ramp => kd.iter().map(|&(t, k)| (t, -k)).collect(),
    }
}

/// Voltage of the model's supply at `speed`.
fn supply(model: &Model, speed: Speed) -> Result<f64> {
    model
        .vcc(speed)
        .ok_or_else(|| IbisError::characterization(&model.name, "no [Voltage Range]"))
}

/// Read `ku`/`kd` from a finished bench, dropping the operating point.
fn read_tables(trace: &Trace) -> Result<(Table, Table)> {
    let ku = trace.voltage_array("ku")?.into_iter().skip(1).collect();
    let kd = trace.voltage_array("kd")?.into_iter().skip(1).collect();
    Ok((ku, kd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IbisConfig;
    use crate::ibis::Ibis;

    pub(super) fn demo() -> Ibis {
        Ibis::parse_with(
            include_str!("../../testdata/demo.ibs"),
            &IbisConfig::default().with_characterize(false),
        )
        .unwrap()
    }

    #[test]
    fn test_strategy_selection() {
        let ibis = demo();
        let wave = ibis.model("drv_wave").unwrap();
        assert_eq!(select_strategy(wave, Direction::Rising), Strategy::DoubleWaveform);
        let io = ibis.model("drv_io").unwrap();
        assert_eq!(select_strategy(io, Direction::Rising), Strategy::SingleWaveform);
        assert_eq!(select_strategy(io, Direction::Falling), Strategy::Ramp);
    }

    #[test]
    fn test_every_corner_has_tables() {
        let ibis = demo();
        for name in ["drv_ramp", "drv_wave", "drv_io"] {
            let model = ibis.model(name).unwrap();
            let k = characterize(model, &CharacterizationConfig::default()).unwrap();
            for direction in Direction::ALL {
                for speed in Speed::ALL {
                    assert!(!k.pullup_k[direction][speed].is_empty(), "{name} {direction} {speed}");
                    assert!(!k.pulldown_k[direction][speed].is_empty(), "{name} {direction} {speed}");
                    // The operating point is not part of a table
                    assert!(k.pullup_k[direction][speed][0].0 > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_recorded_strategy() {
        let ibis = demo();
        let k = characterize(ibis.model("drv_io").unwrap(), &CharacterizationConfig::default()).unwrap();
        assert_eq!(k.strategy.rising, Strategy::SingleWaveform);
        assert_eq!(k.strategy.falling, Strategy::Ramp);
    }

    #[test]
    fn test_missing_voltage_range() {
        let ibis = demo();
        let mut model = ibis.model("drv_ramp").unwrap().clone();
        model.voltage_range = None;
        let err = characterize(&model, &CharacterizationConfig::default()).unwrap_err();
        assert!(matches!(err, IbisError::Characterization { .. }));
    }

    #[test]
    fn test_missing_pull_network() {
        let ibis = demo();
        let mut model = ibis.model("drv_wave").unwrap().clone();
        model.pullup = None;
        let err = characterize(&model, &CharacterizationConfig::default()).unwrap_err();
        match err {
            IbisError::Characterization { model, message } => {
                assert_eq!(model, "drv_wave");
                assert!(message.contains("Pullup"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_pulldown_drive_follows_strategy() {
        let kd = vec![(1e-12, -0.75), (2e-12, 0.0)];
        assert_eq!(pulldown_drive(&kd, Strategy::DoubleWaveform), kd);
        assert_eq!(pulldown_drive(&kd, Strategy::Ramp), vec![(1e-12, 0.75), (2e-12, 0.0)]);
        assert_eq!(pulldown_drive(&kd, Strategy::SingleWaveform), vec![(1e-12, 0.75), (2e-12, 0.0)]);
    }

    #[test]
    fn test_power_referenced_flips_current() {
        let table = vec![(0.0, 0.0), (3.3, -0.07)];
        assert_eq!(power_referenced(&table), vec![(0.0, 0.0), (3.3, 0.07)]);
    }
}

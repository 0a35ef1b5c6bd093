//! K-tables from two waveforms into different loads.
//!
//! Each waveform gives one equation in the two unknown multipliers:
//!
//! ```text
//! Imeas0 = ku*Ipu0 - kd*Ipd0
//! Imeas1 = ku*Ipu1 - kd*Ipd1
//! ```
//!
//! which solve to
//!
//! ```text
//!      Imeas0*Ipu1 - Imeas1*Ipu0          Imeas0*Ipd1 - Imeas1*Ipd0
//! kd = -------------------------     ku = -------------------------
//!        Ipd1*Ipu0 - Ipd0*Ipu1              Ipd1*Ipu0 - Ipd0*Ipu1
//! ```

use super::{add_bench, read_tables, supply, Fixture};
use crate::circuit::Circuit;
use crate::components::{i, SourceWaveform};
use crate::config::CharacterizationConfig;
use crate::error::{IbisError, Result};
use crate::ibis::{Direction, Model, Speed, Table, Waveform};
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

/// Run both benches in one circuit and return the full trace.
pub(super) fn simulate(
    model: &Model,
    direction: Direction,
    speed: Speed,
    config: &CharacterizationConfig,
) -> Result<Trace> {
    let waves = model.waveforms(direction);
    let (wave0, wave1) = match waves {
        [first, second, ..] => (first, second),
        _ => {
            return Err(IbisError::characterization(
                &model.name,
                format!("{direction} needs two waveforms, found {}", waves.len()),
            ))
        }
    };
    let data0 = samples(model, wave0, speed)?;
    let data1 = samples(model, wave1, speed)?;

    let tstop = data0[data0.len() - 1].0.max(data1[data1.len() - 1].0);
    let interval = (data0[1].0 - data0[0].0).min(data1[1].0 - data1[0].0);
    if !(interval > 0.0 && tstop > 0.0) {
        return Err(IbisError::characterization(
            &model.name,
            format!("{direction} waveforms have no usable timing"),
        ));
    }
    let tstep = interval / config.accuracy_divisor;

    let mut circuit = Circuit::new(format!("{} {direction} {speed} double waveform", model.name));
    circuit.add_voltage_source("vcc", "vcc", "0", supply(model, speed)?)?;
    for (tag, wave, data) in [("0", wave0, data0), ("1", wave1, data1)] {
        let fixture = fixture(model, wave, speed)?;
        add_bench(&mut circuit, model, speed, tag, SourceWaveform::pwl(data), &fixture)?;
    }

    let den = i("gpd1") * i("gpu0") - i("gpd0") * i("gpu1");
    circuit.add_behavioral(
        "bkd",
        "kd",
        "0",
        (i("vmeas0") * i("gpu1") - i("vmeas1") * i("gpu0")) / den.clone(),
    )?;
    circuit.add_behavioral(
        "bku",
        "ku",
        "0",
        (i("vmeas0") * i("gpd1") - i("vmeas1") * i("gpd0")) / den,
    )?;

    tracing::debug!(model = %model.name, %direction, %speed, tstep, tstop, "double waveform bench");
    Simulator::with_config(circuit, config.simulator.clone())?.tran(tstep, tstop)
}

/// The waveform's samples at `speed`, which must span an interval.
fn samples(model: &Model, wave: &Waveform, speed: Speed) -> Result<Table> {
    let data = wave.data[speed].clone();
    if data.len() < 2 {
        return Err(IbisError::characterization(
            &model.name,
            format!("waveform has {} sample(s), need at least 2", data.len()),
        ));
    }
    Ok(data)
}

fn fixture(model: &Model, wave: &Waveform, speed: Speed) -> Result<Fixture> {
    let r = wave
        .r_fixture
        .ok_or_else(|| IbisError::characterization(&model.name, "waveform has no R_fixture"))?;
    // Minimum runs against V_fixture_min and Maximum against V_fixture_max
    let v = wave
        .v_fixture_at(speed)
        .ok_or_else(|| IbisError::characterization(&model.name, "waveform has no V_fixture"))?;
    Ok(Fixture {
        r,
        l: wave.l_fixture,
        c: wave.c_fixture,
        v,
    })
}

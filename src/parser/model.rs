//! `[Model]` section and the blocks nested in it.

use once_cell::sync::Lazy;
use regex::Captures;

use super::builder::{
    capture, label, labeled_range, named, range, range_value, value, Builder, Event, Handler,
    Section, ANY, BOUNDARY, ROW,
};
use super::units::parse_value;
use super::Parser;
use crate::driver;
use crate::error::{IbisError, Result};
use crate::ibis::{
    Model, ModelSpec, ModelType, Ramp, RangeValue, Slew, SpecKey, TypMinMax, Table, VICurve,
    Waveform,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum ModelField {
    ModelType,
    Polarity,
    Enable,
    Vinl,
    Vinh,
    Vmeas,
    Cref,
    Rref,
    Vref,
    CComp,
    TemperatureRange,
    VoltageRange,
    PullupReference,
    PulldownReference,
    PowerClampReference,
    GndClampReference,
    GndClamp,
    PowerClamp,
    Pulldown,
    Pullup,
    Ramp,
    ModelSpec,
    RisingWaveform,
    FallingWaveform,
}

static MODEL: Lazy<Builder<ModelField>> = Lazy::new(|| {
    use ModelField as F;
    Builder::new()
        .rule(&named("model[ _]type"), Handler::Named(F::ModelType))
        .rule(&named("polarity"), Handler::Named(F::Polarity))
        .rule(&named("enable"), Handler::Named(F::Enable))
        .rule(&value("vinl"), Handler::Value(F::Vinl))
        .rule(&value("vinh"), Handler::Value(F::Vinh))
        .rule(&value("vmeas"), Handler::Value(F::Vmeas))
        .rule(&value("cref"), Handler::Value(F::Cref))
        .rule(&value("rref"), Handler::Value(F::Rref))
        .rule(&value("vref"), Handler::Value(F::Vref))
        .rule(&range("c[ _]comp"), Handler::Range(F::CComp))
        .rule(&labeled_range("temperature[ _]range"), Handler::Range(F::TemperatureRange))
        .rule(&labeled_range("voltage[ _]range"), Handler::Range(F::VoltageRange))
        .rule(&labeled_range("pullup[ _]reference"), Handler::Range(F::PullupReference))
        .rule(&labeled_range("pulldown[ _]reference"), Handler::Range(F::PulldownReference))
        .rule(&labeled_range("power[ _]clamp[ _]reference"), Handler::Range(F::PowerClampReference))
        .rule(&labeled_range("gnd[ _]clamp[ _]reference"), Handler::Range(F::GndClampReference))
        .rule(&label("gnd[ _]clamp"), Handler::Single(F::GndClamp))
        .rule(&label("power[ _]clamp"), Handler::Single(F::PowerClamp))
        .rule(&label("pulldown"), Handler::Single(F::Pulldown))
        .rule(&label("pullup"), Handler::Single(F::Pullup))
        .rule(&label("ramp"), Handler::Single(F::Ramp))
        .rule(&label("model[ _]spec"), Handler::Single(F::ModelSpec))
        .rule(&label("rising[ _]waveform"), Handler::Single(F::RisingWaveform))
        .rule(&label("falling[ _]waveform"), Handler::Single(F::FallingWaveform))
        .rule(ANY, Handler::Done)
});

/// Read a `[Model]` body and derive K-tables when it drives.
pub(super) fn read_model(parser: &mut Parser<'_, '_>, name: &str) -> Result<Model> {
    tracing::debug!(model = name, "reading [Model]");
    let mut model = Model::new(name);
    MODEL.consume(parser, &mut model)?;

    if model.model_type.is_driver() && parser.config.characterize {
        match driver::characterize(&model, &parser.config.characterization) {
            Ok(tables) => {
                model.pullup_k = Some(tables.pullup_k);
                model.pulldown_k = Some(tables.pulldown_k);
                model.k_strategy = Some(tables.strategy);
            }
            // The rest of the file is still usable
            Err(err) => tracing::error!(
                model = %model.name,
                error = %err,
                "characterization failed; model has no K-tables"
            ),
        }
    }
    Ok(model)
}

fn read_vi(parser: &mut Parser<'_, '_>, model: &str, table: &str) -> Result<VICurve> {
    let mut curve = VICurve::default();
    TABLE.consume(parser, &mut curve)?;
    if curve.is_empty() {
        return Err(IbisError::EmptyTable {
            model: model.to_string(),
            table: table.to_string(),
        });
    }
    curve.normalize();
    Ok(curve)
}

fn read_waveform(parser: &mut Parser<'_, '_>) -> Result<Waveform> {
    let mut waveform = Waveform::default();
    WAVEFORM.consume(parser, &mut waveform)?;
    waveform.data.normalize();
    Ok(waveform)
}

impl Section for Model {
    type Field = ModelField;

    fn apply(&mut self, field: ModelField, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        use ModelField as F;
        match (field, event) {
            (F::ModelType, Event::Text(text)) => self.model_type = ModelType::parse(text),
            (F::Polarity, Event::Text(text)) => self.polarity = Some(text.to_string()),
            (F::Enable, Event::Text(text)) => self.enable = Some(text.to_string()),
            (F::Vinl, Event::Value(v)) => self.vinl = v,
            (F::Vinh, Event::Value(v)) => self.vinh = v,
            (F::Vmeas, Event::Value(v)) => self.vmeas = v,
            (F::Cref, Event::Value(v)) => self.cref = v,
            (F::Rref, Event::Value(v)) => self.rref = v,
            (F::Vref, Event::Value(v)) => self.vref = v,
            (F::CComp, Event::Range(r)) => self.c_comp = Some(r),
            (F::TemperatureRange, Event::Range(r)) => self.temperature_range = Some(r),
            (F::VoltageRange, Event::Range(r)) => self.voltage_range = Some(r),
            (F::PullupReference, Event::Range(r)) => self.pullup_reference = Some(r),
            (F::PulldownReference, Event::Range(r)) => self.pulldown_reference = Some(r),
            (F::PowerClampReference, Event::Range(r)) => self.power_clamp_reference = Some(r),
            (F::GndClampReference, Event::Range(r)) => self.gnd_clamp_reference = Some(r),
            (F::GndClamp, Event::Open(_)) => {
                self.gnd_clamp = Some(read_vi(parser, &self.name, "GND Clamp")?)
            }
            (F::PowerClamp, Event::Open(_)) => {
                self.power_clamp = Some(read_vi(parser, &self.name, "POWER Clamp")?)
            }
            (F::Pulldown, Event::Open(_)) => {
                self.pulldown = Some(read_vi(parser, &self.name, "Pulldown")?)
            }
            (F::Pullup, Event::Open(_)) => self.pullup = Some(read_vi(parser, &self.name, "Pullup")?),
            (F::Ramp, Event::Open(_)) => {
                let mut ramp = Ramp::default();
                RAMP.consume(parser, &mut ramp)?;
                self.ramp = Some(ramp);
            }
            (F::ModelSpec, Event::Open(_)) => {
                let mut spec = ModelSpec::default();
                MODEL_SPEC.consume(parser, &mut spec)?;
                self.model_spec = Some(spec);
            }
            (F::RisingWaveform, Event::Open(_)) => {
                let waveform = read_waveform(parser)?;
                self.rising_waveforms.push(waveform);
            }
            (F::FallingWaveform, Event::Open(_)) => {
                let waveform = read_waveform(parser)?;
                self.falling_waveforms.push(waveform);
            }
            _ => return Err(parser.unexpected()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TableRow;

static TABLE: Lazy<Builder<TableRow>> = Lazy::new(|| {
    Builder::new()
        .rule(BOUNDARY, Handler::Done)
        .rule(ROW, Handler::Row(TableRow))
        .rule(ANY, Handler::Done)
});

/// Append a `x typ min max` row. Rows without a numeric x are skipped.
fn push_row(table: &mut TypMinMax<Table>, row: &Captures<'_>, line_number: usize) -> Result<()> {
    let key = capture(row, "key");
    let Some(x) = parse_value(key) else {
        tracing::warn!(line = line_number, key, "skipping table row without a numeric key");
        return Ok(());
    };
    table.push(x, range_value(row, line_number)?);
    Ok(())
}

impl Section for VICurve {
    type Field = TableRow;

    fn apply(&mut self, _: TableRow, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        let Event::Row(row) = event else {
            return Err(parser.unexpected());
        };
        push_row(self, row, parser.lines.line_number())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum WaveformField {
    RFixture,
    CFixture,
    LFixture,
    VFixtureMin,
    VFixtureMax,
    VFixture,
    RDut,
    CDut,
    LDut,
    Sample,
}

static WAVEFORM: Lazy<Builder<WaveformField>> = Lazy::new(|| {
    use WaveformField as F;
    Builder::new()
        .rule(&value("r[ _]fixture"), Handler::Value(F::RFixture))
        .rule(&value("c[ _]fixture"), Handler::Value(F::CFixture))
        .rule(&value("l[ _]fixture"), Handler::Value(F::LFixture))
        .rule(&value("v[ _]fixture[ _]min"), Handler::Value(F::VFixtureMin))
        .rule(&value("v[ _]fixture[ _]max"), Handler::Value(F::VFixtureMax))
        .rule(&value("v[ _]fixture"), Handler::Value(F::VFixture))
        .rule(&value("r[ _]dut"), Handler::Value(F::RDut))
        .rule(&value("c[ _]dut"), Handler::Value(F::CDut))
        .rule(&value("l[ _]dut"), Handler::Value(F::LDut))
        .rule(BOUNDARY, Handler::Done)
        .rule(ROW, Handler::Row(F::Sample))
        .rule(ANY, Handler::Done)
});

impl Section for Waveform {
    type Field = WaveformField;

    fn apply(&mut self, field: WaveformField, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        use WaveformField as F;
        match (field, event) {
            (F::Sample, Event::Row(row)) => push_row(&mut self.data, row, parser.lines.line_number())?,
            (F::RFixture, Event::Value(v)) => self.r_fixture = v,
            (F::CFixture, Event::Value(v)) => self.c_fixture = v,
            (F::LFixture, Event::Value(v)) => self.l_fixture = v,
            (F::VFixtureMin, Event::Value(v)) => self.v_fixture_min = v,
            (F::VFixtureMax, Event::Value(v)) => self.v_fixture_max = v,
            (F::VFixture, Event::Value(v)) => self.v_fixture = v,
            (F::RDut, Event::Value(v)) => self.r_dut = v,
            (F::CDut, Event::Value(v)) => self.c_dut = v,
            (F::LDut, Event::Value(v)) => self.l_dut = v,
            _ => return Err(parser.unexpected()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RampField {
    Rising,
    Falling,
    RLoad,
}

static RAMP: Lazy<Builder<RampField>> = Lazy::new(|| {
    Builder::new()
        .rule(&range("dv/dt_r"), Handler::Row(RampField::Rising))
        .rule(&range("dv/dt_f"), Handler::Row(RampField::Falling))
        .rule(&value("r[ _]load"), Handler::Value(RampField::RLoad))
        .rule(ANY, Handler::Done)
});

/// Split a `dv/dt` token such as `1.98/0.5n`.
fn fraction(token: &str) -> Option<(f64, f64)> {
    let (dv, dt) = token.split_once('/')?;
    Some((parse_value(dv)?, parse_value(dt)?))
}

fn slew(row: &Captures<'_>, line_number: usize) -> Result<Slew> {
    let typ_token = capture(row, "typ");
    let (dv, dt) = fraction(typ_token).ok_or_else(|| IbisError::InvalidNumber {
        line_number,
        token: typ_token.to_string(),
    })?;
    let min = fraction(capture(row, "min"));
    let max = fraction(capture(row, "max"));
    Ok(Slew {
        dv: RangeValue::fill(dv, min.map(|m| m.0), max.map(|m| m.0)),
        dt: RangeValue::fill(dt, min.map(|m| m.1), max.map(|m| m.1)),
    })
}

impl Section for Ramp {
    type Field = RampField;

    fn apply(&mut self, field: RampField, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        let line_number = parser.lines.line_number();
        match (field, event) {
            (RampField::Rising, Event::Row(row)) => self.rising = Some(slew(row, line_number)?),
            (RampField::Falling, Event::Row(row)) => self.falling = Some(slew(row, line_number)?),
            (RampField::RLoad, Event::Value(v)) => {
                if let Some(r_load) = v {
                    self.r_load = r_load;
                }
            }
            _ => return Err(parser.unexpected()),
        }
        Ok(())
    }
}

const SPEC_KEYS: &[(&str, SpecKey)] = &[
    (r"vinh\+", SpecKey::VinhPlus),
    (r"vinh-", SpecKey::VinhMinus),
    (r"vinl\+", SpecKey::VinlPlus),
    (r"vinl-", SpecKey::VinlMinus),
    ("vinh", SpecKey::Vinh),
    ("vinl", SpecKey::Vinl),
    ("s_overshoot_high", SpecKey::SOvershootHigh),
    ("s_overshoot_low", SpecKey::SOvershootLow),
    ("d_overshoot_high", SpecKey::DOvershootHigh),
    ("d_overshoot_low", SpecKey::DOvershootLow),
    ("d_overshoot_time", SpecKey::DOvershootTime),
    ("pulse_high", SpecKey::PulseHigh),
    ("pulse_low", SpecKey::PulseLow),
    ("pulse_time", SpecKey::PulseTime),
    ("vmeas_rising", SpecKey::VmeasRising),
    ("vmeas_falling", SpecKey::VmeasFalling),
    ("vmeas", SpecKey::Vmeas),
    ("vref_rising", SpecKey::VrefRising),
    ("vref_falling", SpecKey::VrefFalling),
    ("vref", SpecKey::Vref),
    ("cref_rising", SpecKey::CrefRising),
    ("cref_falling", SpecKey::CrefFalling),
    ("cref_diff", SpecKey::CrefDiff),
    ("cref", SpecKey::Cref),
    ("rref_rising", SpecKey::RrefRising),
    ("rref_falling", SpecKey::RrefFalling),
    ("rref_diff", SpecKey::RrefDiff),
    ("rref", SpecKey::Rref),
];

static MODEL_SPEC: Lazy<Builder<SpecKey>> = Lazy::new(|| {
    SPEC_KEYS
        .iter()
        .fold(Builder::new(), |builder, &(key, field)| {
            builder.rule(&range(key), Handler::Range(field))
        })
        .rule(ANY, Handler::Done)
});

impl Section for ModelSpec {
    type Field = SpecKey;

    fn apply(&mut self, key: SpecKey, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        let Event::Range(value) = event else {
            return Err(parser.unexpected());
        };
        self.values.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::config::IbisConfig;
    use crate::error::IbisError;
    use crate::ibis::{Direction, Ibis, ModelType, RangeValue, SpecKey, Speed};

    const DEMO: &str = include_str!("../../testdata/demo.ibs");

    fn parse_raw(input: &str) -> crate::error::Result<Ibis> {
        Ibis::parse_with(input, &IbisConfig::new().with_characterize(false))
    }

    #[test]
    fn test_model_scalars() {
        let ibis = parse_raw(DEMO).unwrap();
        let rcv = ibis.model("RCV").unwrap();
        assert_eq!(rcv.name, "RCV");
        assert_eq!(rcv.model_type, ModelType::Input);
        assert_eq!(rcv.vinl, Some(0.8));
        assert_eq!(rcv.vinh, Some(2.0));
        let c_comp = rcv.c_comp.as_ref().unwrap();
        assert_relative_eq!(c_comp.typ, 1.5e-12);
        assert_relative_eq!(c_comp.min, 1.3e-12);
        assert_relative_eq!(c_comp.max, 1.7e-12);
        assert_eq!(rcv.temperature_range, Some(RangeValue::new(25.0, 100.0, 0.0)));
        assert!(rcv.pullup_k.is_none());

        let spec = rcv.model_spec.as_ref().unwrap();
        assert_eq!(spec.get(SpecKey::Vinh), Some(&RangeValue::new(2.0, 1.9, 2.1)));
        assert_eq!(spec.get(SpecKey::VinhPlus), Some(&RangeValue::uniform(2.2)));
        assert_eq!(spec.get(SpecKey::Vmeas), Some(&RangeValue::uniform(1.5)));
    }

    #[test]
    fn test_vi_tables_fill_and_sort() {
        let ibis = parse_raw(DEMO).unwrap();
        let drv = ibis.model("drv_ramp").unwrap();
        assert_eq!(drv.model_type, ModelType::Output);

        let pulldown = drv.pulldown.as_ref().unwrap();
        assert_eq!(pulldown.len(), 4);
        assert!(pulldown.typ.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(pulldown.typ[0].0, -3.3);
        assert_relative_eq!(pulldown.typ[0].1, -82.5e-3);
        assert_eq!(pulldown.min[3].0, 6.6);
        assert_relative_eq!(pulldown.min[3].1, 132e-3);

        // NA columns mirror typ
        let clamp = drv.gnd_clamp.as_ref().unwrap();
        assert_eq!(clamp.min, clamp.typ);
        assert_eq!(clamp.max, clamp.typ);
    }

    #[test]
    fn test_ramp_block() {
        let ibis = parse_raw(DEMO).unwrap();
        let ramp = ibis.model("drv_ramp").unwrap().ramp.as_ref().unwrap();
        let rising = ramp.slew(Direction::Rising).unwrap();
        assert_eq!(rising.dv, RangeValue::new(1.98, 1.8, 2.16));
        assert_relative_eq!(rising.dt[Speed::Maximum], 0.35e-9);
        let falling = ramp.slew(Direction::Falling).unwrap();
        assert_eq!(falling.dv.min, falling.dv.typ);
        assert_eq!(falling.dt.max, falling.dt.typ);
        assert_eq!(ramp.r_load, 50.0);
    }

    #[test]
    fn test_waveforms() {
        let ibis = parse_raw(DEMO).unwrap();
        let drv = ibis.model("drv_wave").unwrap();
        assert_eq!(drv.rising_waveforms.len(), 2);
        assert_eq!(drv.falling_waveforms.len(), 2);

        let high = &drv.rising_waveforms[1];
        assert_eq!(high.r_fixture, Some(50.0));
        assert_eq!(high.v_fixture, Some(3.3));
        assert_eq!(high.v_fixture_at(Speed::Maximum), Some(3.6));
        assert_eq!(high.data.len(), 6);
        assert_relative_eq!(high.data.typ[1].0, 0.5e-9);
        assert_eq!(high.data.typ[1].1, 1.6);
        assert_eq!(high.data.min, high.data.typ);
    }

    #[test]
    fn test_reparse_is_equal() {
        assert_eq!(parse_raw(DEMO).unwrap(), parse_raw(DEMO).unwrap());
    }

    #[test]
    fn test_duplicate_model_last_wins() {
        let input = "\
[Model] dup
Model_type Input
C_comp 1p
[Model] other
Model_type Input
[Model] DUP
Model_type Input
C_comp 2p
[End]
";
        let ibis = parse_raw(input).unwrap();
        assert_eq!(ibis.models.len(), 2);
        assert_eq!(ibis.models.get_index(0).unwrap().0, "dup");
        let dup = ibis.model("dup").unwrap();
        assert_eq!(dup.name, "DUP");
        assert_relative_eq!(dup.c_comp.as_ref().unwrap().typ, 2e-12);
    }

    #[test]
    fn test_empty_vi_table() {
        let input = "[Model] m\nModel_type Input\n[Pullup]\n[End]\n";
        let err = parse_raw(input).unwrap_err();
        assert!(matches!(err, IbisError::EmptyTable { .. }));
    }

    #[test]
    fn test_unknown_model_keyword_is_rejected() {
        let input = "[Model] m\nModel_type Input\nRgnd 50\n[End]\n";
        let err = parse_raw(input).unwrap_err();
        assert!(err.to_string().contains("Rgnd 50"));
    }

    #[test]
    fn test_failed_characterization_keeps_parsing() {
        let input = "\
[Model] drv
Model_type Output
[Pulldown]
-3.3 -82.5m
3.3 82.5m
[Pullup]
-3.3 73.3m
3.3 -73.3m
[Model] rcv
Model_type Input
[End]
";
        // No [Voltage Range], so no bench can be built
        let ibis = Ibis::parse(input).unwrap();
        let drv = ibis.model("drv").unwrap();
        assert!(!drv.is_characterized());
        assert!(drv.k_strategy.is_none());
        assert!(ibis.model("rcv").is_ok());
    }

    #[test]
    fn test_drivers_are_characterized_while_parsing() {
        let ibis = Ibis::parse(DEMO).unwrap();
        let drv = ibis.model("drv_wave").unwrap();
        assert!(drv.is_characterized());
        let strategy = drv.k_strategy.as_ref().unwrap();
        assert_eq!(strategy.rising, crate::ibis::Strategy::DoubleWaveform);
        assert!(!ibis.model("rcv").unwrap().is_characterized());
    }
}

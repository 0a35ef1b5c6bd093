//! `[Model]` and `[Model Selector]` entities.

use std::collections::BTreeMap;
use std::fmt;

use super::types::{ByDirection, Direction, RangeValue, Speed, Table, TypMinMax};

/// The `Model_type` of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelType {
    Input,
    Output,
    ThreeState,
    Io,
    OpenDrain,
    OpenSink,
    OpenSource,
    Terminator,
    InputEcl,
    OutputEcl,
    IoEcl,
    ThreeStateEcl,
    /// Anything this crate has no buffer for, kept verbatim
    Unknown(String),
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::Unknown(String::new())
    }
}

impl ModelType {
    /// Read a `Model_type` value.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "input" => ModelType::Input,
            "output" => ModelType::Output,
            "3-state" | "3_state" | "three-state" => ModelType::ThreeState,
            "i/o" | "io" => ModelType::Io,
            "open_drain" => ModelType::OpenDrain,
            "open_sink" => ModelType::OpenSink,
            "open_source" => ModelType::OpenSource,
            "terminator" => ModelType::Terminator,
            "input_ecl" => ModelType::InputEcl,
            "output_ecl" => ModelType::OutputEcl,
            "i/o_ecl" => ModelType::IoEcl,
            "3-state_ecl" => ModelType::ThreeStateEcl,
            _ => ModelType::Unknown(text.trim().to_string()),
        }
    }

    /// Output, 3-state and I/O buffers switch their pull networks.
    pub fn is_driver(&self) -> bool {
        matches!(self, ModelType::Output | ModelType::ThreeState | ModelType::Io)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelType::Input => "Input",
            ModelType::Output => "Output",
            ModelType::ThreeState => "3-state",
            ModelType::Io => "I/O",
            ModelType::OpenDrain => "Open_drain",
            ModelType::OpenSink => "Open_sink",
            ModelType::OpenSource => "Open_source",
            ModelType::Terminator => "Terminator",
            ModelType::InputEcl => "Input_ECL",
            ModelType::OutputEcl => "Output_ECL",
            ModelType::IoEcl => "I/O_ECL",
            ModelType::ThreeStateEcl => "3-state_ECL",
            ModelType::Unknown(text) => text,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A VI table: (voltage, current) samples per corner, sorted by voltage.
pub type VICurve = TypMinMax<Table>;

/// A `[Rising Waveform]` or `[Falling Waveform]` block.
///
/// `data` holds (time, voltage) samples per corner, measured at the pin
/// while it drives the fixture described by the other fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waveform {
    pub r_fixture: Option<f64>,
    pub c_fixture: Option<f64>,
    pub l_fixture: Option<f64>,
    pub v_fixture: Option<f64>,
    pub v_fixture_min: Option<f64>,
    pub v_fixture_max: Option<f64>,
    pub r_dut: Option<f64>,
    pub c_dut: Option<f64>,
    pub l_dut: Option<f64>,
    pub data: TypMinMax<Table>,
}

impl Waveform {
    /// Fixture voltage for a corner, falling back to `V_fixture`.
    pub fn v_fixture_at(&self, speed: Speed) -> Option<f64> {
        let corner = match speed {
            Speed::Typical => None,
            Speed::Minimum => self.v_fixture_min,
            Speed::Maximum => self.v_fixture_max,
        };
        corner.or(self.v_fixture)
    }
}

/// One edge of a `[Ramp]`: voltage swing over the 20%-80% time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slew {
    pub dv: RangeValue,
    pub dt: RangeValue,
}

/// Default `R_load` of a `[Ramp]` in ohms.
pub const DEFAULT_RAMP_LOAD: f64 = 50.0;

/// A `[Ramp]` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    pub rising: Option<Slew>,
    pub falling: Option<Slew>,
    pub r_load: f64,
}

impl Default for Ramp {
    fn default() -> Self {
        Self {
            rising: None,
            falling: None,
            r_load: DEFAULT_RAMP_LOAD,
        }
    }
}

impl Ramp {
    pub fn slew(&self, direction: Direction) -> Option<&Slew> {
        match direction {
            Direction::Rising => self.rising.as_ref(),
            Direction::Falling => self.falling.as_ref(),
        }
    }
}

/// Keys understood inside `[Model Spec]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecKey {
    Vinh,
    Vinl,
    VinhPlus,
    VinhMinus,
    VinlPlus,
    VinlMinus,
    SOvershootHigh,
    SOvershootLow,
    DOvershootHigh,
    DOvershootLow,
    DOvershootTime,
    PulseHigh,
    PulseLow,
    PulseTime,
    Vmeas,
    Vref,
    Cref,
    Rref,
    CrefRising,
    CrefFalling,
    RrefRising,
    RrefFalling,
    VrefRising,
    VrefFalling,
    VmeasRising,
    VmeasFalling,
    RrefDiff,
    CrefDiff,
}

/// A `[Model Spec]` block. Values are carried, never computed on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelSpec {
    pub values: BTreeMap<SpecKey, RangeValue>,
}

impl ModelSpec {
    pub fn get(&self, key: SpecKey) -> Option<&RangeValue> {
        self.values.get(&key)
    }
}

/// How the K-tables of one direction were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Two waveforms, solved as a 2x2 system per sample
    DoubleWaveform,
    /// One waveform; derived with the ramp equations
    SingleWaveform,
    /// `[Ramp]` data only
    Ramp,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::DoubleWaveform => write!(f, "double-waveform"),
            Strategy::SingleWaveform => write!(f, "single-waveform (ramp fallback)"),
            Strategy::Ramp => write!(f, "ramp"),
        }
    }
}

/// Time/multiplier tables for one pull network.
pub type KTables = ByDirection<TypMinMax<Table>>;

/// A `[Model]` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub name: String,
    pub model_type: ModelType,
    pub polarity: Option<String>,
    pub enable: Option<String>,
    pub vinl: Option<f64>,
    pub vinh: Option<f64>,
    pub vmeas: Option<f64>,
    pub cref: Option<f64>,
    pub rref: Option<f64>,
    pub vref: Option<f64>,
    pub c_comp: Option<RangeValue>,
    pub temperature_range: Option<RangeValue>,
    pub voltage_range: Option<RangeValue>,
    pub pullup_reference: Option<RangeValue>,
    pub pulldown_reference: Option<RangeValue>,
    pub power_clamp_reference: Option<RangeValue>,
    pub gnd_clamp_reference: Option<RangeValue>,
    pub gnd_clamp: Option<VICurve>,
    pub power_clamp: Option<VICurve>,
    pub pulldown: Option<VICurve>,
    pub pullup: Option<VICurve>,
    pub ramp: Option<Ramp>,
    pub model_spec: Option<ModelSpec>,
    pub rising_waveforms: Vec<Waveform>,
    pub falling_waveforms: Vec<Waveform>,
    /// Derived for driving models only
    pub pullup_k: Option<KTables>,
    pub pulldown_k: Option<KTables>,
    pub k_strategy: Option<ByDirection<Strategy>>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn waveforms(&self, direction: Direction) -> &[Waveform] {
        match direction {
            Direction::Rising => &self.rising_waveforms,
            Direction::Falling => &self.falling_waveforms,
        }
    }

    /// Rail voltage for a corner, if `[Voltage Range]` was given.
    pub fn vcc(&self, speed: Speed) -> Option<f64> {
        self.voltage_range.as_ref().map(|r| r[speed])
    }

    /// True once both pull networks have K-tables.
    pub fn is_characterized(&self) -> bool {
        self.pullup_k.is_some() && self.pulldown_k.is_some()
    }
}

/// A `[Model Selector]` block: (model name, description) in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelSelector {
    pub models: Vec<(String, String)>,
}

impl ModelSelector {
    /// The entry used when the caller does not pick one.
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_parse() {
        assert_eq!(ModelType::parse("Output"), ModelType::Output);
        assert_eq!(ModelType::parse("3-State"), ModelType::ThreeState);
        assert_eq!(ModelType::parse("I/O"), ModelType::Io);
        assert!(ModelType::parse("i/o").is_driver());
        assert!(!ModelType::parse("Input").is_driver());
        assert_eq!(
            ModelType::parse("Series_switch"),
            ModelType::Unknown("Series_switch".to_string())
        );
    }

    #[test]
    fn test_fixture_fallback() {
        let wave = Waveform {
            v_fixture: Some(0.0),
            v_fixture_max: Some(0.2),
            ..Default::default()
        };
        assert_eq!(wave.v_fixture_at(Speed::Typical), Some(0.0));
        assert_eq!(wave.v_fixture_at(Speed::Minimum), Some(0.0));
        assert_eq!(wave.v_fixture_at(Speed::Maximum), Some(0.2));
    }
}

//! Parse and characterization settings.

use crate::solver::SimulatorConfig;

/// Default divisor applied to the natural time step of a characterization run.
pub const DEFAULT_ACCURACY_DIVISOR: f64 = 10.0;

/// Settings for deriving driver K-tables.
#[derive(Debug, Clone)]
pub struct CharacterizationConfig {
    /// The natural step (half the ramp time, or the first waveform
    /// interval) is divided by this.
    pub accuracy_divisor: f64,
    /// Solver settings for the characterization circuits.
    pub simulator: SimulatorConfig,
}

impl Default for CharacterizationConfig {
    fn default() -> Self {
        Self {
            accuracy_divisor: DEFAULT_ACCURACY_DIVISOR,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl CharacterizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time step divisor. Larger values give finer tables.
    pub fn with_accuracy_divisor(mut self, divisor: f64) -> Self {
        self.accuracy_divisor = divisor;
        self
    }

    pub fn with_simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.simulator = simulator;
        self
    }
}

/// Settings for one parse.
#[derive(Debug, Clone)]
pub struct IbisConfig {
    /// Derive K-tables for driving models while parsing.
    pub characterize: bool,
    /// Component to select; the first one in the file when unset.
    pub device: Option<String>,
    pub characterization: CharacterizationConfig,
}

impl Default for IbisConfig {
    fn default() -> Self {
        Self {
            characterize: true,
            device: None,
            characterization: CharacterizationConfig::default(),
        }
    }
}

impl IbisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable K-table derivation.
    ///
    /// Tooling that only reads raw IBIS data can skip the simulations.
    pub fn with_characterize(mut self, characterize: bool) -> Self {
        self.characterize = characterize;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_characterization(mut self, characterization: CharacterizationConfig) -> Self {
        self.characterization = characterization;
        self
    }
}

//! The parsed IBIS model graph.
//!
//! An [`Ibis`] owns every entity read from one file: components with their
//! packages and pin tables, models with their VI and waveform data, and model
//! selectors. After parsing, driving models additionally carry the K-tables
//! derived by [`crate::driver`]. The graph is not modified afterwards except
//! for [`Ibis::select_device`].
//!
//! All map keys are lower-cased names; the lookup helpers lower-case their
//! argument, so queries are case-insensitive like IBIS keywords.

mod component;
mod model;
mod types;

pub use component::{Component, Package, Parasitics, Pin};
pub use model::{
    KTables, Model, ModelSelector, ModelSpec, ModelType, Ramp, Slew, SpecKey, Strategy, VICurve,
    Waveform, DEFAULT_RAMP_LOAD,
};
pub use types::{ByDirection, Direction, IoRole, RangeValue, Speed, Table, TypMinMax};

use std::path::Path;

use indexmap::IndexMap;

use crate::config::IbisConfig;
use crate::error::{IbisError, Result};

/// Root of a parsed IBIS file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ibis {
    pub ibis_ver: Option<String>,
    pub file_name: Option<String>,
    pub file_rev: Option<String>,
    pub date: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub disclaimer: Option<String>,
    pub copyright: Option<String>,
    pub components: IndexMap<String, Component>,
    pub models: IndexMap<String, Model>,
    pub model_selectors: IndexMap<String, ModelSelector>,
    /// Name of the currently selected component
    pub device: Option<String>,
}

impl Ibis {
    /// Parse IBIS text with the default configuration.
    pub fn parse(input: &str) -> Result<Self> {
        crate::parser::parse(input)
    }

    /// Parse IBIS text.
    pub fn parse_with(input: &str, config: &IbisConfig) -> Result<Self> {
        crate::parser::parse_with_config(input, config)
    }

    /// Read and parse an IBIS file.
    pub fn from_file(path: &Path, config: &IbisConfig) -> Result<Self> {
        crate::parser::parse_file(path, config)
    }

    /// Make `name` the current device.
    pub fn select_device(&mut self, name: &str) -> Result<()> {
        let key = name.to_lowercase();
        if !self.components.contains_key(&key) {
            return Err(IbisError::unknown("component", name));
        }
        self.device = Some(key);
        Ok(())
    }

    /// The currently selected component.
    pub fn component(&self) -> Result<&Component> {
        let name = self
            .device
            .as_deref()
            .ok_or_else(|| IbisError::unknown("component", "<none>"))?;
        self.components
            .get(name)
            .ok_or_else(|| IbisError::unknown("component", name))
    }

    /// Look up a pin of the current device.
    pub fn pin(&self, name: &str) -> Result<&Pin> {
        self.component()?
            .pin(name)
            .ok_or_else(|| IbisError::unknown("pin", name))
    }

    pub fn model(&self, name: &str) -> Result<&Model> {
        self.models
            .get(&name.to_lowercase())
            .ok_or_else(|| IbisError::unknown("model", name))
    }

    pub fn model_selector(&self, name: &str) -> Option<&ModelSelector> {
        self.model_selectors.get(&name.to_lowercase())
    }
}

//! # IBIS Core
//!
//! Reads IBIS buffer models and turns their pins into circuits.
//!
//! This library provides:
//! - A line-grammar parser for IBIS files into a typed model graph
//! - K-table derivation for driving buffers, from waveform or ramp data
//! - Pin equivalent circuits (buffer plus package) for a small MNA engine
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`parser`] - Line pattern dispatcher and section parsers
//! - [`ibis`] - The parsed model graph
//! - [`driver`] - K-table derivation for Output, 3-state and I/O models
//! - [`buffer`] - Pin equivalent circuits
//! - [`circuit`] - Circuit graph representation and validation
//! - [`components`] - Device models (R, L, C, sources, VI tables, behavioral)
//! - [`solver`] - MNA matrix assembly and transient analysis
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! ibis part.ibs summary
//! ibis part.ibs ktable --model drv --direction falling --speed max > k.csv
//! ibis part.ibs simulate --pin 12 --load 50 --tstop 5e-9 > v.csv
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use ibis_core::{Circuit, Ibis, PinOptions, Simulator, SubcktNamer};
//!
//! # fn main() -> ibis_core::Result<()> {
//! let ibis = Ibis::parse(&std::fs::read_to_string("part.ibs").unwrap())?;
//! let mut namer = SubcktNamer::new();
//! let pin = ibis.model_for("12", "pad", &PinOptions::new(), &mut namer)?;
//!
//! let mut circuit = Circuit::new("pin 12 into 50 ohm");
//! pin.attach(&mut circuit)?;
//! circuit.add_resistor("rload", "pad", "0", 50.0)?;
//! let trace = Simulator::new(circuit)?.tran(10e-12, 5e-9)?;
//! let v_pad = trace.voltage_array("pad")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## K-tables
//!
//! An IBIS driver publishes static pull networks and the waveforms they
//! produce, not how the networks switch. While parsing, every driving model
//! is characterized: the published waveforms (or a Gaussian edge built from
//! `[Ramp]`) are forced onto the buffer and behavioral sources solve for the
//! multipliers ku(t) and kd(t) that reproduce them. Set
//! [`IbisConfig::characterize`] to `false` to read raw data only.

pub mod buffer;
pub mod circuit;
pub mod components;
pub mod config;
pub mod driver;
pub mod error;
pub mod ibis;
pub mod parser;
pub mod solver;

// Re-export main types for convenience
pub use buffer::{PinModel, PinOptions, Role, SubcktNamer};
pub use circuit::Circuit;
pub use config::{CharacterizationConfig, IbisConfig};
pub use error::{IbisError, Result};
pub use ibis::{Direction, Ibis, IoRole, Model, Speed};
pub use solver::{Simulator, SimulatorConfig, Trace};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmIbis;

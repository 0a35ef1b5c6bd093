//! IBIS text parser.
//!
//! IBIS files are line oriented: comments start with `|`, sections open with
//! a bracketed keyword (`[Model] name`), and values are written as
//! `Keyword typ min max` rows. Keywords are case-insensitive.
//!
//! Each section is read by a [`builder::Builder`]: an ordered list of regex
//! rules, built once, whose handlers assign typed fields on the entity being
//! filled. A nested section (a `[Pin]` table inside a `[Component]`, a VI
//! table inside a `[Model]`) runs its own builder on the same line stream and
//! stops at the first line it does not own, pushing that line back so the
//! parent reads it next. Only the top level rejects lines it does not
//! recognize.
//!
//! # Example
//!
//! ```text
//! [IBIS Ver]   3.2
//! [Component]  DEMO
//! [Manufacturer] Example Corp.
//! [Package]
//! R_pkg   0.2     0.1     0.3
//! [Pin]  signal_name  model_name  R_pin  L_pin  C_pin
//! 1      DQ0          drv         NA     NA     NA
//! [Model]      drv
//! Model_type   Output
//! C_comp       2.0pF   1.8pF   2.2pF
//! ...
//! [End]
//! ```

pub(crate) mod builder;
pub(crate) mod lines;
mod model;
mod sections;
mod units;

pub use units::parse_value;

use std::path::Path;

use crate::config::IbisConfig;
use crate::error::{IbisError, Result};
use crate::ibis::Ibis;

use lines::LineSource;

/// Line stream and settings shared by all sections of one parse.
pub(crate) struct Parser<'a, 'c> {
    pub(crate) lines: LineSource<'a>,
    pub(crate) config: &'c IbisConfig,
}

impl Parser<'_, '_> {
    /// Error for a line whose rule and field do not fit together.
    pub(crate) fn unexpected(&self) -> IbisError {
        IbisError::grammar(self.lines.line_number(), self.lines.current())
    }
}

/// Parse IBIS text with the default configuration.
pub fn parse(input: &str) -> Result<Ibis> {
    parse_with_config(input, &IbisConfig::default())
}

/// Parse IBIS text.
pub fn parse_with_config(input: &str, config: &IbisConfig) -> Result<Ibis> {
    tracing::info!(bytes = input.len(), characterize = config.characterize, "parsing IBIS text");

    let mut parser = Parser {
        lines: LineSource::new(input),
        config,
    };
    let mut ibis = Ibis::default();
    sections::FILE.consume(&mut parser, &mut ibis)?;

    match &config.device {
        Some(device) => ibis.select_device(device)?,
        None => ibis.device = ibis.components.keys().next().cloned(),
    }

    tracing::info!(
        components = ibis.components.len(),
        models = ibis.models.len(),
        selectors = ibis.model_selectors.len(),
        device = ibis.device.as_deref().unwrap_or("<none>"),
        "parsed IBIS file"
    );
    Ok(ibis)
}

/// Read and parse an IBIS file.
pub fn parse_file(path: &Path, config: &IbisConfig) -> Result<Ibis> {
    let content = std::fs::read_to_string(path).map_err(|e| IbisError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_with_config(&content, config)
}

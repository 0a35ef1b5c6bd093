//! Pin equivalent circuits.
//!
//! [`Ibis::model_for`] turns one pin of the selected component into devices
//! for the circuit engine: the buffer at the die and the package between the
//! die and the caller's node.
//!
//! ```text
//!                     die        mid        pin
//!  buffer ------------ + --[L_pkg]-- + --[R_pkg]-- + ---- caller's node
//!                                                  |
//!                                               [C_pkg]
//!                                                  |
//!                                                 gnd
//! ```
//!
//! A receiver is C_comp and the clamps. A driver adds the pullup and
//! pulldown, switched by the K-tables for the requested edge and corner.

mod subckt;

pub use subckt::{Element, Instance, SubcktNamer};

use crate::circuit::Circuit;
use crate::driver::{power_referenced, pulldown_drive};
use crate::error::{IbisError, Result};
use crate::ibis::{Direction, Ibis, IoRole, Model, ModelType, Pin, Speed, Strategy};

/// What a pin model is asked to do.
#[derive(Debug, Clone, Default)]
pub struct PinOptions {
    pub speed: Speed,
    pub direction: Direction,
    /// Only consulted for I/O buffers
    pub io_role: IoRole,
    /// Overrides the pin's model or model selector
    pub model_name: Option<String>,
}

impl PinOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_io_role(mut self, io_role: IoRole) -> Self {
        self.io_role = io_role;
        self
    }

    pub fn with_model(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }
}

/// Buffer behavior at a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Receiver,
    Driver,
}

impl Role {
    fn of(model: &Model, io_role: IoRole) -> Result<Self> {
        match model.model_type {
            ModelType::Input => Ok(Role::Receiver),
            ModelType::Io if io_role == IoRole::Input => Ok(Role::Receiver),
            ModelType::Output | ModelType::ThreeState | ModelType::Io => Ok(Role::Driver),
            ref other => Err(IbisError::UnsupportedModelType {
                model: model.name.clone(),
                model_type: other.to_string(),
            }),
        }
    }
}

/// Equivalent circuit of one pin.
#[derive(Debug, Clone)]
pub struct PinModel {
    /// Pin name as asked for
    pub pin: String,
    /// Name of the model that was used
    pub model: String,
    pub role: Role,
    pub elements: Vec<Element>,
    /// Non-fatal problems met while assembling
    pub warnings: Vec<String>,
}

impl PinModel {
    /// Add every element to `circuit`.
    pub fn attach(&self, circuit: &mut Circuit) -> Result<()> {
        for element in &self.elements {
            element.attach(circuit)?;
        }
        Ok(())
    }
}

impl Ibis {
    /// Build the equivalent circuit of pin `pin` of the current device,
    /// terminated on `node`.
    pub fn model_for(
        &self,
        pin: &str,
        node: &str,
        options: &PinOptions,
        namer: &mut SubcktNamer,
    ) -> Result<PinModel> {
        let component = self.component()?;
        let row = self.pin(pin)?;
        let mut warnings = Vec::new();

        let model = self.resolve_model(pin, row, options, &mut warnings)?;
        let role = Role::of(model, options.io_role)?;
        tracing::debug!(pin, model = %model.name, ?role, speed = %options.speed, "assembling pin model");

        let inst = namer.instance();
        let die = inst.node("die");
        let mut elements = Vec::new();

        // Package, from the caller's node inwards
        let speed = options.speed;
        let parasitics = component.parasitics(row, speed);
        if let Some(c) = parasitics.c {
            elements.push(Element::Capacitor {
                name: inst.device("cpkg"),
                n1: node.to_string(),
                n2: "0".to_string(),
                value: c,
            });
        } else {
            warn(&mut warnings, pin, "no C_pkg on the pin or package; left out");
        }
        let mid = match parasitics.r {
            Some(r) => {
                let mid = inst.node("mid");
                elements.push(Element::Resistor {
                    name: inst.device("rpkg"),
                    n1: mid.clone(),
                    n2: node.to_string(),
                    value: r,
                });
                mid
            }
            None => {
                warn(&mut warnings, pin, "no R_pkg on the pin or package; shorted");
                node.to_string()
            }
        };
        let die = match parasitics.l {
            Some(l) => {
                elements.push(Element::Inductor {
                    name: inst.device("lpkg"),
                    n1: die.clone(),
                    n2: mid,
                    value: l,
                });
                die
            }
            None => {
                warn(&mut warnings, pin, "no L_pkg on the pin or package; shorted");
                mid
            }
        };

        // Buffer at the die
        let vcc = inst.node("vcc");
        let supply = model.vcc(speed);
        if let Some(v) = supply {
            elements.push(Element::VoltageSource {
                name: inst.device("vcc"),
                n1: vcc.clone(),
                n2: "0".to_string(),
                value: v,
            });
        }
        if let Some(c_comp) = &model.c_comp {
            elements.push(Element::Capacitor {
                name: inst.device("ccomp"),
                n1: die.clone(),
                n2: "0".to_string(),
                value: c_comp[speed],
            });
        }
        if let Some(clamp) = &model.gnd_clamp {
            elements.push(Element::Vi {
                name: inst.device("gndclamp"),
                n1: die.clone(),
                n2: "0".to_string(),
                table: clamp[speed].clone(),
                multiplier: None,
            });
        }
        if let Some(clamp) = &model.power_clamp {
            if supply.is_some() {
                elements.push(Element::Vi {
                    name: inst.device("powerclamp"),
                    n1: vcc.clone(),
                    n2: die.clone(),
                    table: power_referenced(&clamp[speed]),
                    multiplier: None,
                });
            } else {
                warn(&mut warnings, pin, "[POWER Clamp] without [Voltage Range]; left out");
            }
        }

        if role == Role::Driver {
            let (Some(pullup_k), Some(pulldown_k)) = (&model.pullup_k, &model.pulldown_k) else {
                return Err(IbisError::Uncharacterized {
                    model: model.name.clone(),
                });
            };
            let (Some(pullup), Some(pulldown)) = (&model.pullup, &model.pulldown) else {
                return Err(IbisError::Uncharacterized {
                    model: model.name.clone(),
                });
            };
            if supply.is_none() {
                return Err(IbisError::characterization(&model.name, "no [Voltage Range]"));
            }
            let direction = options.direction;
            let strategy = model
                .k_strategy
                .as_ref()
                .map_or(Strategy::DoubleWaveform, |k| k[direction]);
            elements.push(Element::Vi {
                name: inst.device("pullup"),
                n1: vcc,
                n2: die.clone(),
                table: power_referenced(&pullup[speed]),
                multiplier: Some(pullup_k[direction][speed].clone()),
            });
            elements.push(Element::Vi {
                name: inst.device("pulldown"),
                n1: die,
                n2: "0".to_string(),
                table: pulldown[speed].clone(),
                multiplier: Some(pulldown_drive(&pulldown_k[direction][speed], strategy)),
            });
        }

        Ok(PinModel {
            pin: pin.to_string(),
            model: model.name.clone(),
            role,
            elements,
            warnings,
        })
    }

    /// The model behind a pin: the caller's choice, else the pin's model, else
    /// the first entry of the pin's model selector.
    fn resolve_model(
        &self,
        pin: &str,
        row: &Pin,
        options: &PinOptions,
        warnings: &mut Vec<String>,
    ) -> Result<&Model> {
        if let Some(name) = &options.model_name {
            return self.model(name);
        }
        let Some(selector) = self.model_selector(&row.model) else {
            return self.model(&row.model);
        };
        let chosen = selector
            .default_model()
            .ok_or_else(|| IbisError::unknown("model selector", &row.model))?;
        let alternatives = selector
            .models
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        warn(
            warnings,
            pin,
            &format!(
                "model selector '{}' has no choice; using '{chosen}' of [{alternatives}]",
                row.model
            ),
        );
        self.model(chosen)
    }
}

fn warn(warnings: &mut Vec<String>, pin: &str, message: &str) {
    tracing::warn!(pin, "{message}");
    warnings.push(format!("pin {pin}: {message}"));
}

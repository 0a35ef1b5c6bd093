//! `[Component]` entities: package parasitics and the pin table.

use indexmap::IndexMap;

use super::types::{RangeValue, Speed};

/// `[Package]` parasitics. Keywords left out of the file stay `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    pub r_pkg: Option<RangeValue>,
    pub l_pkg: Option<RangeValue>,
    pub c_pkg: Option<RangeValue>,
}

/// One row of a `[Pin]` table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pin {
    pub signal: String,
    /// Model or model selector name, lower-cased
    pub model: String,
    pub r: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
}

/// Pin parasitics after falling back to the component package.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Parasitics {
    pub r: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Component {
    pub manufacturer: Option<String>,
    pub si_location: Option<String>,
    pub timing_location: Option<String>,
    pub package: Package,
    /// Keyed by lower-cased pin name, in file order
    pub pins: IndexMap<String, Pin>,
}

impl Component {
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.pins.get(&name.to_lowercase())
    }

    /// R/L/C of a pin, taking the package value at `speed` for any the pin
    /// row leaves blank.
    pub fn parasitics(&self, pin: &Pin, speed: Speed) -> Parasitics {
        let package = |value: &Option<RangeValue>| value.as_ref().map(|r| r[speed]);
        Parasitics {
            r: pin.r.or_else(|| package(&self.package.r_pkg)),
            l: pin.l.or_else(|| package(&self.package.l_pkg)),
            c: pin.c.or_else(|| package(&self.package.c_pkg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parasitics_fall_back_per_value() {
        let component = Component {
            package: Package {
                r_pkg: Some(RangeValue::new(0.2, 0.1, 0.3)),
                l_pkg: Some(RangeValue::new(5e-9, 4e-9, 6e-9)),
                c_pkg: None,
            },
            ..Default::default()
        };
        let pin = Pin {
            signal: "D0".to_string(),
            model: "drv".to_string(),
            l: Some(1e-9),
            ..Default::default()
        };

        let p = component.parasitics(&pin, Speed::Maximum);
        assert_eq!(p.r, Some(0.3));
        assert_eq!(p.l, Some(1e-9));
        assert_eq!(p.c, None);
    }
}

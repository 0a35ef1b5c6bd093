//! Top-level, `[Component]`, `[Package]`, `[Pin]` and `[Model Selector]` sections.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::builder::{
    capture, label, labeled, named, range, Builder, Event, Handler, Section, ANY, BOUNDARY, TAIL,
};
use super::model::read_model;
use super::units::parse_value;
use super::Parser;
use crate::error::{IbisError, Result};
use crate::ibis::{Component, Ibis, ModelSelector, Package, Pin};

#[derive(Debug, Clone, Copy)]
pub(crate) enum FileField {
    IbisVer,
    CommentChar,
    FileName,
    FileRev,
    Date,
    Source,
    Notes,
    Disclaimer,
    Copyright,
    Component,
    ModelSelector,
    Model,
}

pub(super) static FILE: Lazy<Builder<FileField>> = Lazy::new(|| {
    Builder::new()
        .rule(&labeled("ibis[ _]ver"), Handler::Named(FileField::IbisVer))
        .rule(&labeled("comment[ _]char"), Handler::Named(FileField::CommentChar))
        .rule(&labeled("file[ _]name"), Handler::Named(FileField::FileName))
        .rule(&labeled("file[ _]rev"), Handler::Named(FileField::FileRev))
        .rule(&labeled("date"), Handler::Named(FileField::Date))
        .rule(&labeled("source"), Handler::Block(FileField::Source))
        .rule(&labeled("notes"), Handler::Block(FileField::Notes))
        .rule(&labeled("disclaimer"), Handler::Block(FileField::Disclaimer))
        .rule(&labeled("copyright"), Handler::Block(FileField::Copyright))
        .rule(&labeled("component"), Handler::Multi(FileField::Component))
        .rule(&labeled("model[ _]selector"), Handler::Multi(FileField::ModelSelector))
        .rule(&labeled("model"), Handler::Multi(FileField::Model))
        .rule(&label("end"), Handler::Done)
        .rule(ANY, Handler::Fail)
});

/// Insert under a lower-cased key; a repeated name replaces the earlier
/// entity in place.
fn insert_keyed<T>(map: &mut IndexMap<String, T>, kind: &str, name: &str, value: T) {
    if map.insert(name.to_lowercase(), value).is_some() {
        tracing::debug!(kind, name, "duplicate name replaces the earlier definition");
    }
}

impl Section for Ibis {
    type Field = FileField;

    fn apply(&mut self, field: FileField, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        match (field, event) {
            (FileField::IbisVer, Event::Text(text)) => self.ibis_ver = Some(text.to_string()),
            (FileField::CommentChar, Event::Text(text)) => {
                // `|_char` is consumed as a trailing comment and leaves nothing
                if !text.is_empty() {
                    return Err(IbisError::UnsupportedCommentChar {
                        line_number: parser.lines.line_number(),
                        comment_char: text.to_string(),
                    });
                }
            }
            (FileField::FileName, Event::Text(text)) => self.file_name = Some(text.to_string()),
            (FileField::FileRev, Event::Text(text)) => self.file_rev = Some(text.to_string()),
            (FileField::Date, Event::Text(text)) => self.date = Some(text.to_string()),
            (FileField::Source, Event::Text(text)) => self.source = Some(text.to_string()),
            (FileField::Notes, Event::Text(text)) => self.notes = Some(text.to_string()),
            (FileField::Disclaimer, Event::Text(text)) => self.disclaimer = Some(text.to_string()),
            (FileField::Copyright, Event::Text(text)) => self.copyright = Some(text.to_string()),
            (FileField::Component, Event::Open(name)) => {
                tracing::debug!(component = name, "reading [Component]");
                let mut component = Component::default();
                COMPONENT.consume(parser, &mut component)?;
                insert_keyed(&mut self.components, "component", name, component);
            }
            (FileField::ModelSelector, Event::Open(name)) => {
                tracing::debug!(selector = name, "reading [Model Selector]");
                let mut selector = ModelSelector::default();
                MODEL_SELECTOR.consume(parser, &mut selector)?;
                insert_keyed(&mut self.model_selectors, "model selector", name, selector);
            }
            (FileField::Model, Event::Open(name)) => {
                let model = read_model(parser, name)?;
                insert_keyed(&mut self.models, "model", name, model);
            }
            _ => return Err(parser.unexpected()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ComponentField {
    SiLocation,
    TimingLocation,
    Manufacturer,
    Package,
    Pin,
}

static COMPONENT: Lazy<Builder<ComponentField>> = Lazy::new(|| {
    Builder::new()
        .rule(&named("si[ _]location"), Handler::Named(ComponentField::SiLocation))
        .rule(&named("timing[ _]location"), Handler::Named(ComponentField::TimingLocation))
        .rule(&labeled("manufacturer"), Handler::Named(ComponentField::Manufacturer))
        .rule(&label("package"), Handler::Single(ComponentField::Package))
        .rule(&label("pin"), Handler::Single(ComponentField::Pin))
        .rule(ANY, Handler::Done)
});

impl Section for Component {
    type Field = ComponentField;

    fn apply(
        &mut self,
        field: ComponentField,
        event: Event<'_>,
        parser: &mut Parser<'_, '_>,
    ) -> Result<()> {
        match (field, event) {
            (ComponentField::SiLocation, Event::Text(text)) => {
                self.si_location = Some(text.to_string())
            }
            (ComponentField::TimingLocation, Event::Text(text)) => {
                self.timing_location = Some(text.to_string())
            }
            (ComponentField::Manufacturer, Event::Text(text)) => {
                self.manufacturer = Some(text.to_string())
            }
            (ComponentField::Package, Event::Open(_)) => {
                let mut package = Package::default();
                PACKAGE.consume(parser, &mut package)?;
                self.package = package;
            }
            (ComponentField::Pin, Event::Open(_)) => {
                let mut pins = IndexMap::new();
                PIN_TABLE.consume(parser, &mut pins)?;
                self.pins = pins;
            }
            _ => return Err(parser.unexpected()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PackageField {
    R,
    L,
    C,
}

static PACKAGE: Lazy<Builder<PackageField>> = Lazy::new(|| {
    Builder::new()
        .rule(&range("r[ _]pkg"), Handler::Range(PackageField::R))
        .rule(&range("l[ _]pkg"), Handler::Range(PackageField::L))
        .rule(&range("c[ _]pkg"), Handler::Range(PackageField::C))
        .rule(ANY, Handler::Done)
});

impl Section for Package {
    type Field = PackageField;

    fn apply(&mut self, field: PackageField, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        let Event::Range(value) = event else {
            return Err(parser.unexpected());
        };
        match field {
            PackageField::R => self.r_pkg = Some(value),
            PackageField::L => self.l_pkg = Some(value),
            PackageField::C => self.c_pkg = Some(value),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PinRow;

static PIN_TABLE: Lazy<Builder<PinRow>> = Lazy::new(|| {
    let row = format!(
        r"^\s*(?P<pin>[^\s|\[]+)\s+(?P<signal>[^\s|]+)\s+(?P<model>[^\s|]+)(?:\s+(?P<r>[^\s|]+))?(?:\s+(?P<l>[^\s|]+))?(?:\s+(?P<c>[^\s|]+))?{TAIL}"
    );
    Builder::new()
        .rule(BOUNDARY, Handler::Done)
        .rule(&row, Handler::Row(PinRow))
        .rule(ANY, Handler::Done)
});

impl Section for IndexMap<String, Pin> {
    type Field = PinRow;

    fn apply(&mut self, _: PinRow, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        let Event::Row(row) = event else {
            return Err(parser.unexpected());
        };
        let pin = Pin {
            signal: capture(row, "signal").to_string(),
            model: capture(row, "model").to_lowercase(),
            r: parse_value(capture(row, "r")),
            l: parse_value(capture(row, "l")),
            c: parse_value(capture(row, "c")),
        };
        insert_keyed(self, "pin", capture(row, "pin"), pin);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SelectorRow;

static MODEL_SELECTOR: Lazy<Builder<SelectorRow>> = Lazy::new(|| {
    let row = format!(r"^\s*(?P<model>[^\s|\[]+)(?:\s+(?P<description>.*?))?{TAIL}");
    Builder::new()
        .rule(BOUNDARY, Handler::Done)
        .rule(&row, Handler::Row(SelectorRow))
        .rule(ANY, Handler::Done)
});

impl Section for ModelSelector {
    type Field = SelectorRow;

    fn apply(&mut self, _: SelectorRow, event: Event<'_>, parser: &mut Parser<'_, '_>) -> Result<()> {
        let Event::Row(row) = event else {
            return Err(parser.unexpected());
        };
        self.models.push((
            capture(row, "model").to_lowercase(),
            capture(row, "description").to_string(),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::IbisConfig;
    use crate::error::IbisError;
    use crate::ibis::{Ibis, RangeValue, Speed};

    fn parse_raw(input: &str) -> crate::error::Result<Ibis> {
        Ibis::parse_with(input, &IbisConfig::new().with_characterize(false))
    }

    const HEADER: &str = "\
[IBIS Ver]      3.2
[Comment Char]  |_char
[File Name]     demo.ibs
[File Rev]      1.0
[Date]          October 2026
[Source]        From silicon
                measurements.
[Notes]
Line one
Line two
[Copyright]     Example Corp.
";

    #[test]
    fn test_header_fields_and_blocks() {
        let ibis = parse_raw(&format!("{HEADER}[End]\n")).unwrap();
        assert_eq!(ibis.ibis_ver.as_deref(), Some("3.2"));
        assert_eq!(ibis.file_name.as_deref(), Some("demo.ibs"));
        assert_eq!(ibis.date.as_deref(), Some("October 2026"));
        assert_eq!(ibis.source.as_deref(), Some("From silicon\n                measurements."));
        assert_eq!(ibis.notes.as_deref(), Some("Line one\nLine two"));
        assert_eq!(ibis.copyright.as_deref(), Some("Example Corp."));
        assert!(ibis.device.is_none());
    }

    #[test]
    fn test_unknown_top_level_line() {
        let err = parse_raw("[IBIS Ver] 3.2\nFoo Bar 123\n").unwrap_err();
        match err {
            IbisError::Grammar { line_number, line } => {
                assert_eq!(line_number, 2);
                assert!(line.contains("Foo Bar 123"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse_raw("Foo Bar 123")
            .unwrap_err()
            .to_string()
            .contains("Foo Bar 123"));
    }

    #[test]
    fn test_other_comment_char_rejected() {
        let err = parse_raw("[Comment Char] #_char\n").unwrap_err();
        assert!(matches!(err, IbisError::UnsupportedCommentChar { .. }));
    }

    #[test]
    fn test_component_package_and_pins() {
        let input = "\
[Component]     Demo_Chip
[Manufacturer]  Example Corp.
Si_location     Die
[Package]
| variable   typ     min     max
R_pkg        0.25    0.2     0.3
L_pkg        4nH     NA      5nH
C_pkg        0.5pF
[Pin]  signal_name   model_name   R_pin   L_pin   C_pin
1      DQ0           DRV_A        0.3     2nH     0.4pF
2      DQ1           drv_sel
3      GND           GND          NA      NA      NA   | ground
[End]
";
        let ibis = parse_raw(input).unwrap();
        assert_eq!(ibis.device.as_deref(), Some("demo_chip"));

        let component = ibis.component().unwrap();
        assert_eq!(component.manufacturer.as_deref(), Some("Example Corp."));
        assert_eq!(component.si_location.as_deref(), Some("Die"));

        let package = &component.package;
        assert_eq!(package.r_pkg, Some(RangeValue::new(0.25, 0.2, 0.3)));
        let l_pkg = package.l_pkg.as_ref().unwrap();
        assert_eq!(l_pkg.min, l_pkg.typ);
        let c_pkg = package.c_pkg.as_ref().unwrap();
        assert_eq!(c_pkg.min, c_pkg.typ);
        assert_eq!(c_pkg.max, c_pkg.typ);

        assert_eq!(component.pins.len(), 3);
        let pin = ibis.pin("1").unwrap();
        assert_eq!(pin.signal, "DQ0");
        assert_eq!(pin.model, "drv_a");
        assert_eq!(pin.r, Some(0.3));

        let bare = ibis.pin("2").unwrap();
        assert_eq!((bare.r, bare.l, bare.c), (None, None, None));
        let p = component.parasitics(bare, Speed::Typical);
        assert_eq!(p.r, Some(0.25));
        assert_eq!(p.c, Some(c_pkg.typ));

        let gnd = ibis.pin("3").unwrap();
        assert_eq!(gnd.r, None);
    }

    #[test]
    fn test_model_selector_rows() {
        let input = "\
[Model Selector]  DRV_SEL
DRV_A    Full strength driver
DRV_B    Half strength | weak
[End]
";
        let ibis = parse_raw(input).unwrap();
        let selector = ibis.model_selector("drv_sel").unwrap();
        assert_eq!(
            selector.models,
            vec![
                ("drv_a".to_string(), "Full strength driver".to_string()),
                ("drv_b".to_string(), "Half strength".to_string()),
            ]
        );
    }

    #[test]
    fn test_device_selection() {
        let input = "[Component] First\n[Component] Second\n[End]\n";
        let ibis = parse_raw(input).unwrap();
        assert_eq!(ibis.device.as_deref(), Some("first"));

        let config = IbisConfig::new().with_characterize(false).with_device("SECOND");
        let ibis = Ibis::parse_with(input, &config).unwrap();
        assert_eq!(ibis.device.as_deref(), Some("second"));

        let config = IbisConfig::new().with_characterize(false).with_device("third");
        let err = Ibis::parse_with(input, &config).unwrap_err();
        assert!(matches!(err, IbisError::UnknownDevice { kind: "component", .. }));
    }

    #[test]
    fn test_duplicate_component_replaces_in_place() {
        let input = "\
[Component] A
[Manufacturer] Old
[Component] B
[Component] a
[Manufacturer] New
[End]
";
        let ibis = parse_raw(input).unwrap();
        let names: Vec<&str> = ibis.components.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(ibis.components["a"].manufacturer.as_deref(), Some("New"));
    }
}

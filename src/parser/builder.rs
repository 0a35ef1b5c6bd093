//! Ordered pattern rules over a line stream.
//!
//! A [`Builder`] holds `(pattern, handler)` rules tried in registration order;
//! the first pattern that matches a line decides what happens to it. Handlers
//! are a closed set of kinds, each reading the capture groups its pattern
//! defines and handing the section an [`Event`]:
//!
//! | Handler  | Captures           | Event          |
//! |----------|--------------------|----------------|
//! | `Named`  | `name`             | `Text`         |
//! | `Value`  | `value`            | `Value`        |
//! | `Range`  | `typ`, `min`, `max`| `Range`        |
//! | `Block`  | `name` + following lines | `Text`   |
//! | `Single` | -                  | `Open("")`     |
//! | `Multi`  | `name`             | `Open(name)`   |
//! | `Row`    | section specific   | `Row`          |
//!
//! `Done` stops the section and pushes the line back for the parent, `Fail`
//! rejects the line, `Skip` ignores it. Every builder starts with a rule that
//! skips blank lines and comments.

use regex::{Captures, Regex, RegexBuilder};

use super::units::parse_value;
use super::Parser;
use crate::error::{IbisError, Result};
use crate::ibis::RangeValue;

/// Optional trailing comment and end of line.
pub(crate) const TAIL: &str = r"\s*(?:\|.*)?$";

/// Blank line or comment.
pub(crate) const COMMENT: &str = r"^\s*(?:\|.*)?$";

/// Start of the next bracketed keyword.
pub(crate) const BOUNDARY: &str = r"^\s*\[";

/// Matches every line.
pub(crate) const ANY: &str = r"^";

/// `key typ min max` with optional min/max, as used by every table.
pub(crate) const ROW: &str =
    r"^\s*(?P<key>[^\s|\[]+)\s+(?P<typ>[^\s|]+)(?:\s+(?P<min>[^\s|]+))?(?:\s+(?P<max>[^\s|]+))?\s*(?:\|.*)?$";

const TRIPLET: &str = r"(?P<typ>[^\s|]+)(?:\s+(?P<min>[^\s|]+))?(?:\s+(?P<max>[^\s|]+))?";

/// `Keyword free text`
pub(crate) fn named(key: &str) -> String {
    format!(r"^\s*(?:{key})(?:\s+(?P<name>.*?))?{TAIL}")
}

/// `Keyword value` or `Keyword = value`
pub(crate) fn value(key: &str) -> String {
    format!(r"^\s*(?:{key})(?:\s*=\s*|\s+)(?P<value>[^\s|]+){TAIL}")
}

/// `Keyword typ min max`
pub(crate) fn range(key: &str) -> String {
    format!(r"^\s*(?:{key})\s+{TRIPLET}{TAIL}")
}

/// `[Keyword] free text`
pub(crate) fn labeled(key: &str) -> String {
    format!(r"^\s*\[(?:{key})\](?:\s+(?P<name>.*?))?{TAIL}")
}

/// `[Keyword] typ min max`
pub(crate) fn labeled_range(key: &str) -> String {
    format!(r"^\s*\[(?:{key})\]\s+{TRIPLET}{TAIL}")
}

/// `[Keyword]`, ignoring the rest of the line
pub(crate) fn label(key: &str) -> String {
    format!(r"^\s*\[(?:{key})\]")
}

/// What a matching rule does with its line.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Handler<K> {
    Skip,
    Done,
    Fail,
    Named(K),
    Value(K),
    Range(K),
    Block(K),
    Single(K),
    Multi(K),
    Row(K),
}

/// Data handed to a section for one matched line.
#[derive(Debug)]
pub(crate) enum Event<'l> {
    Text(&'l str),
    Value(Option<f64>),
    Range(RangeValue),
    Open(&'l str),
    Row(&'l Captures<'l>),
}

/// An entity filled in by a builder.
pub(crate) trait Section {
    type Field: Copy;

    fn apply(
        &mut self,
        field: Self::Field,
        event: Event<'_>,
        parser: &mut Parser<'_, '_>,
    ) -> Result<()>;
}

struct Rule<K> {
    pattern: Regex,
    handler: Handler<K>,
}

pub(crate) struct Builder<K> {
    rules: Vec<Rule<K>>,
}

impl<K: Copy> Builder<K> {
    pub(crate) fn new() -> Self {
        Self { rules: Vec::new() }.rule(COMMENT, Handler::Skip)
    }

    /// Append a rule. Patterns are matched case-insensitively.
    pub(crate) fn rule(mut self, pattern: &str, handler: Handler<K>) -> Self {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("rule pattern must compile");
        self.rules.push(Rule { pattern, handler });
        self
    }

    fn dispatch<'h>(&self, line: &'h str) -> Option<(Handler<K>, Captures<'h>)> {
        self.rules.iter().find_map(|rule| {
            rule.pattern
                .captures(line)
                .map(|captures| (rule.handler, captures))
        })
    }

    /// Feed lines to `section` until a `Done` rule fires or input ends.
    pub(crate) fn consume<S>(&self, parser: &mut Parser<'_, '_>, section: &mut S) -> Result<()>
    where
        S: Section<Field = K>,
    {
        while let Some(line) = parser.lines.next_line() {
            let line_number = parser.lines.line_number();
            let (handler, captures) = self
                .dispatch(line)
                .ok_or_else(|| IbisError::grammar(line_number, line))?;

            match handler {
                Handler::Skip => {}
                Handler::Done => {
                    parser.lines.push_back();
                    return Ok(());
                }
                Handler::Fail => return Err(IbisError::grammar(line_number, line)),
                Handler::Named(field) => {
                    section.apply(field, Event::Text(capture(&captures, "name")), parser)?
                }
                Handler::Value(field) => {
                    let value = parse_value(capture(&captures, "value"));
                    section.apply(field, Event::Value(value), parser)?
                }
                Handler::Range(field) => {
                    let range = range_value(&captures, line_number)?;
                    section.apply(field, Event::Range(range), parser)?
                }
                Handler::Block(field) => {
                    let text = read_block(capture(&captures, "name"), parser);
                    section.apply(field, Event::Text(&text), parser)?
                }
                Handler::Single(field) => section.apply(field, Event::Open(""), parser)?,
                Handler::Multi(field) => {
                    section.apply(field, Event::Open(capture(&captures, "name")), parser)?
                }
                Handler::Row(field) => section.apply(field, Event::Row(&captures), parser)?,
            }
        }
        Ok(())
    }
}

/// Text of a named group, empty when the group did not take part.
pub(crate) fn capture<'h>(captures: &Captures<'h>, name: &str) -> &'h str {
    captures.name(name).map_or("", |m| m.as_str())
}

/// Read `typ min max` groups, copying typ into absent or `NA` columns.
pub(crate) fn range_value(captures: &Captures<'_>, line_number: usize) -> Result<RangeValue> {
    let typ_token = capture(captures, "typ");
    let typ = parse_value(typ_token).ok_or_else(|| IbisError::InvalidNumber {
        line_number,
        token: typ_token.to_string(),
    })?;
    Ok(RangeValue::fill(
        typ,
        parse_value(capture(captures, "min")),
        parse_value(capture(captures, "max")),
    ))
}

/// Collect free text up to the next bracketed keyword.
fn read_block(first: &str, parser: &mut Parser<'_, '_>) -> String {
    let mut lines: Vec<&str> = Vec::new();
    if !first.is_empty() {
        lines.push(first);
    }
    while let Some(line) = parser.lines.next_line() {
        if line.trim_start().starts_with('[') {
            parser.lines.push_back();
            break;
        }
        lines.push(line.trim_end());
    }
    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IbisConfig;
    use crate::parser::lines::LineSource;

    #[derive(Debug, Clone, Copy)]
    enum Field {
        Name,
        Gain,
        Span,
        Text,
    }

    #[derive(Default)]
    struct Probe {
        name: Option<String>,
        gain: Option<f64>,
        span: Option<RangeValue>,
        text: Option<String>,
    }

    impl Section for Probe {
        type Field = Field;

        fn apply(&mut self, field: Field, event: Event<'_>, _: &mut Parser<'_, '_>) -> Result<()> {
            match (field, event) {
                (Field::Name, Event::Text(t)) => self.name = Some(t.to_string()),
                (Field::Gain, Event::Value(v)) => self.gain = v,
                (Field::Span, Event::Range(r)) => self.span = Some(r),
                (Field::Text, Event::Text(t)) => self.text = Some(t.to_string()),
                _ => unreachable!(),
            }
            Ok(())
        }
    }

    fn rules() -> Builder<Field> {
        Builder::new()
            .rule(&named("name"), Handler::Named(Field::Name))
            .rule(&value("gain"), Handler::Value(Field::Gain))
            .rule(&range("span"), Handler::Range(Field::Span))
            .rule(&labeled("text"), Handler::Block(Field::Text))
            .rule(ANY, Handler::Done)
    }

    fn run(input: &str) -> (Probe, Option<String>) {
        let config = IbisConfig::default();
        let mut parser = Parser {
            lines: LineSource::new(input),
            config: &config,
        };
        let mut probe = Probe::default();
        rules().consume(&mut parser, &mut probe).unwrap();
        let rest = parser.lines.next_line().map(str::to_string);
        (probe, rest)
    }

    #[test]
    fn test_fields_and_pushback() {
        let (probe, rest) = run("| header\n\nNAME  Buffer One | trailing\ngain = 2.5m\nspan 1 NA 3\nother line\n");
        assert_eq!(probe.name.as_deref(), Some("Buffer One"));
        approx::assert_relative_eq!(probe.gain.unwrap(), 2.5e-3);
        assert_eq!(probe.span, Some(RangeValue::new(1.0, 1.0, 3.0)));
        assert_eq!(rest.as_deref(), Some("other line"));
    }

    #[test]
    fn test_block_accumulates_until_label() {
        let (probe, rest) = run("[Text] first\n  second\nthird\n[Next]\n");
        assert_eq!(probe.text.as_deref(), Some("first\n  second\nthird"));
        assert_eq!(rest.as_deref(), Some("[Next]"));
    }

    #[test]
    fn test_unparsable_typ_is_an_error() {
        let config = IbisConfig::default();
        let mut parser = Parser {
            lines: LineSource::new("span abc 1 2"),
            config: &config,
        };
        let mut probe = Probe::default();
        let err = rules().consume(&mut parser, &mut probe).unwrap_err();
        assert!(matches!(err, IbisError::InvalidNumber { line_number: 1, .. }));
    }

    #[test]
    fn test_unmatched_line_is_grammar_error() {
        let config = IbisConfig::default();
        let mut parser = Parser {
            lines: LineSource::new("| ok\nnothing matches"),
            config: &config,
        };
        let builder = Builder::<Field>::new().rule(&named("name"), Handler::Named(Field::Name));
        let err = builder.consume(&mut parser, &mut Probe::default()).unwrap_err();
        match err {
            IbisError::Grammar { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "nothing matches");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

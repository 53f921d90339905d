// Copyright 2025 Cornell University
// released under MIT License

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use log::{info, warn};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::LoadError;
use crate::ir::{HarnessBuilder, HarnessSpec};

/// Key holding the wait code inside a test case object.
pub const WAIT_KEY: &str = "_wait";

/// Layout of a JSON test case document.
#[derive(Debug, Deserialize)]
struct TestCaseFile {
    library: String,
    entity: String,
    architecture: String,
    #[serde(default)]
    clocked: bool,
    clock_pin: Option<String>,
    clock_period: Option<i64>,
    #[serde(default)]
    generic_params: IndexMap<String, Value>,
    input_pins: PinDecls,
    output_pins: PinDecls,
    test_cases: Vec<IndexMap<String, Value>>,
}

/// Pin name to optional width, in document order. A repeated name keeps its
/// first position and its last width.
#[derive(Debug)]
struct PinDecls(IndexMap<String, Option<i64>>);

impl<'de> Deserialize<'de> for PinDecls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PinDeclsVisitor)
    }
}

struct PinDeclsVisitor;

impl<'de> Visitor<'de> for PinDeclsVisitor {
    type Value = PinDecls;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map from pin names to widths")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PinDecls, A::Error> {
        let mut pins = IndexMap::new();
        while let Some((name, width)) = map.next_entry::<String, Option<i64>>()? {
            if let Some(previous) = pins.insert(name.clone(), width) {
                warn!("pin `{name}` is declared more than once, width {previous:?} is replaced by {width:?}");
            }
        }
        Ok(PinDecls(pins))
    }
}

pub fn parse_json_file(filepath: impl AsRef<Path>) -> Result<HarnessSpec, LoadError> {
    let path = filepath.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loading JSON test cases from {}", path.display());
    parse_json_str(&input)
}

pub fn parse_json_str(input: &str) -> Result<HarnessSpec, LoadError> {
    let file: TestCaseFile = serde_json::from_str(input)?;
    let mut builder = HarnessBuilder::new(file.library, file.entity, file.architecture);

    for (name, width) in file.input_pins.0 {
        builder.input(name, width);
    }
    if file.clocked {
        let pin = file.clock_pin.ok_or(LoadError::MissingField("clock_pin"))?;
        let period = file
            .clock_period
            .ok_or(LoadError::MissingField("clock_period"))?;
        builder.clock(pin, period);
    }
    for (name, width) in file.output_pins.0 {
        builder.output(name, width);
    }

    for (name, value) in file.generic_params {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(LoadError::InvalidGeneric {
                    name,
                    value: other.to_string(),
                })
            }
        };
        builder.generic(name, value);
    }

    for (index, mut case) in file.test_cases.into_iter().enumerate() {
        let wait = match case.shift_remove(WAIT_KEY) {
            None => 0,
            Some(value) => value
                .as_i64()
                .and_then(|w| i32::try_from(w).ok())
                .ok_or_else(|| LoadError::InvalidWait {
                    index,
                    value: value.to_string(),
                })?,
        };
        let mut values = Vec::with_capacity(case.len());
        for (pin, value) in case {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(LoadError::InvalidValue {
                        index,
                        pin,
                        value: other.to_string(),
                    })
                }
            };
            values.push((pin, value));
        }
        builder.vector(values, wait);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{PinKind, WaitDirective};

    const COUNTER: &str = r#"{
        "library": "work",
        "entity": "counter",
        "architecture": "rtl",
        "clocked": true,
        "clock_pin": "clk",
        "clock_period": 20,
        "generic_params": { "WIDTH": 4, "SIGNED": false, "INIT": "\"0000\"" },
        "input_pins": { "rst": null, "en": null },
        "output_pins": { "count": 4 },
        "test_cases": [
            { "rst": "1", "en": "0", "count": "0000", "_wait": 1 },
            { "rst": 0, "en": 1, "count": "0001", "_wait": -2 },
            { "rst": "0", "en": "0", "count": "0001" }
        ]
    }"#;

    #[test]
    fn loads_a_clocked_document() {
        let spec = parse_json_str(COUNTER).unwrap();
        assert_eq!(spec.entity(), "counter");
        let names: Vec<_> = spec.ports().map(|p| spec[p].name()).collect();
        assert_eq!(names, ["rst", "en", "clk", "count"]);
        assert_eq!(spec.clock().unwrap().period().get(), 20);
        assert_eq!(
            spec.generics(),
            [
                ("WIDTH".to_string(), "4".to_string()),
                ("SIGNED".to_string(), "false".to_string()),
                ("INIT".to_string(), "\"0000\"".to_string()),
            ]
        );

        let waits: Vec<_> = spec.vectors().iter().map(|v| v.wait()).collect();
        assert!(matches!(
            waits[..],
            [
                WaitDirective::RisingEdges(r),
                WaitDirective::FallingEdges(f),
                WaitDirective::FixedDelay
            ] if r.get() == 1 && f.get() == 2
        ));
        // numbers are accepted as pin values
        let rst = spec.inputs()[0];
        assert_eq!(spec.vectors()[1][rst].as_str(), "'0'");
        assert!(matches!(spec[spec.outputs()[0]].kind(), PinKind::Vector(w) if w.get() == 4));
    }

    #[test]
    fn clocked_requires_pin_and_period() {
        let doc = COUNTER.replace(r#""clock_period": 20,"#, "");
        assert!(matches!(
            parse_json_str(&doc),
            Err(LoadError::MissingField("clock_period"))
        ));
    }

    #[test]
    fn unclocked_ignores_clock_fields() {
        let doc = COUNTER.replace(r#""clocked": true"#, r#""clocked": false"#);
        let spec = parse_json_str(&doc).unwrap();
        assert!(spec.clock().is_none());
        assert_eq!(spec.ports().count(), 3);
    }

    #[test]
    fn missing_sections_fail() {
        let doc = r#"{ "library": "work", "entity": "e", "architecture": "a",
                       "input_pins": {}, "test_cases": [] }"#;
        let err = parse_json_str(doc).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
        assert!(err.to_string().contains("output_pins"));
    }

    #[test]
    fn rejects_bad_values() {
        let doc = COUNTER.replace(r#""_wait": -2"#, r#""_wait": "soon""#);
        assert!(matches!(
            parse_json_str(&doc),
            Err(LoadError::InvalidWait { index: 1, .. })
        ));

        let doc = COUNTER.replace(r#""rst": 0"#, r#""rst": true"#);
        assert!(matches!(
            parse_json_str(&doc),
            Err(LoadError::InvalidValue { index: 1, ref pin, .. }) if pin == "rst"
        ));

        let doc = COUNTER.replace(r#""WIDTH": 4"#, r#""WIDTH": [4]"#);
        assert!(matches!(
            parse_json_str(&doc),
            Err(LoadError::InvalidGeneric { ref name, .. }) if name == "WIDTH"
        ));
    }

    #[test]
    fn repeated_pin_keeps_first_position_and_last_width() {
        let doc = COUNTER.replace(
            r#""input_pins": { "rst": null, "en": null }"#,
            r#""input_pins": { "rst": null, "en": null, "rst": 2 }"#,
        );
        let file: TestCaseFile = serde_json::from_str(&doc).unwrap();
        let pins: Vec<_> = file.input_pins.0.into_iter().collect();
        assert_eq!(pins, [("rst".to_string(), Some(2)), ("en".to_string(), None)]);

        // the surviving declaration is the one the vectors are checked against
        assert!(matches!(
            parse_json_str(&doc),
            Err(LoadError::LiteralWidth { index: 0, ref pin, expected: 2, .. }) if pin == "rst"
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            parse_json_file("tests/inputs/does_not_exist.json"),
            Err(LoadError::Io { .. })
        ));
    }
}

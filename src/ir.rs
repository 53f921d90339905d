// Copyright 2025 Cornell University
// released under MIT License

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::num::NonZeroU32;
use std::ops::Index;

use crate::errors::LoadError;
use crate::type_inference::{literal, resolve_width};

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct PinId(u32);
entity_impl!(PinId, "pin");

/// Which of the three pin sets a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    Clock,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
            Direction::Clock => write!(f, "clock"),
        }
    }
}

/// Shape of a pin: a single bit or a fixed-width bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Scalar,
    Vector(NonZeroU32),
}

impl PinKind {
    /// Number of bits, and therefore the number of characters in a literal.
    pub fn width(&self) -> u32 {
        match self {
            PinKind::Scalar => 1,
            PinKind::Vector(width) => width.get(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    name: String,
    kind: PinKind,
    dir: Direction,
}

impl Pin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PinKind {
        self.kind
    }

    pub fn dir(&self) -> Direction {
        self.dir
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pin: PinId,
    period: NonZeroU32,
}

impl Clock {
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Clock period in nanoseconds.
    pub fn period(&self) -> NonZeroU32 {
        self.period
    }
}

/// How the stimulus process lets time pass before checking outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDirective {
    /// `wait for 10 ns;`
    FixedDelay,
    RisingEdges(NonZeroU32),
    FallingEdges(NonZeroU32),
}

impl WaitDirective {
    /// Decodes the signed wait code used by test-case files:
    /// `N > 0` rising edges, `N < 0` falling edges, `0` fixed delay.
    pub fn from_code(code: i32) -> Self {
        match NonZeroU32::new(code.unsigned_abs()) {
            None => WaitDirective::FixedDelay,
            Some(n) if code > 0 => WaitDirective::RisingEdges(n),
            Some(n) => WaitDirective::FallingEdges(n),
        }
    }
}

/// A pin value with its quotes already applied, e.g. `'1'` or `"0101"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Literal(pub(crate) String);

impl Literal {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the test-case table. Holds a literal for every input and
/// output pin of the harness it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    values: SecondaryMap<PinId, Literal>,
    wait: WaitDirective,
}

impl TestVector {
    pub fn wait(&self) -> WaitDirective {
        self.wait
    }
}

impl Index<PinId> for TestVector {
    type Output = Literal;

    fn index(&self, index: PinId) -> &Self::Output {
        &self.values[index]
    }
}

/// Everything needed to generate one harness. Only `HarnessBuilder` creates
/// these, so every vector is guaranteed to cover every input and output pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSpec {
    library: String,
    entity: String,
    architecture: String,
    pins: PrimaryMap<PinId, Pin>,
    inputs: Vec<PinId>,
    outputs: Vec<PinId>,
    clock: Option<Clock>,
    generics: Vec<(String, String)>,
    vectors: Vec<TestVector>,
}

impl HarnessSpec {
    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// Name of the generated test bench entity.
    pub fn testbench_name(&self) -> String {
        format!("{}_tb", self.entity)
    }

    pub fn inputs(&self) -> &[PinId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PinId] {
        &self.outputs
    }

    pub fn clock(&self) -> Option<Clock> {
        self.clock
    }

    /// All pins in port order: inputs, then the clock, then outputs.
    pub fn ports(&self) -> impl Iterator<Item = PinId> + '_ {
        self.inputs
            .iter()
            .copied()
            .chain(self.clock.map(|c| c.pin))
            .chain(self.outputs.iter().copied())
    }

    pub fn generics(&self) -> &[(String, String)] {
        &self.generics
    }

    pub fn vectors(&self) -> &[TestVector] {
        &self.vectors
    }
}

impl Index<PinId> for HarnessSpec {
    type Output = Pin;

    fn index(&self, index: PinId) -> &Self::Output {
        &self.pins[index]
    }
}

/// Collects an unchecked harness description and validates it in `build`.
#[derive(Debug, Clone, Default)]
pub struct HarnessBuilder {
    library: String,
    entity: String,
    architecture: String,
    inputs: Vec<(String, Option<i64>)>,
    outputs: Vec<(String, Option<i64>)>,
    clock: Option<(String, i64)>,
    generic_names: Vec<String>,
    generic_values: Vec<String>,
    vectors: Vec<(Vec<(String, String)>, i32)>,
}

impl HarnessBuilder {
    pub fn new(
        library: impl Into<String>,
        entity: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        let mut builder = Self::default();
        builder.names(library, entity, architecture);
        builder
    }

    pub fn names(
        &mut self,
        library: impl Into<String>,
        entity: impl Into<String>,
        architecture: impl Into<String>,
    ) -> &mut Self {
        self.library = library.into();
        self.entity = entity.into();
        self.architecture = architecture.into();
        self
    }

    pub fn input(&mut self, name: impl Into<String>, width: Option<i64>) -> &mut Self {
        self.inputs.push((name.into(), width));
        self
    }

    pub fn output(&mut self, name: impl Into<String>, width: Option<i64>) -> &mut Self {
        self.outputs.push((name.into(), width));
        self
    }

    /// Marks the entity as clocked. `period` is in nanoseconds.
    pub fn clock(&mut self, name: impl Into<String>, period: i64) -> &mut Self {
        self.clock = Some((name.into(), period));
        self
    }

    pub fn generic(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.generic_names.push(name.into());
        self.generic_values.push(value.into());
        self
    }

    /// Adds generic names and values as two separate lists. They are paired
    /// up positionally in `build`, which fails if the counts differ.
    pub fn generic_lists(&mut self, names: Vec<String>, values: Vec<String>) -> &mut Self {
        self.generic_names.extend(names);
        self.generic_values.extend(values);
        self
    }

    /// Kind of an input or output pin added so far. `None` for unknown
    /// names, the clock, and pins whose width does not resolve.
    pub fn pin_kind(&self, name: &str) -> Option<PinKind> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .find(|(n, _)| n == name)
            .and_then(|(n, width)| resolve_width(n, *width).ok())
    }

    /// Adds a test vector. `values` maps pin names to unquoted values.
    pub fn vector<N, V>(&mut self, values: impl IntoIterator<Item = (N, V)>, wait: i32) -> &mut Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(n, v)| (n.into(), v.into()))
            .collect();
        self.vectors.push((values, wait));
        self
    }

    pub fn build(&self) -> Result<HarnessSpec, LoadError> {
        let mut pins: PrimaryMap<PinId, Pin> = PrimaryMap::new();
        let mut by_name: FxHashMap<String, PinId> = FxHashMap::default();

        let mut declare = |name: &str, kind: PinKind, dir: Direction| -> Result<PinId, LoadError> {
            if let Some(&existing) = by_name.get(name) {
                return Err(LoadError::DuplicatePin {
                    name: name.to_string(),
                    first: pins[existing].dir,
                    second: dir,
                });
            }
            let id = pins.push(Pin {
                name: name.to_string(),
                kind,
                dir,
            });
            by_name.insert(name.to_string(), id);
            Ok(id)
        };

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for (name, width) in &self.inputs {
            inputs.push(declare(name, resolve_width(name, *width)?, Direction::Input)?);
        }

        let clock = match &self.clock {
            Some((name, period)) => {
                let period = u32::try_from(*period)
                    .ok()
                    .and_then(NonZeroU32::new)
                    .ok_or(LoadError::InvalidClockPeriod(*period))?;
                let pin = declare(name, PinKind::Scalar, Direction::Clock)?;
                Some(Clock { pin, period })
            }
            None => None,
        };

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for (name, width) in &self.outputs {
            outputs.push(declare(name, resolve_width(name, *width)?, Direction::Output)?);
        }

        let generics = self.build_generics()?;

        let mut vectors = Vec::with_capacity(self.vectors.len());
        for (index, (values, wait)) in self.vectors.iter().enumerate() {
            let given: FxHashMap<&str, &str> = values
                .iter()
                .map(|(n, v)| (n.as_str(), v.as_str()))
                .collect();

            for (name, _) in values {
                let is_checked = by_name
                    .get(name.as_str())
                    .is_some_and(|&id| pins[id].dir != Direction::Clock);
                if !is_checked {
                    warn!("test case {index}: ignoring `{name}`, which is not an input or output pin");
                }
            }

            let mut literals = SecondaryMap::new();
            for &id in inputs.iter().chain(outputs.iter()) {
                let pin = &pins[id];
                let raw = given.get(pin.name()).ok_or_else(|| LoadError::MissingValue {
                    index,
                    pin: pin.name.clone(),
                })?;
                literals[id] = literal(pin.kind, raw).map_err(|e| e.at(index, pin.name(), raw))?;
            }

            vectors.push(TestVector {
                values: literals,
                wait: WaitDirective::from_code(*wait),
            });
        }

        Ok(HarnessSpec {
            library: self.library.clone(),
            entity: self.entity.clone(),
            architecture: self.architecture.clone(),
            pins,
            inputs,
            outputs,
            clock,
            generics,
            vectors,
        })
    }

    fn build_generics(&self) -> Result<Vec<(String, String)>, LoadError> {
        if self.generic_names.len() != self.generic_values.len() {
            return Err(LoadError::GenericCountMismatch {
                names: self.generic_names.len(),
                values: self.generic_values.len(),
            });
        }
        let mut seen = FxHashSet::default();
        let mut generics = Vec::with_capacity(self.generic_names.len());
        for (name, value) in self.generic_names.iter().zip(&self.generic_values) {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::DuplicateGeneric(name.clone()));
            }
            generics.push((name.clone(), value.clone()));
        }
        Ok(generics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_gate() -> HarnessBuilder {
        let mut b = HarnessBuilder::new("work", "and_gate", "rtl");
        b.input("a", None).input("b", None).output("y", None);
        b
    }

    #[test]
    fn wait_codes_decode_by_sign() {
        assert_eq!(WaitDirective::from_code(0), WaitDirective::FixedDelay);
        assert_eq!(
            WaitDirective::from_code(3),
            WaitDirective::RisingEdges(NonZeroU32::new(3).unwrap())
        );
        assert_eq!(
            WaitDirective::from_code(-2),
            WaitDirective::FallingEdges(NonZeroU32::new(2).unwrap())
        );
        assert_eq!(
            WaitDirective::from_code(i32::MIN),
            WaitDirective::FallingEdges(NonZeroU32::new(1 << 31).unwrap())
        );
    }

    #[test]
    fn builds_pins_in_port_order() {
        let mut b = HarnessBuilder::new("work", "counter", "rtl");
        b.input("rst", None)
            .output("count", Some(4))
            .clock("clk", 20)
            .input("en", None);
        let spec = b.build().unwrap();

        let names: Vec<_> = spec.ports().map(|p| spec[p].name()).collect();
        assert_eq!(names, ["rst", "en", "clk", "count"]);
        let clock = spec.clock().unwrap();
        assert_eq!(spec[clock.pin()].dir(), Direction::Clock);
        assert_eq!(spec[clock.pin()].kind(), PinKind::Scalar);
        assert_eq!(clock.period().get(), 20);
        assert_eq!(
            spec[spec.outputs()[0]].kind(),
            PinKind::Vector(NonZeroU32::new(4).unwrap())
        );
        assert_eq!(spec.testbench_name(), "counter_tb");
    }

    #[test]
    fn quotes_vector_values_per_pin() {
        let mut b = HarnessBuilder::new("work", "adder", "rtl");
        b.input("a", Some(4)).input("cin", None).output("sum", Some(4));
        b.vector([("a", "0101"), ("cin", "1"), ("sum", "0110")], 0);
        let spec = b.build().unwrap();

        let v = &spec.vectors()[0];
        assert_eq!(v[spec.inputs()[0]].as_str(), "\"0101\"");
        assert_eq!(v[spec.inputs()[1]].as_str(), "'1'");
        assert_eq!(v[spec.outputs()[0]].as_str(), "\"0110\"");
        assert_eq!(v.wait(), WaitDirective::FixedDelay);
    }

    #[test]
    fn rejects_pin_in_two_sets() {
        let mut b = and_gate();
        b.clock("a", 10);
        match b.build() {
            Err(LoadError::DuplicatePin {
                name,
                first,
                second,
            }) => {
                assert_eq!(name, "a");
                assert_eq!(first, Direction::Input);
                assert_eq!(second, Direction::Clock);
            }
            other => panic!("expected duplicate pin error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_widths() {
        for width in [0, -3, i64::from(u32::MAX) + 1] {
            let mut b = and_gate();
            b.output("bus", Some(width));
            assert!(matches!(
                b.build(),
                Err(LoadError::InvalidWidth { width: w, .. }) if w == width
            ));
        }
    }

    #[test]
    fn rejects_non_positive_clock_period() {
        let mut b = and_gate();
        b.clock("clk", 0);
        assert!(matches!(b.build(), Err(LoadError::InvalidClockPeriod(0))));
    }

    #[test]
    fn rejects_missing_vector_value() {
        let mut b = and_gate();
        b.vector([("a", "0"), ("b", "1"), ("y", "0")], 0);
        b.vector([("a", "1"), ("y", "0")], 0);
        assert!(matches!(
            b.build(),
            Err(LoadError::MissingValue { index: 1, ref pin }) if pin == "b"
        ));
    }

    #[test]
    fn rejects_literals_of_the_wrong_length() {
        let mut b = HarnessBuilder::new("work", "reg", "rtl");
        b.input("d", Some(8)).output("q", Some(8));
        b.vector([("d", "0000"), ("q", "00000000")], 0);
        assert!(matches!(
            b.build(),
            Err(LoadError::LiteralWidth { expected: 8, .. })
        ));

        let mut b = and_gate();
        b.vector([("a", "10"), ("b", "1"), ("y", "0")], 0);
        assert!(matches!(
            b.build(),
            Err(LoadError::LiteralWidth { expected: 1, .. })
        ));
    }

    #[test]
    fn rejects_pre_quoted_literals() {
        let mut b = and_gate();
        b.vector([("a", "'"), ("b", "1"), ("y", "0")], 0);
        assert!(matches!(b.build(), Err(LoadError::QuotedLiteral { .. })));
    }

    #[test]
    fn ignores_unknown_and_clock_values() {
        let mut b = and_gate();
        b.clock("clk", 10);
        b.vector(
            [("a", "1"), ("b", "1"), ("y", "1"), ("clk", "0"), ("z", "1")],
            1,
        );
        let spec = b.build().unwrap();
        assert_eq!(spec.vectors().len(), 1);
    }

    #[test]
    fn pairs_generic_lists() {
        let mut b = and_gate();
        b.generic_lists(vec!["N".into(), "M".into()], vec!["4".into()]);
        assert!(matches!(
            b.build(),
            Err(LoadError::GenericCountMismatch {
                names: 2,
                values: 1
            })
        ));

        let mut b = and_gate();
        b.generic("N", "4").generic("N", "8");
        assert!(matches!(b.build(), Err(LoadError::DuplicateGeneric(ref n)) if n == "N"));

        let mut b = and_gate();
        b.generic_lists(vec!["N".into(), "M".into()], vec!["4".into(), "true".into()]);
        let spec = b.build().unwrap();
        assert_eq!(
            spec.generics(),
            [("N".to_string(), "4".to_string()), ("M".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn looks_up_declared_pin_kinds() {
        let mut b = and_gate();
        b.output("bus", Some(3)).clock("clk", 10);
        assert_eq!(b.pin_kind("a"), Some(PinKind::Scalar));
        assert_eq!(b.pin_kind("bus"), Some(PinKind::Vector(NonZeroU32::new(3).unwrap())));
        assert_eq!(b.pin_kind("clk"), None);
        assert_eq!(b.pin_kind("z"), None);
    }
}

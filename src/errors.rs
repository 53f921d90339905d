// Copyright 2025 Cornell University
// released under MIT License

use std::path::PathBuf;
use thiserror::Error;

use crate::ir::Direction;

/// Errors raised while turning an external test-case description into a
/// `HarnessSpec`. All of them are fatal: nothing is generated afterwards.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid test case document: {0}")]
    Json(#[from] serde_json::Error),
    /// The table parser already reported the details through its
    /// `DiagnosticHandler`; this only carries the summary line.
    #[error("{0}")]
    Table(String),
    #[error("missing required entry `{0}`")]
    MissingField(&'static str),
    #[error("`{0}` is declared more than once")]
    DuplicateDirective(&'static str),
    #[error("pin `{pin}` has width {width}, widths must be positive 32-bit integers")]
    InvalidWidth { pin: String, width: i64 },
    #[error("clock period must be a positive 32-bit integer, got {0}")]
    InvalidClockPeriod(i64),
    #[error("pin `{name}` is declared as both {first} and {second}")]
    DuplicatePin {
        name: String,
        first: Direction,
        second: Direction,
    },
    #[error("generic parameter `{0}` is declared more than once")]
    DuplicateGeneric(String),
    #[error("{names} generic parameter name(s) but {values} value(s)")]
    GenericCountMismatch { names: usize, values: usize },
    #[error("test case {index} has no value for pin `{pin}`")]
    MissingValue { index: usize, pin: String },
    #[error("test case {index}: `{value}` is not a valid value for pin `{pin}`")]
    InvalidValue {
        index: usize,
        pin: String,
        value: String,
    },
    #[error("test case {index}: `{value}` is not a valid wait code")]
    InvalidWait { index: usize, value: String },
    #[error("`{value}` is not a valid value for generic parameter `{name}`")]
    InvalidGeneric { name: String, value: String },
    #[error("test case {index}: value `{value}` for pin `{pin}` must be {expected} character(s) long")]
    LiteralWidth {
        index: usize,
        pin: String,
        value: String,
        expected: u32,
    },
    #[error("test case {index}: value `{value}` for pin `{pin}` must not contain quotes")]
    QuotedLiteral {
        index: usize,
        pin: String,
        value: String,
    },
}

/// Errors raised while assembling the harness text.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("harness has an empty {0} name")]
    MissingName(&'static str),
    #[error("entity `{0}` has no output pins, there is nothing to check")]
    NoOutputs(String),
    #[error(
        "test case {index} waits for {count} {edge} clock edge(s), but entity `{entity}` is not clocked"
    )]
    EdgeWaitWithoutClock {
        index: usize,
        count: u32,
        edge: &'static str,
        entity: String,
    },
    #[error("failed to write harness text: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write `{}`: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

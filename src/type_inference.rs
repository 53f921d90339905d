// Copyright 2025 Cornell University
// released under MIT License

//! Maps declared pin widths to VHDL signal types and literal quoting.

use std::fmt;
use std::num::NonZeroU32;

use crate::errors::LoadError;
use crate::ir::{Literal, PinKind};

/// VHDL type of a harness-internal signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    StdLogic,
    StdLogicVector(NonZeroU32),
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::StdLogic => write!(f, "std_logic"),
            SignalType::StdLogicVector(width) => {
                write!(f, "std_logic_vector({} downto 0)", width.get() - 1)
            }
        }
    }
}

/// Quote character used for literal values of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `'1'`, character literals for `std_logic`
    Single,
    /// `"0101"`, string literals for `std_logic_vector`
    Double,
}

impl Quote {
    pub fn char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralError {
    /// value does not have exactly this many characters
    Width(u32),
    /// value already contains a quote character
    Quote,
}

impl LiteralError {
    /// Attaches the test case and pin the rejected value belongs to.
    pub fn at(self, index: usize, pin: &str, value: &str) -> LoadError {
        let (pin, value) = (pin.to_string(), value.to_string());
        match self {
            LiteralError::Width(expected) => LoadError::LiteralWidth {
                index,
                pin,
                value,
                expected,
            },
            LiteralError::Quote => LoadError::QuotedLiteral { index, pin, value },
        }
    }
}

/// Turns an optional declared width into a `PinKind`. A missing width means a
/// single bit; a present width has to be a positive `u32`.
pub fn resolve_width(pin: &str, width: Option<i64>) -> Result<PinKind, LoadError> {
    match width {
        None => Ok(PinKind::Scalar),
        Some(w) => u32::try_from(w)
            .ok()
            .and_then(NonZeroU32::new)
            .map(PinKind::Vector)
            .ok_or_else(|| LoadError::InvalidWidth {
                pin: pin.to_string(),
                width: w,
            }),
    }
}

pub fn signal_type(kind: PinKind) -> SignalType {
    match kind {
        PinKind::Scalar => SignalType::StdLogic,
        PinKind::Vector(width) => SignalType::StdLogicVector(width),
    }
}

pub fn quote_style(kind: PinKind) -> Quote {
    match kind {
        PinKind::Scalar => Quote::Single,
        PinKind::Vector(_) => Quote::Double,
    }
}

/// Quotes `raw` for a pin of the given kind. The value itself is not
/// interpreted, only its length is checked against the pin width.
pub fn literal(kind: PinKind, raw: &str) -> Result<Literal, LiteralError> {
    if raw.contains(['\'', '"']) {
        return Err(LiteralError::Quote);
    }
    if raw.chars().count() != kind.width() as usize {
        return Err(LiteralError::Width(kind.width()));
    }
    let q = quote_style(kind).char();
    Ok(Literal(format!("{q}{raw}{q}")))
}

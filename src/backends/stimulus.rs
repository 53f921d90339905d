// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;

use crate::backends::vhdl::{signal_name, WAIT_PROCEDURE};
use crate::errors::GenerateError;
use crate::ir::{HarnessSpec, TestVector, WaitDirective};

/// Fixed delay used when a test case does not wait for clock edges.
pub const FIXED_DELAY: &str = "10 ns";

const INDENT: &str = "        ";

/// Writes the block for test case `index`: input assignments, the wait, the
/// assertion and the fail counter update.
pub fn test_case(
    out: &mut impl Write,
    spec: &HarnessSpec,
    index: usize,
    vector: &TestVector,
    clock_signal: Option<&str>,
) -> Result<(), GenerateError> {
    let wait = wait_statement(vector.wait(), clock_signal, index, spec.entity())?;

    writeln!(out, "{INDENT}-- test case {index}")?;
    for &id in spec.inputs() {
        writeln!(out, "{INDENT}{} <= {};", signal_name(&spec[id]), vector[id])?;
    }
    writeln!(out, "{INDENT}{wait}")?;
    writeln!(out, "{INDENT}assert ({})", all_outputs_match(spec, vector))?;
    writeln!(out, "{INDENT}report \"Test case {index} failed!\"")?;
    writeln!(out, "{INDENT}severity error;")?;
    writeln!(out, "{INDENT}if ({}) then", any_output_differs(spec, vector))?;
    writeln!(out, "{INDENT}    fail_count := fail_count + 1;")?;
    writeln!(out, "{INDENT}end if;")?;
    Ok(())
}

/// The statement that advances simulated time for one test case. Edge waits
/// need `clock_signal`; without one they are an error.
pub fn wait_statement(
    wait: WaitDirective,
    clock_signal: Option<&str>,
    index: usize,
    entity: &str,
) -> Result<String, GenerateError> {
    let (count, rising) = match wait {
        WaitDirective::FixedDelay => return Ok(format!("wait for {FIXED_DELAY};")),
        WaitDirective::RisingEdges(n) => (n, true),
        WaitDirective::FallingEdges(n) => (n, false),
    };
    match clock_signal {
        Some(clk) => Ok(format!("{WAIT_PROCEDURE}({clk}, {count}, {rising});")),
        None => Err(GenerateError::EdgeWaitWithoutClock {
            index,
            count: count.get(),
            edge: if rising { "rising" } else { "falling" },
            entity: entity.to_string(),
        }),
    }
}

/// `(tb_x = v) and (tb_y = w) ...` over every output pin
fn all_outputs_match(spec: &HarnessSpec, vector: &TestVector) -> String {
    compare_outputs(spec, vector, "=", " and ")
}

/// `(tb_x /= v) or (tb_y /= w) ...` over every output pin
fn any_output_differs(spec: &HarnessSpec, vector: &TestVector) -> String {
    compare_outputs(spec, vector, "/=", " or ")
}

fn compare_outputs(spec: &HarnessSpec, vector: &TestVector, op: &str, join: &str) -> String {
    spec.outputs()
        .iter()
        .map(|&id| format!("({} {op} {})", signal_name(&spec[id]), vector[id]))
        .collect::<Vec<_>>()
        .join(join)
}

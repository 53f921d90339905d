// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;
use std::num::NonZeroU32;

use log::{debug, info, warn};

use crate::backends::stimulus;
use crate::errors::GenerateError;
use crate::ir::{HarnessSpec, Pin, WaitDirective};
use crate::type_inference::signal_type;

/// Prefix for harness-internal signals so they never clash with port names.
pub const SIGNAL_PREFIX: &str = "tb_";

/// Name of the procedure that waits for a number of clock edges.
pub const WAIT_PROCEDURE: &str = "wait_until_clk_edges";

const RULE: &str = "--------------------------------------------------------";

/// Name of the harness-internal signal driving or observing `pin`.
pub fn signal_name(pin: &Pin) -> String {
    format!("{SIGNAL_PREFIX}{}", pin.name())
}

/// Rejects specs that would produce a malformed harness. Runs before any
/// text is written.
pub fn check(spec: &HarnessSpec) -> Result<(), GenerateError> {
    for (what, name) in [
        ("library", spec.library()),
        ("entity", spec.entity()),
        ("architecture", spec.architecture()),
    ] {
        if name.is_empty() {
            return Err(GenerateError::MissingName(what));
        }
    }
    if spec.outputs().is_empty() {
        return Err(GenerateError::NoOutputs(spec.entity().to_string()));
    }

    if spec.clock().is_none() {
        for (index, vector) in spec.vectors().iter().enumerate() {
            stimulus::wait_statement(vector.wait(), None, index, spec.entity())?;
        }
    } else {
        // mixed timing is allowed: a zero wait code still means a fixed delay
        let fixed = spec
            .vectors()
            .iter()
            .filter(|v| v.wait() == WaitDirective::FixedDelay)
            .count();
        if fixed > 0 {
            warn!(
                "{fixed} test case(s) of clocked entity `{}` wait a fixed delay instead of clock edges",
                spec.entity()
            );
        }
    }
    Ok(())
}

/// Generates the complete test bench into a string.
pub fn generate(spec: &HarnessSpec) -> Result<String, GenerateError> {
    let mut out = Vec::new();
    to_vhdl(spec, &mut out)?;
    String::from_utf8(out).map_err(|e| GenerateError::Io(std::io::Error::other(e)))
}

/// Writes the test bench for `spec` to `out`. Nothing is written if the spec
/// fails `check`.
pub fn to_vhdl(spec: &HarnessSpec, out: &mut impl Write) -> Result<(), GenerateError> {
    check(spec)?;
    info!(
        "generating {} for {}.{}({}): {} pin(s), {} test case(s)",
        spec.testbench_name(),
        spec.library(),
        spec.entity(),
        spec.architecture(),
        spec.ports().count(),
        spec.vectors().len()
    );

    header(out, spec.library(), spec.entity(), spec.architecture())?;
    if spec.clock().is_some() {
        wait_procedure(out)?;
        writeln!(out)?;
    }
    signal_declarations(out, spec)?;
    writeln!(out, "begin")?;
    uut_instance(out, spec)?;

    let clock_signal = spec.clock().map(|c| signal_name(&spec[c.pin()]));
    if let (Some(clock), Some(signal)) = (spec.clock(), &clock_signal) {
        writeln!(out)?;
        clock_process(out, signal, clock.period())?;
    }

    writeln!(out)?;
    stimulus_header(out)?;
    for (index, vector) in spec.vectors().iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        stimulus::test_case(out, spec, index, vector, clock_signal.as_deref())?;
    }
    writeln!(out)?;
    footer(out)?;
    Ok(())
}

fn header(
    out: &mut impl Write,
    library: &str,
    entity: &str,
    architecture: &str,
) -> std::io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "-- Test bench for entity {library}.{entity}({architecture})")?;
    writeln!(out, "-- Generated by tbgen")?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    writeln!(out, "library ieee;")?;
    writeln!(out, "use ieee.std_logic_1164.all;")?;
    writeln!(out, "library {library};")?;
    writeln!(out)?;
    writeln!(out, "-- test bench entity")?;
    writeln!(out, "entity {entity}_tb is")?;
    writeln!(out, "end {entity}_tb;")?;
    writeln!(out)?;
    writeln!(out, "-- test bench architecture")?;
    writeln!(out, "architecture tb of {entity}_tb is")?;
    Ok(())
}

fn wait_procedure(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "    -- procedure to wait for a number of rising or falling clock edges"
    )?;
    writeln!(
        out,
        "    procedure {WAIT_PROCEDURE} (signal clk: in std_logic; n: in positive; rising: in boolean) is"
    )?;
    writeln!(out, "    begin")?;
    writeln!(out, "        if rising then")?;
    writeln!(out, "            for i in 1 to n loop")?;
    writeln!(out, "                wait until rising_edge(clk);")?;
    writeln!(out, "            end loop;")?;
    writeln!(out, "        else")?;
    writeln!(out, "            for i in 1 to n loop")?;
    writeln!(out, "                wait until falling_edge(clk);")?;
    writeln!(out, "            end loop;")?;
    writeln!(out, "        end if;")?;
    writeln!(out, "    end procedure;")?;
    Ok(())
}

fn signal_declarations(out: &mut impl Write, spec: &HarnessSpec) -> std::io::Result<()> {
    debug!("declaring {} internal signal(s)", spec.ports().count());
    writeln!(out, "    -- internal signal declarations")?;
    for id in spec.ports() {
        let pin = &spec[id];
        writeln!(
            out,
            "    signal {}: {};",
            signal_name(pin),
            signal_type(pin.kind())
        )?;
    }
    Ok(())
}

fn uut_instance(out: &mut impl Write, spec: &HarnessSpec) -> std::io::Result<()> {
    writeln!(out, "    -- instantiate unit under test")?;
    writeln!(
        out,
        "    E_UUT: entity {}.{}({})",
        spec.library(),
        spec.entity(),
        spec.architecture()
    )?;
    if !spec.generics().is_empty() {
        generic_map(out, spec.generics())?;
    }
    port_map(out, spec)
}

fn generic_map(out: &mut impl Write, generics: &[(String, String)]) -> std::io::Result<()> {
    debug!("mapping {} generic parameter(s)", generics.len());
    writeln!(out, "           generic map (")?;
    for (ii, (name, value)) in generics.iter().enumerate() {
        let is_first = ii == 0;
        if !is_first {
            writeln!(out, ",")?;
        }
        write!(out, "               {name} => {value}")?;
    }
    writeln!(out)?;
    writeln!(out, "           )")?;
    Ok(())
}

fn port_map(out: &mut impl Write, spec: &HarnessSpec) -> std::io::Result<()> {
    writeln!(out, "           port map (")?;
    for (ii, id) in spec.ports().enumerate() {
        let is_first = ii == 0;
        if !is_first {
            writeln!(out, ",")?;
        }
        let pin = &spec[id];
        write!(out, "               {} => {}", pin.name(), signal_name(pin))?;
    }
    writeln!(out)?;
    writeln!(out, "           );")?;
    Ok(())
}

/// Half of the clock period as a VHDL time literal. Odd periods switch to
/// picoseconds so the generated clock keeps the requested period.
fn half_period(period: NonZeroU32) -> String {
    let period = period.get();
    if period % 2 == 0 {
        format!("{} ns", period / 2)
    } else {
        format!("{} ps", u64::from(period) * 500)
    }
}

fn clock_process(
    out: &mut impl Write,
    clock_signal: &str,
    period: NonZeroU32,
) -> std::io::Result<()> {
    let half = half_period(period);
    writeln!(out, "    -- clock process")?;
    writeln!(out, "    process")?;
    writeln!(out, "    begin")?;
    writeln!(out, "        {clock_signal} <= '0';")?;
    writeln!(out, "        wait for {half};")?;
    writeln!(out, "        {clock_signal} <= '1';")?;
    writeln!(out, "        wait for {half};")?;
    writeln!(out, "    end process;")?;
    Ok(())
}

fn stimulus_header(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "    -- test bench process")?;
    writeln!(out, "    process")?;
    writeln!(out, "        -- test fail counter")?;
    writeln!(out, "        variable fail_count: integer := 0;")?;
    writeln!(out, "    begin")?;
    Ok(())
}

fn footer(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "        -- check if all tests passed")?;
    writeln!(out, "        if (fail_count = 0) then")?;
    writeln!(out, "            assert false report \"All tests passed!\"")?;
    writeln!(out, "            severity note;")?;
    writeln!(out, "        else")?;
    writeln!(out, "            assert false report \"Testbench failed!\"")?;
    writeln!(out, "            severity error;")?;
    writeln!(out, "        end if;")?;
    writeln!(out)?;
    writeln!(out, "        wait;")?;
    writeln!(out, "    end process;")?;
    writeln!(out, "end tb;")?;
    Ok(())
}

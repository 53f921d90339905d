// Copyright 2025 Cornell University
// released under MIT License

use std::path::Path;

use clap::ValueEnum;

use crate::diagnostic::DiagnosticHandler;
use crate::errors::LoadError;
use crate::ir::HarnessSpec;
use crate::json_parser::parse_json_file;
use crate::table_parser::parse_table_file;

/// Encoding of a test case description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputFormat {
    /// pick by file extension
    #[default]
    Auto,
    /// JSON test case document
    Json,
    /// line-oriented test vector table
    Table,
}

impl InputFormat {
    /// Resolves `Auto` from the extension of `path`: `.tbv` and `.csv` are
    /// tables, everything else is read as JSON.
    pub fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("tbv") || ext.eq_ignore_ascii_case("csv") => {
                    InputFormat::Table
                }
                _ => InputFormat::Json,
            },
            other => other,
        }
    }
}

/// Loads the test case description at `path`. Table syntax errors are
/// rendered through `handler`.
pub fn load_harness(
    path: impl AsRef<Path>,
    format: InputFormat,
    handler: &mut DiagnosticHandler,
) -> Result<HarnessSpec, LoadError> {
    let path = path.as_ref();
    match format.resolve(path) {
        InputFormat::Table => parse_table_file(path, handler),
        _ => parse_json_file(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_format_follows_extension() {
        let auto = InputFormat::Auto;
        assert_eq!(auto.resolve(Path::new("a/adder.tbv")), InputFormat::Table);
        assert_eq!(auto.resolve(Path::new("adder.CSV")), InputFormat::Table);
        assert_eq!(auto.resolve(Path::new("adder.json")), InputFormat::Json);
        assert_eq!(auto.resolve(Path::new("adder")), InputFormat::Json);
        assert_eq!(
            InputFormat::Table.resolve(Path::new("adder.json")),
            InputFormat::Table
        );
    }

    #[test]
    fn loads_both_formats() {
        let mut handler = DiagnosticHandler::default();
        let json = load_harness("tests/inputs/and_gate.json", InputFormat::Auto, &mut handler);
        let table = load_harness("tests/inputs/and_gate.tbv", InputFormat::Auto, &mut handler);
        assert_eq!(json.unwrap(), table.unwrap());

        let json = load_harness("tests/inputs/counter.json", InputFormat::Json, &mut handler);
        let table = load_harness("tests/inputs/counter.tbv", InputFormat::Table, &mut handler);
        assert_eq!(json.unwrap(), table.unwrap());
        assert!(handler.error_string().is_empty());
    }

    #[test]
    fn forced_format_overrides_extension() {
        let mut handler = DiagnosticHandler::default();
        let res = load_harness("tests/inputs/and_gate.json", InputFormat::Table, &mut handler);
        assert!(matches!(res, Err(LoadError::Table(_))));
        assert!(handler.error_string().contains("Lexing failed"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut handler = DiagnosticHandler::default();
        let res = load_harness("tests/inputs/missing.tbv", InputFormat::Auto, &mut handler);
        assert!(matches!(res, Err(LoadError::Io { .. })));
    }
}

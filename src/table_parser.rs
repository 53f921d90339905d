// Copyright 2025 Cornell University
// released under MIT License

use std::path::Path;

use log::info;
use pest::{error::InputLocation, iterators::Pair, Parser};
use pest_derive::Parser;
use rustc_hash::FxHashSet;

use crate::diagnostic::{DiagnosticHandler, Level};
use crate::errors::LoadError;
use crate::ir::{HarnessBuilder, HarnessSpec};
use crate::json_parser::WAIT_KEY;
use crate::type_inference::literal;

#[derive(Parser)]
#[grammar = "table.pest"]
struct TableParser;

/// Parses a test vector table (specified at `filepath`), reporting problems
/// through `handler`.
pub fn parse_table_file(
    filepath: impl AsRef<Path>,
    handler: &mut DiagnosticHandler,
) -> Result<HarnessSpec, LoadError> {
    let path = filepath.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loading test vector table from {}", path.display());
    parse_table_str(&path.to_string_lossy(), input, handler)
}

pub fn parse_table_str(
    filename: &str,
    input: String,
    handler: &mut DiagnosticHandler,
) -> Result<HarnessSpec, LoadError> {
    let fileid = handler.add_file(filename.to_string(), input.clone());

    let mut pairs = match TableParser::parse(Rule::file, &input) {
        Ok(pairs) => pairs,
        Err(err) => {
            let (start, end) = match err.location {
                InputLocation::Pos(start) => (start, start),
                InputLocation::Span(span) => span,
            };
            let msg = format!("Lexing failed: {}", err.variant.message());
            handler.emit_diagnostic_span(&msg, fileid, start, end, Level::Error);
            return Err(LoadError::Table(msg));
        }
    };
    let Some(file) = pairs.next() else {
        return Err(LoadError::Table(format!("`{filename}` is empty")));
    };

    let mut table = Table {
        handler,
        fileid,
        library: None,
        entity: None,
        architecture: None,
        clock: None,
        builder: HarnessBuilder::default(),
        columns: vec![],
        rows: 0,
    };
    for pair in file.into_inner() {
        table.visit(pair)?;
    }
    table.finish()
}

/// State accumulated while walking the directives and rows of one table.
struct Table<'a> {
    handler: &'a mut DiagnosticHandler,
    fileid: usize,
    library: Option<String>,
    entity: Option<String>,
    architecture: Option<String>,
    clock: Option<(String, i64)>,
    builder: HarnessBuilder,
    columns: Vec<String>,
    rows: usize,
}

impl Table<'_> {
    /// Reports `err` at the location of `pair` and hands it back.
    fn fail(&mut self, pair: &Pair<Rule>, err: LoadError) -> LoadError {
        self.handler
            .emit_diagnostic_parsing(&err.to_string(), self.fileid, pair, Level::Error);
        err
    }

    fn integer(&mut self, pair: &Pair<Rule>) -> Result<i64, LoadError> {
        pair.as_str().parse::<i64>().map_err(|e| {
            let msg = format!("invalid integer `{}`: {e}", pair.as_str());
            self.fail(pair, LoadError::Table(msg))
        })
    }

    fn set_once(
        &mut self,
        pair: &Pair<Rule>,
        name: &'static str,
        slot: fn(&mut Self) -> &mut Option<String>,
    ) -> Result<(), LoadError> {
        let value = first_str(pair);
        if slot(self).replace(value).is_some() {
            return Err(self.fail(pair, LoadError::DuplicateDirective(name)));
        }
        Ok(())
    }

    fn visit(&mut self, pair: Pair<Rule>) -> Result<(), LoadError> {
        match pair.as_rule() {
            Rule::library => self.set_once(&pair, "library", |t| &mut t.library)?,
            Rule::entity => self.set_once(&pair, "entity", |t| &mut t.entity)?,
            Rule::architecture => {
                self.set_once(&pair, "architecture", |t| &mut t.architecture)?
            }
            Rule::clock => {
                if self.clock.is_some() {
                    return Err(self.fail(&pair, LoadError::DuplicateDirective("clock")));
                }
                let mut inner = pair.into_inner();
                let (Some(name), Some(period)) = (inner.next(), inner.next()) else {
                    return Ok(());
                };
                let value = self.integer(&period)?;
                if value <= 0 || u32::try_from(value).is_err() {
                    return Err(self.fail(&period, LoadError::InvalidClockPeriod(value)));
                }
                self.clock = Some((name.as_str().to_string(), value));
            }
            Rule::generic => self.visit_generic(pair)?,
            Rule::inputs | Rule::outputs => self.visit_pins(pair)?,
            Rule::header => self.visit_header(pair)?,
            Rule::row => self.visit_row(pair)?,
            _ => {}
        }
        Ok(())
    }

    fn visit_generic(&mut self, pair: Pair<Rule>) -> Result<(), LoadError> {
        let mut names = vec![];
        let mut values = vec![];
        for list in pair.clone().into_inner() {
            for item in list.into_inner() {
                match item.as_rule() {
                    Rule::ident => names.push(item.as_str().to_string()),
                    _ => values.push(item.as_str().trim().to_string()),
                }
            }
        }
        if names.len() != values.len() {
            let err = LoadError::GenericCountMismatch {
                names: names.len(),
                values: values.len(),
            };
            return Err(self.fail(&pair, err));
        }
        self.builder.generic_lists(names, values);
        Ok(())
    }

    fn visit_pins(&mut self, pair: Pair<Rule>) -> Result<(), LoadError> {
        let is_input = pair.as_rule() == Rule::inputs;
        let Some(list) = pair.into_inner().next() else {
            return Ok(());
        };
        for pin in list.into_inner() {
            let mut inner = pin.into_inner();
            let Some(name) = inner.next() else { continue };
            let name = name.as_str().to_string();
            let width = match inner.next() {
                None => None,
                Some(width) => {
                    let Some(value) = width.clone().into_inner().next() else {
                        continue;
                    };
                    let w = self.integer(&value)?;
                    if w <= 0 {
                        let err = LoadError::InvalidWidth { pin: name, width: w };
                        return Err(self.fail(&width, err));
                    }
                    Some(w)
                }
            };
            if is_input {
                self.builder.input(name, width);
            } else {
                self.builder.output(name, width);
            }
        }
        Ok(())
    }

    fn visit_header(&mut self, pair: Pair<Rule>) -> Result<(), LoadError> {
        let mut seen = FxHashSet::default();
        for list in pair.into_inner() {
            for column in list.into_inner() {
                if !seen.insert(column.as_str()) {
                    let msg = format!("column `{}` appears more than once", column.as_str());
                    return Err(self.fail(&column, LoadError::Table(msg)));
                }
                self.columns.push(column.as_str().to_string());
            }
        }
        Ok(())
    }

    fn visit_row(&mut self, pair: Pair<Rule>) -> Result<(), LoadError> {
        let index = self.rows;
        let cells: Vec<_> = pair.clone().into_inner().collect();
        if cells.len() != self.columns.len() {
            let msg = format!(
                "test case {index} has {} value(s) but the header names {} column(s)",
                cells.len(),
                self.columns.len()
            );
            return Err(self.fail(&pair, LoadError::Table(msg)));
        }

        let mut wait = 0;
        let mut values = Vec::with_capacity(cells.len());
        for (column, cell) in self.columns.clone().into_iter().zip(&cells) {
            if column == WAIT_KEY {
                wait = cell.as_str().parse::<i32>().map_err(|_| {
                    let err = LoadError::InvalidWait {
                        index,
                        value: cell.as_str().to_string(),
                    };
                    self.fail(cell, err)
                })?;
            } else {
                if let Some(kind) = self.builder.pin_kind(&column) {
                    if let Err(e) = literal(kind, cell.as_str()) {
                        let err = e.at(index, &column, cell.as_str());
                        return Err(self.fail(cell, err));
                    }
                }
                values.push((column, cell.as_str().to_string()));
            }
        }
        self.builder.vector(values, wait);
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<HarnessSpec, LoadError> {
        let Table {
            handler,
            library,
            entity,
            architecture,
            clock,
            mut builder,
            ..
        } = self;

        let result = match (library, entity, architecture) {
            (None, _, _) => Err(LoadError::MissingField("library")),
            (_, None, _) => Err(LoadError::MissingField("entity")),
            (_, _, None) => Err(LoadError::MissingField("architecture")),
            (Some(library), Some(entity), Some(architecture)) => {
                builder.names(library, entity, architecture);
                if let Some((name, period)) = clock {
                    builder.clock(name, period);
                }
                builder.build()
            }
        };

        if let Err(err) = &result {
            handler.emit_general_message(&err.to_string(), Level::Error);
        }
        result
    }
}

fn first_str(pair: &Pair<Rule>) -> String {
    pair.clone()
        .into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

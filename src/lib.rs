// Copyright 2025 Cornell University
// released under MIT License

pub mod backends;
pub mod diagnostic;
pub mod errors;
pub mod ir;
pub mod json_parser;
pub mod output;
pub mod setup;
pub mod table_parser;
pub mod type_inference;

// Copyright 2025 Cornell University
// released under MIT License

pub mod stimulus;
pub mod vhdl;

pub use vhdl::{generate, to_vhdl};

//! Shared pieces of the `generate_diagram`, `generate_image` and
//! `validate_output` binaries.

pub mod common;
pub mod hook;
pub mod report;

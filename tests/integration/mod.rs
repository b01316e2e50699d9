//! Integration test suite for buildinputs
//!
//! Runs the `buildinputs` binary end to end against fabricated build graphs
//! and fake converters.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **definition_mode**: dependency output for pre-converted graphs
//! - **entry_contract**: platform, build argument and config checks
//! - **converter**: runs through an external converter program (unix only)
//! - **changed_files**: rebuild decisions

mod common;

mod changed_files;
mod converter;
mod definition_mode;
mod entry_contract;

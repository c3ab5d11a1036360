//! End-to-End Tests for Fax Compiler
//!
//! This module contains comprehensive E2E tests that verify the full
//! compilation pipeline from Fax source code to executable.

mod compilation_tests;
mod cli_tests;
mod snapshot_tests;
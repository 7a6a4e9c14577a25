//! Integration tests for the siteforge CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior. None of
//! them reach a real host.

mod cli_tests;
mod config_command;
mod provision_command;

//! Unit tests for the application layer, run against scripted hosts.

mod architecture;
mod detect_service;
mod mocks;
mod remote_shell;

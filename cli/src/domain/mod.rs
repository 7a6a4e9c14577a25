//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod options;
pub mod preview;
pub mod result;
pub mod shell;
pub mod site;
pub mod ssh;

pub use config::SiteforgeConfig;
pub use connection::{ConnectionConfig, Credential};
pub use error::{ConnectionCause, InstallationError, PortAllocationError, ProvisionError};
pub use options::{InstallationOptions, Requester, SiteCustomization};
pub use site::SiteLayout;

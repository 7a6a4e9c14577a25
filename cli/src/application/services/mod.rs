//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod detect;
pub mod events;
pub mod installation;
pub mod pipeline;
pub mod port_allocator;
pub mod steps;

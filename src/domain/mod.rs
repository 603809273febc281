//! Domain layer for the HACCP cleaning plan
//!
//! This module contains the core models, the errors and the ports the
//! services are written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};

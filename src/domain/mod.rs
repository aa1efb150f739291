//! Domain layer - entities, errors and the ports adapters implement.

pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::*;
pub use errors::{DomainError, Result};

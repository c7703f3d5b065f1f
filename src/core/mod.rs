//! Core invoice types, validation, and fiscal code derivation.
//!
//! This module provides the document model for Colombian electronic
//! invoicing together with the pure derivations the authority mandates:
//! CUFE, software security code, and the QR document key.

mod builder;
pub mod codes;
mod error;
mod types;
mod validation;

pub use builder::*;
pub use codes::{cufe, qr_url, software_security_code};
pub use error::*;
pub use types::*;
pub use validation::*;

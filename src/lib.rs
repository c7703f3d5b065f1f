//! # facturacol
//!
//! Colombian electronic invoicing library covering the document-assembly
//! pipeline mandated by DIAN: UBL 2.1 generation, CUFE derivation,
//! XAdES-EPES enveloped signing, and WS-Security SOAP 1.2 transmission
//! over mutual TLS.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::DateTime;
//! use facturacol::core::*;
//! use rust_decimal_macros::dec;
//!
//! let issued = DateTime::parse_from_rfc3339("2024-01-15T10:00:00-05:00").unwrap();
//! let invoice = InvoiceBuilder::new("SETP990000001", issued)
//!     .supplier(
//!         PartyBuilder::new("Soluciones Andinas SAS", "900373115", TaxIdScheme::Nit)
//!             .address(AddressBuilder::new("Calle 93 13-24", "Bogotá", "Bogotá D.C.").build())
//!             .build(),
//!     )
//!     .customer(
//!         PartyBuilder::new("Carlos Pérez", "1032402388", TaxIdScheme::CitizenId)
//!             .person_type(PersonType::Natural)
//!             .address(AddressBuilder::new("Carrera 7 71-21", "Bogotá", "Bogotá D.C.").build())
//!             .build(),
//!     )
//!     .add_line(
//!         LineBuilder::new("Servicio de consultoría", dec!(1), "94", dec!(100000))
//!             .iva(dec!(19))
//!             .build(),
//!     )
//!     .build();
//!
//! assert!(validate_invoice(&invoice).is_empty());
//! assert_eq!(invoice.monetary_total.payable, dec!(119000.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice model, validation, CUFE / security code / QR derivation |
//! | `ubl` | UBL 2.1 serialization, DianExtensions, exclusive canonicalization |
//! | `signing` | Credential loading, XAdES-EPES signer, WS-Security header |
//! | `transmit` | SOAP 1.2 mTLS transport and the `DianClient` orchestrator |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "ubl")]
pub mod ubl;

#[cfg(feature = "signing")]
pub mod signature;

#[cfg(feature = "transmit")]
pub mod soap;

#[cfg(feature = "transmit")]
mod client;

#[cfg(feature = "transmit")]
pub use crate::client::{Config, DianClient};

#[cfg(feature = "transmit")]
pub use crate::soap::Receipt;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;

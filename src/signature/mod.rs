//! Credential loading and the two XML signatures of the transmission:
//! the enveloped XAdES-EPES signature on the invoice and the detached
//! WS-Security signature on the SOAP header.
//!
//! The two signatures are independent; their canonicalization scopes and
//! reference graphs differ and they share no SignedInfo construction.

mod credentials;
mod wssecurity;
mod xades;

pub use credentials::Credentials;
pub use wssecurity::{Timestamp, WsSecurityHeader, build_header};
pub use xades::{POLICY_HASH, POLICY_URL, XadesSigner};

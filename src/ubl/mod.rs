//! UBL 2.1 document generation and exclusive canonicalization.
//!
//! # Example
//!
//! ```no_run
//! use facturacol::core::*;
//! use facturacol::ubl;
//!
//! let mut invoice: Invoice = todo!(); // build via InvoiceBuilder
//! let ext_config: ubl::ExtensionConfig = todo!();
//! invoice.cufe = Some(todo!()); // core::cufe(...)
//! let block = ubl::build_dian_extensions(&ext_config, &invoice.id, invoice.cufe.as_ref().unwrap()).unwrap();
//! let xml = ubl::to_ubl_xml(&invoice, &block, Environment::Test).unwrap();
//! ```

mod canonical;
mod extensions;
mod invoice_xml;
pub(crate) mod xml_utils;

pub use canonical::Canonicalizer;
pub use extensions::{AUTHORITY_NIT, ExtensionConfig, build_dian_extensions};
pub use invoice_xml::{SIGNATURE_PLACEHOLDER, to_ubl_xml};

/// UBL 2.1 and DIAN namespace URIs.
pub mod ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
    pub const EXT: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonExtensionComponents-2";
    pub const STS: &str = "dian:gov:co:facturaelectronica:Structures-2-1";
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
    pub const XADES: &str = "http://uri.etsi.org/01903/v1.3.2#";
}

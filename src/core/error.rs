use thiserror::Error;

/// Errors that can occur while assembling, signing, or transmitting an
/// electronic invoice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FacturaError {
    /// The invoice failed invariant validation before processing.
    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),

    /// Certificate or private key could not be loaded.
    #[error("credential load error: {0}")]
    CredentialLoad(String),

    /// CUFE derivation attempted on an invoice without an IVA tax total.
    #[error("invoice has no IVA tax total; CUFE cannot be derived")]
    MissingTax,

    /// Malformed XML handed to the canonicalizer.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    /// RSA signing failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal XML serialization failure while assembling a document or
    /// signature fragment.
    #[error("signature assembly error: {0}")]
    SignatureAssembly(String),

    /// The transport window elapsed without a response.
    #[error("transport timeout")]
    TransportTimeout,

    /// The authority answered with a non-200 HTTP status.
    #[error("transport HTTP {status}: {body}")]
    TransportHttp { status: u16, body: String },

    /// The response body could not be decoded as a SOAP envelope or
    /// ApplicationResponse document.
    #[error("transport body error: {0}")]
    TransportBody(String),

    /// The round-trip succeeded but the authority refused the document.
    #[error("document rejected with status {status_code}: {}", errors.join("; "))]
    Rejected {
        status_code: String,
        errors: Vec<String>,
    },
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "customer.tax_id").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

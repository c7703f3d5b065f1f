//! Fiscal code derivation: CUFE, software security code, QR document key.
//!
//! All derivations are pure functions of their inputs. Numeric inputs are
//! rendered in fixed-point decimal, never scientific notation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256, Sha384};

use super::error::FacturaError;
use super::types::{Environment, Invoice, TaxSchemeCode};

/// Base of the invoice verification URL published by the authority.
pub const QR_BASE_URL: &str = "https://catalogo-vpfe.dian.gov.co/document/searchqr?documentkey=";

/// Format an amount with exactly two decimal places.
pub fn format_amount(amount: Decimal) -> String {
    pad_decimals(amount.round_dp(2), 2)
}

/// Format a quantity with at least two and at most four decimal places.
pub fn format_quantity(quantity: Decimal) -> String {
    pad_decimals(quantity.round_dp(4), 2)
}

fn pad_decimals(value: Decimal, min: usize) -> String {
    let s = value.normalize().to_string();
    match s.find('.') {
        Some(dot) => {
            let decimals = s.len() - dot - 1;
            if decimals < min {
                format!("{s}{}", "0".repeat(min - decimals))
            } else {
                s
            }
        }
        None => format!("{s}.{}", "0".repeat(min)),
    }
}

/// Compute the CUFE: the SHA-384 of the concatenation of invoice id, issue
/// date, issue time, line extension amount, the IVA scheme code and amount,
/// the INC scheme code and payable amount, the supplier NIT, the customer
/// identifier, and (in the test environment) the technical key.
///
/// The IVA amount is taken from the tax total whose scheme is `"01"`.
/// Returns 96 lowercase hexadecimal characters.
///
/// # Errors
///
/// [`FacturaError::MissingTax`] when the invoice carries no IVA tax total.
pub fn cufe(
    invoice: &Invoice,
    supplier_nit: &str,
    technical_key: &str,
    environment: Environment,
) -> Result<String, FacturaError> {
    let iva = invoice
        .tax_total(TaxSchemeCode::Iva)
        .ok_or(FacturaError::MissingTax)?;

    let mut data = String::new();
    data.push_str(&invoice.id);
    data.push_str(&invoice.issue_date());
    data.push_str(&invoice.issue_time());
    data.push_str(&format_amount(invoice.monetary_total.line_extension));
    data.push_str(TaxSchemeCode::Iva.code());
    data.push_str(&format_amount(iva.amount));
    data.push_str(TaxSchemeCode::Inc.code());
    data.push_str(&format_amount(invoice.monetary_total.payable));
    data.push_str(supplier_nit);
    data.push_str(&invoice.customer.tax_id);
    if environment == Environment::Test {
        data.push_str(technical_key);
    }

    Ok(sha384_hex(&data))
}

/// Software security code: SHA-384(SoftwareID ∥ PIN), lowercase hex.
pub fn software_security_code(software_id: &str, pin: &str) -> String {
    sha384_hex(&format!("{software_id}{pin}"))
}

/// QR document key: base64url(SHA-256(NIT ∥ InvoiceID ∥ CUFE)).
pub fn qr_document_key(nit: &str, invoice_id: &str, cufe: &str) -> String {
    let digest = Sha256::digest(format!("{nit}{invoice_id}{cufe}").as_bytes());
    URL_SAFE.encode(digest)
}

/// Full verification QR URL for an issued invoice.
pub fn qr_url(nit: &str, invoice_id: &str, cufe: &str) -> String {
    format!("{QR_BASE_URL}{}", qr_document_key(nit, invoice_id, cufe))
}

fn sha384_hex(data: &str) -> String {
    hex::encode(Sha384::digest(data.as_bytes()))
}

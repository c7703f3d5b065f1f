use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::ValidationError;
use super::types::Invoice;

/// Largest accepted drift between a stated amount and its recomputation,
/// in currency units.
const AMOUNT_TOLERANCE: Decimal = dec!(0.01);

/// Check the invariants an invoice must satisfy before it enters the
/// signing pipeline. Returns every violation found, empty when valid.
pub fn validate_invoice(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if invoice.id.is_empty() {
        errors.push(ValidationError::new("id", "invoice id is required"));
    }
    if invoice.supplier.tax_id.is_empty() {
        errors.push(ValidationError::new(
            "supplier.tax_id",
            "supplier fiscal identifier is required",
        ));
    }
    if invoice.supplier.registration_name.is_empty() {
        errors.push(ValidationError::new(
            "supplier.registration_name",
            "supplier registration name is required",
        ));
    }
    if invoice.customer.tax_id.is_empty() {
        errors.push(ValidationError::new(
            "customer.tax_id",
            "customer fiscal identifier is required",
        ));
    }
    if invoice.customer.registration_name.is_empty() {
        errors.push(ValidationError::new(
            "customer.registration_name",
            "customer registration name is required",
        ));
    }
    if invoice.currency.is_empty() {
        errors.push(ValidationError::new("currency", "currency code is required"));
    }
    if invoice.lines.is_empty() {
        errors.push(ValidationError::new(
            "lines",
            "at least one invoice line is required",
        ));
    }

    for (idx, line) in invoice.lines.iter().enumerate() {
        let expected = line.quantity * line.unit_price;
        if (line.line_extension - expected).abs() > AMOUNT_TOLERANCE {
            errors.push(ValidationError::new(
                format!("lines[{idx}].line_extension"),
                format!(
                    "line extension {} does not match quantity × unit price {}",
                    line.line_extension, expected
                ),
            ));
        }
        if line.description.is_empty() {
            errors.push(ValidationError::new(
                format!("lines[{idx}].description"),
                "item description is required",
            ));
        }
    }

    let totals = &invoice.monetary_total;
    let tax_sum: Decimal = invoice.tax_totals.iter().map(|t| t.amount).sum();
    if (totals.tax_inclusive - (totals.tax_exclusive + tax_sum)).abs() > AMOUNT_TOLERANCE {
        errors.push(ValidationError::new(
            "monetary_total.tax_inclusive",
            format!(
                "tax-inclusive total {} does not equal tax-exclusive {} plus taxes {}",
                totals.tax_inclusive, totals.tax_exclusive, tax_sum
            ),
        ));
    }
    if (totals.payable - (totals.tax_inclusive - invoice.prepaid_amount)).abs() > AMOUNT_TOLERANCE {
        errors.push(ValidationError::new(
            "monetary_total.payable",
            format!(
                "payable {} does not equal tax-inclusive {} minus prepaid {}",
                totals.payable, totals.tax_inclusive, invoice.prepaid_amount
            ),
        ));
    }

    errors
}

/// Validate the format of a Colombian NIT: 9 or 10 digits once dots and
/// dashes are stripped.
pub fn validate_nit(nit: &str) -> Result<(), ValidationError> {
    let digits: String = nit.chars().filter(|c| *c != '.' && *c != '-').collect();
    if !(9..=10).contains(&digits.len()) {
        return Err(ValidationError::new("nit", "NIT must have 9 or 10 digits"));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("nit", "NIT must contain only digits"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nit_format() {
        assert!(validate_nit("900373115").is_ok());
        assert!(validate_nit("900.373.115-1").is_ok());
        assert!(validate_nit("12345678").is_err());
        assert!(validate_nit("90037311A").is_err());
        assert!(validate_nit("12345678901").is_err());
    }
}

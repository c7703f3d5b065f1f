//! UBL 2.1 invoice serialization.
//!
//! Child element order follows the DIAN UBL 2.1 content model; deviations
//! are rejected by the authority. `ext:UBLExtensions` is always the first
//! child: the first extension carries the `sts:DianExtensions` block and
//! the second is an empty placeholder later filled with the signature.

use super::ns;
use super::xml_utils::{XmlResult, XmlWriter};
use crate::core::{Environment, Invoice, Party, TaxSubtotal, TaxTotal};
use rust_decimal::Decimal;

/// Empty extension placeholder reserved for the enveloped signature. The
/// signer replaces this element's content, leaving every byte outside the
/// insertion point untouched.
pub const SIGNATURE_PLACEHOLDER: &str = "<ext:ExtensionContent/>";

/// Serialize an invoice to UBL 2.1. `dian_extensions` is the rendered
/// `sts:DianExtensions` fragment; the CUFE must already be written into
/// `invoice.cufe`.
pub fn to_ubl_xml(
    invoice: &Invoice,
    dian_extensions: &str,
    environment: Environment,
) -> XmlResult {
    let currency = invoice.currency.as_str();
    let mut w = XmlWriter::document()?;

    w.start_element_with_attrs(
        "Invoice",
        &[
            ("xmlns", ns::INVOICE),
            ("xmlns:cac", ns::CAC),
            ("xmlns:cbc", ns::CBC),
            ("xmlns:ext", ns::EXT),
            ("xmlns:sts", ns::STS),
        ],
    )?;

    // UBLExtensions must precede every other child.
    w.start_element("ext:UBLExtensions")?
        .start_element("ext:UBLExtension")?
        .start_element("ext:ExtensionContent")?
        .raw(dian_extensions)?
        .end_element("ext:ExtensionContent")?
        .end_element("ext:UBLExtension")?
        .start_element("ext:UBLExtension")?
        .empty_element("ext:ExtensionContent")?
        .end_element("ext:UBLExtension")?
        .end_element("ext:UBLExtensions")?;

    w.text_element("cbc:UBLVersionID", "UBL 2.1")?
        .text_element("cbc:CustomizationID", "05")?
        .text_element("cbc:ProfileID", "DIAN 2.1")?
        .text_element("cbc:ProfileExecutionID", environment.code())?
        .text_element("cbc:ID", &invoice.id)?
        .text_element_with_attrs(
            "cbc:UUID",
            invoice.cufe.as_deref().unwrap_or_default(),
            &[("schemeID", environment.code()), ("schemeName", "CUFE-SHA384")],
        )?
        .text_element("cbc:IssueDate", &invoice.issue_date())?
        .text_element("cbc:IssueTime", &invoice.issue_time())?;

    if let Some(due) = &invoice.due_date {
        w.text_element("cbc:DueDate", &due.to_string())?;
    }

    w.text_element("cbc:InvoiceTypeCode", invoice.type_code.code())?;

    for note in &invoice.notes {
        w.text_element("cbc:Note", note)?;
    }

    w.text_element_with_attrs(
        "cbc:DocumentCurrencyCode",
        currency,
        &[
            ("listAgencyID", "6"),
            ("listAgencyName", "United Nations Economic Commission for Europe"),
            ("listID", "ISO 4217 Alpha"),
        ],
    )?
    .text_element("cbc:LineCountNumeric", &invoice.line_count().to_string())?;

    write_party(&mut w, "cac:AccountingSupplierParty", &invoice.supplier)?;
    write_party(&mut w, "cac:AccountingCustomerParty", &invoice.customer)?;

    for means in &invoice.payment_means {
        w.start_element("cac:PaymentMeans")?
            .text_element("cbc:ID", &means.id)?
            .text_element("cbc:PaymentMeansCode", &means.means_code)?;
        if let Some(due) = &means.due_date {
            w.text_element("cbc:PaymentDueDate", &due.to_string())?;
        }
        w.end_element("cac:PaymentMeans")?;
    }

    if invoice.prepaid_amount > Decimal::ZERO {
        w.start_element("cac:PrepaidPayment")?
            .text_element("cbc:ID", "1")?
            .amount_element("cbc:PaidAmount", invoice.prepaid_amount, currency)?
            .end_element("cac:PrepaidPayment")?;
    }

    for total in &invoice.tax_totals {
        write_tax_total(&mut w, total, currency)?;
    }

    let totals = &invoice.monetary_total;
    w.start_element("cac:LegalMonetaryTotal")?
        .amount_element("cbc:LineExtensionAmount", totals.line_extension, currency)?
        .amount_element("cbc:TaxExclusiveAmount", totals.tax_exclusive, currency)?
        .amount_element("cbc:TaxInclusiveAmount", totals.tax_inclusive, currency)?;
    if invoice.prepaid_amount > Decimal::ZERO {
        w.amount_element("cbc:PrepaidAmount", invoice.prepaid_amount, currency)?;
    }
    w.amount_element("cbc:PayableAmount", totals.payable, currency)?
        .end_element("cac:LegalMonetaryTotal")?;

    for line in &invoice.lines {
        w.start_element("cac:InvoiceLine")?
            .text_element("cbc:ID", &line.id)?
            .quantity_element("cbc:InvoicedQuantity", line.quantity, &line.unit_code)?
            .amount_element("cbc:LineExtensionAmount", line.line_extension, currency)?;

        if let Some(tax) = &line.tax {
            write_tax_total(
                &mut w,
                &TaxTotal {
                    amount: tax.amount,
                    scheme: tax.scheme,
                    subtotal: Some(TaxSubtotal {
                        taxable_amount: tax.taxable_amount,
                        percent: tax.percent,
                    }),
                },
                currency,
            )?;
        }

        w.start_element("cac:Item")?
            .text_element("cbc:Description", &line.description)?;
        if let Some(item_id) = &line.item_id {
            w.start_element("cac:SellersItemIdentification")?
                .text_element("cbc:ID", item_id)?
                .end_element("cac:SellersItemIdentification")?;
        }
        w.end_element("cac:Item")?;

        w.start_element("cac:Price")?
            .amount_element("cbc:PriceAmount", line.unit_price, currency)?
            .quantity_element("cbc:BaseQuantity", line.quantity, &line.unit_code)?
            .end_element("cac:Price")?;

        w.end_element("cac:InvoiceLine")?;
    }

    w.end_element("Invoice")?;
    w.into_string()
}

fn write_party(w: &mut XmlWriter, wrapper: &str, party: &Party) -> Result<(), crate::core::FacturaError> {
    w.start_element(wrapper)?
        .text_element("cbc:AdditionalAccountID", party.person_type.code())?
        .start_element("cac:Party")?;

    w.start_element("cac:PartyName")?
        .text_element("cbc:Name", &party.registration_name)?
        .end_element("cac:PartyName")?;

    let addr = &party.address;
    w.start_element("cac:PhysicalLocation")?
        .start_element("cac:Address")?;
    if let Some(code) = &addr.city_code {
        w.text_element("cbc:ID", code)?;
    }
    w.text_element("cbc:CityName", &addr.city)?;
    if let Some(postal) = &addr.postal_code {
        w.text_element("cbc:PostalZone", postal)?;
    }
    w.text_element("cbc:CountrySubentity", &addr.department)?;
    if let Some(code) = &addr.department_code {
        w.text_element("cbc:CountrySubentityCode", code)?;
    }
    w.start_element("cac:AddressLine")?
        .text_element("cbc:Line", &addr.line)?
        .end_element("cac:AddressLine")?
        .start_element("cac:Country")?
        .text_element("cbc:IdentificationCode", &addr.country_code)?
        .end_element("cac:Country")?
        .end_element("cac:Address")?
        .end_element("cac:PhysicalLocation")?;

    let company_attrs = [
        ("schemeAgencyID", "195"),
        (
            "schemeAgencyName",
            "CO, DIAN (Dirección de Impuestos y Aduanas Nacionales)",
        ),
        ("schemeName", party.id_scheme.code()),
    ];

    w.start_element("cac:PartyTaxScheme")?
        .text_element("cbc:RegistrationName", &party.registration_name)?
        .text_element_with_attrs("cbc:CompanyID", &party.tax_id, &company_attrs)?;
    if let Some(level) = &party.tax_level_code {
        w.text_element_with_attrs("cbc:TaxLevelCode", level, &[("listName", "48")])?;
    }
    w.start_element("cac:TaxScheme")?
        .text_element("cbc:ID", "01")?
        .text_element("cbc:Name", "IVA")?
        .end_element("cac:TaxScheme")?
        .end_element("cac:PartyTaxScheme")?;

    w.start_element("cac:PartyLegalEntity")?
        .text_element("cbc:RegistrationName", &party.registration_name)?
        .text_element_with_attrs("cbc:CompanyID", &party.tax_id, &company_attrs)?
        .end_element("cac:PartyLegalEntity")?;

    if let Some(email) = &party.email {
        w.start_element("cac:Contact")?
            .text_element("cbc:ElectronicMail", email)?
            .end_element("cac:Contact")?;
    }

    w.end_element("cac:Party")?.end_element(wrapper)?;
    Ok(())
}

fn write_tax_total(
    w: &mut XmlWriter,
    total: &TaxTotal,
    currency: &str,
) -> Result<(), crate::core::FacturaError> {
    w.start_element("cac:TaxTotal")?
        .amount_element("cbc:TaxAmount", total.amount, currency)?;
    if let Some(sub) = &total.subtotal {
        w.start_element("cac:TaxSubtotal")?
            .amount_element("cbc:TaxableAmount", sub.taxable_amount, currency)?
            .amount_element("cbc:TaxAmount", total.amount, currency)?
            .start_element("cac:TaxCategory")?
            .text_element(
                "cbc:Percent",
                &crate::core::codes::format_amount(sub.percent),
            )?
            .start_element("cac:TaxScheme")?
            .text_element("cbc:ID", total.scheme.code())?
            .text_element("cbc:Name", total.scheme.name())?
            .end_element("cac:TaxScheme")?
            .end_element("cac:TaxCategory")?
            .end_element("cac:TaxSubtotal")?;
    }
    w.end_element("cac:TaxTotal")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn invoice() -> Invoice {
        let issued = DateTime::parse_from_rfc3339("2024-01-15T10:00:00-05:00").unwrap();
        let mut invoice = InvoiceBuilder::new("SETP990000001", issued)
            .supplier(
                PartyBuilder::new("Soluciones Andinas SAS", "900373115", TaxIdScheme::Nit)
                    .address(AddressBuilder::new("Calle 93 13-24", "Bogotá", "Bogotá D.C.").build())
                    .build(),
            )
            .customer(
                PartyBuilder::new("Carlos Pérez", "1032402388", TaxIdScheme::CitizenId)
                    .person_type(PersonType::Natural)
                    .address(AddressBuilder::new("Carrera 7 71-21", "Bogotá", "Bogotá D.C.").build())
                    .build(),
            )
            .add_line(
                LineBuilder::new("Servicio de consultoría", dec!(1), "94", dec!(100000))
                    .iva(dec!(19))
                    .build(),
            )
            .build();
        invoice.cufe = Some("c".repeat(96));
        invoice
    }

    #[test]
    fn extensions_come_first_with_signature_placeholder() {
        let xml = to_ubl_xml(&invoice(), "<sts:DianExtensions/>", Environment::Test).unwrap();
        let ext_pos = xml.find("<ext:UBLExtensions>").unwrap();
        let version_pos = xml.find("<cbc:UBLVersionID>").unwrap();
        assert!(ext_pos < version_pos);
        assert_eq!(xml.matches("<ext:UBLExtension>").count(), 2);
        assert_eq!(xml.matches(SIGNATURE_PLACEHOLDER).count(), 1);
    }

    #[test]
    fn environment_drives_profile_execution() {
        let xml = to_ubl_xml(&invoice(), "<sts:DianExtensions/>", Environment::Production).unwrap();
        assert!(xml.contains("<cbc:ProfileExecutionID>1</cbc:ProfileExecutionID>"));
        assert!(xml.contains("schemeID=\"1\""));
        let xml = to_ubl_xml(&invoice(), "<sts:DianExtensions/>", Environment::Test).unwrap();
        assert!(xml.contains("<cbc:ProfileExecutionID>2</cbc:ProfileExecutionID>"));
    }

    #[test]
    fn amounts_carry_currency_and_scale() {
        let xml = to_ubl_xml(&invoice(), "<sts:DianExtensions/>", Environment::Test).unwrap();
        assert!(xml.contains(
            "<cbc:PayableAmount currencyID=\"COP\">119000.00</cbc:PayableAmount>"
        ));
        assert!(xml.contains("<cbc:InvoicedQuantity unitCode=\"94\">1.00</cbc:InvoicedQuantity>"));
        assert!(xml.contains("<cbc:LineCountNumeric>1</cbc:LineCountNumeric>"));
    }

    #[test]
    fn issue_date_and_time_are_split() {
        let xml = to_ubl_xml(&invoice(), "<sts:DianExtensions/>", Environment::Test).unwrap();
        assert!(xml.contains("<cbc:IssueDate>2024-01-15</cbc:IssueDate>"));
        assert!(xml.contains("<cbc:IssueTime>10:00:00-05:00</cbc:IssueTime>"));
    }
}

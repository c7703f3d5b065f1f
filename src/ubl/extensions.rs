//! Authority-specific `sts:DianExtensions` block.

use chrono::NaiveDate;

use super::xml_utils::{XmlResult, XmlWriter};
use crate::core::codes::{qr_url, software_security_code};

/// NIT of the authorization provider (the authority itself).
pub const AUTHORITY_NIT: &str = "800197268";

const AGENCY_ID: &str = "195";
const AGENCY_NAME: &str = "CO, DIAN (Dirección de Impuestos y Aduanas Nacionales)";
const COUNTRY_LIST_URI: &str =
    "urn:oasis:names:specification:ubl:codelist:gc:CountryIdentificationCode-2.1";

/// Authorization metadata for the `DianExtensions` block.
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    /// Software provider NIT.
    pub nit: String,
    /// Software identifier assigned by the authority.
    pub software_id: String,
    /// Software PIN, hashed into the security code.
    pub pin: String,
    /// Invoice authorization (resolution) number.
    pub invoice_authorization: String,
    /// Authorization period.
    pub auth_start: NaiveDate,
    pub auth_end: NaiveDate,
    /// Authorized numbering range.
    pub invoice_prefix: String,
    pub auth_from: String,
    pub auth_to: String,
}

/// Render the `sts:DianExtensions` fragment for an invoice. The fragment
/// relies on the `sts` and `cbc` prefixes declared on the document root.
pub fn build_dian_extensions(
    config: &ExtensionConfig,
    invoice_id: &str,
    cufe: &str,
) -> XmlResult {
    let mut w = XmlWriter::fragment();

    w.start_element("sts:DianExtensions")?;

    w.start_element("sts:InvoiceControl")?
        .text_element("sts:InvoiceAuthorization", &config.invoice_authorization)?
        .start_element("sts:AuthorizationPeriod")?
        .text_element("cbc:StartDate", &config.auth_start.to_string())?
        .text_element("cbc:EndDate", &config.auth_end.to_string())?
        .end_element("sts:AuthorizationPeriod")?
        .start_element("sts:AuthorizedInvoices")?
        .text_element("sts:Prefix", &config.invoice_prefix)?
        .text_element("sts:From", &config.auth_from)?
        .text_element("sts:To", &config.auth_to)?
        .end_element("sts:AuthorizedInvoices")?
        .end_element("sts:InvoiceControl")?;

    w.start_element("sts:InvoiceSource")?
        .text_element_with_attrs(
            "cbc:IdentificationCode",
            "CO",
            &[
                ("listAgencyID", "6"),
                ("listAgencyName", "United Nations Economic Commission for Europe"),
                ("listSchemeURI", COUNTRY_LIST_URI),
            ],
        )?
        .end_element("sts:InvoiceSource")?;

    w.start_element("sts:SoftwareProvider")?
        .text_element_with_attrs(
            "sts:ProviderID",
            &config.nit,
            &[
                ("schemeID", "4"),
                ("schemeName", "31"),
                ("schemeAgencyID", AGENCY_ID),
                ("schemeAgencyName", AGENCY_NAME),
            ],
        )?
        .text_element_with_attrs(
            "sts:SoftwareID",
            &config.software_id,
            &[("schemeAgencyID", AGENCY_ID), ("schemeAgencyName", AGENCY_NAME)],
        )?
        .end_element("sts:SoftwareProvider")?;

    w.text_element_with_attrs(
        "sts:SoftwareSecurityCode",
        &software_security_code(&config.software_id, &config.pin),
        &[("schemeAgencyID", AGENCY_ID), ("schemeAgencyName", AGENCY_NAME)],
    )?;

    w.start_element("sts:AuthorizationProvider")?
        .text_element_with_attrs(
            "sts:AuthorizationProviderID",
            AUTHORITY_NIT,
            &[
                ("schemeID", "4"),
                ("schemeName", "31"),
                ("schemeAgencyID", AGENCY_ID),
                ("schemeAgencyName", AGENCY_NAME),
            ],
        )?
        .end_element("sts:AuthorizationProvider")?;

    w.text_element("sts:QRCode", &qr_url(&config.nit, invoice_id, cufe))?;

    w.end_element("sts:DianExtensions")?;
    w.into_string()
}

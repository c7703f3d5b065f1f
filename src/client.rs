//! Issuing pipeline: validation, CUFE, extensions, serialization, signing,
//! and transmission composed into a single synchronous call.

use chrono::NaiveDate;
use tracing::info;

use crate::core::{
    Environment, FacturaError, Invoice, codes, validate_invoice, validate_nit,
};
use crate::signature::{Credentials, XadesSigner};
use crate::soap::{Receipt, SoapClient};
use crate::ubl::{ExtensionConfig, build_dian_extensions, to_ubl_xml};

/// Issuer-side configuration: fiscal identity, software registration, and
/// the authorization resolution the invoices are numbered under.
#[derive(Debug, Clone)]
pub struct Config {
    /// Issuer NIT.
    pub nit: String,
    /// Software identifier registered with the authority.
    pub software_id: String,
    /// Software PIN.
    pub pin: String,
    /// Technical key of the numbering range; enters the CUFE in the test
    /// environment.
    pub technical_key: String,
    /// Target environment.
    pub environment: Environment,
    /// Authorization resolution number.
    pub invoice_authorization: String,
    /// Authorization validity period.
    pub auth_start: NaiveDate,
    pub auth_end: NaiveDate,
    /// Authorized prefix and numbering range.
    pub invoice_prefix: String,
    pub auth_from: String,
    pub auth_to: String,
}

impl Config {
    fn extension_config(&self) -> ExtensionConfig {
        ExtensionConfig {
            nit: self.nit.clone(),
            software_id: self.software_id.clone(),
            pin: self.pin.clone(),
            invoice_authorization: self.invoice_authorization.clone(),
            auth_start: self.auth_start,
            auth_end: self.auth_end,
            invoice_prefix: self.invoice_prefix.clone(),
            auth_from: self.auth_from.clone(),
            auth_to: self.auth_to.clone(),
        }
    }
}

/// Client composing the full issuing pipeline.
///
/// Components share no mutable state: configuration and credentials are
/// read-only, so independent orchestrations may run in parallel, one
/// invoice each.
pub struct DianClient {
    config: Config,
    credentials: Credentials,
    soap: SoapClient,
}

impl DianClient {
    /// Create a client. Fails when the NIT is malformed or the credential
    /// cannot back an mTLS identity.
    pub fn new(config: Config, credentials: Credentials) -> Result<Self, FacturaError> {
        validate_nit(&config.nit)
            .map_err(|e| FacturaError::InvalidInvoice(e.to_string()))?;
        let soap = SoapClient::new(config.environment, &credentials)?;
        Ok(Self {
            config,
            credentials,
            soap,
        })
    }

    /// Run the document-assembly pipeline without transmitting: validate,
    /// derive and store the CUFE, build the extension block, serialize, and
    /// sign. Returns the signed UBL document.
    pub fn signed_xml(&self, invoice: &mut Invoice) -> Result<String, FacturaError> {
        let violations = validate_invoice(invoice);
        if !violations.is_empty() {
            let joined = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FacturaError::InvalidInvoice(joined));
        }

        let cufe = codes::cufe(
            invoice,
            &self.config.nit,
            &self.config.technical_key,
            self.config.environment,
        )?;
        invoice.cufe = Some(cufe.clone());

        let extensions = build_dian_extensions(
            &self.config.extension_config(),
            &invoice.id,
            &cufe,
        )?;
        let xml = to_ubl_xml(invoice, &extensions, self.config.environment)?;
        XadesSigner::new(&self.credentials).sign_document(&xml)
    }

    /// Issue an invoice: assemble and sign the document, then submit it
    /// through `SendBillSync` and decode the authority's answer.
    ///
    /// A refused document is not an error at this level: the returned
    /// [`Receipt`] carries `accepted = false` together with the authority's
    /// error list. Use [`Receipt::ensure_accepted`] to turn refusals into
    /// [`FacturaError::Rejected`].
    pub async fn issue(&self, invoice: &mut Invoice) -> Result<Receipt, FacturaError> {
        let signed = self.signed_xml(invoice)?;
        let file_name = format!("{}.xml", invoice.id);

        info!(invoice = %invoice.id, endpoint = self.soap.endpoint(), "submitting invoice");
        let receipt = self
            .soap
            .send_bill_sync(&file_name, signed.as_bytes(), &self.credentials)
            .await?;
        info!(
            invoice = %invoice.id,
            accepted = receipt.accepted,
            status = %receipt.status_code,
            "authority answered"
        );
        Ok(receipt)
    }
}

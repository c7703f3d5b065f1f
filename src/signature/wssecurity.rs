//! WS-Security header construction: BinarySecurityToken, Timestamp, and a
//! detached signature over the Timestamp and the `wsa:To` address.
//!
//! This signature is independent of the invoice's XAdES signature: its
//! SignedInfo is exclusive-canonicalized and its references are resolved by
//! `wsu:Id` fragment identifiers inside the SOAP header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::credentials::Credentials;
use crate::core::FacturaError;
use crate::ubl::Canonicalizer;
use crate::ubl::xml_utils::XmlWriter;

pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";
const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

const ENCODING_BASE64: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
const VALUE_TYPE_X509V3: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";
const ALG_EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
const ALG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const ALG_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Validity window of the security timestamp.
pub const TIMESTAMP_WINDOW_SECS: i64 = 300;

/// `wsu:Timestamp` with millisecond-precision UTC instants.
#[derive(Debug, Clone)]
pub struct Timestamp {
    pub id: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Timestamp {
    /// A fresh timestamp valid for [`TIMESTAMP_WINDOW_SECS`] from now.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// A timestamp anchored at a given creation instant.
    pub fn at(created: DateTime<Utc>) -> Self {
        Self {
            id: format!("Timestamp-{}", Uuid::new_v4()),
            created,
            expires: created + Duration::seconds(TIMESTAMP_WINDOW_SECS),
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            "<wsu:Timestamp xmlns:wsu=\"{WSU_NS}\" wsu:Id=\"{}\"><wsu:Created>{}</wsu:Created><wsu:Expires>{}</wsu:Expires></wsu:Timestamp>",
            self.id,
            format_instant(&self.created),
            format_instant(&self.expires),
        )
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::new()
    }
}

/// `YYYY-MM-DDThh:mm:ss.sssZ`.
fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// A fully built WS-Security header plus the addressing elements it signs.
#[derive(Debug, Clone)]
pub struct WsSecurityHeader {
    pub security_token_id: String,
    pub timestamp: Timestamp,
    pub wsa_to_id: String,
    endpoint: String,
    cert_base64: String,
    signature_xml: String,
}

impl WsSecurityHeader {
    /// Serialize the header content: `wsse:Security` followed by the
    /// sibling `wsa:Action` and `wsa:To` elements.
    pub fn to_xml(&self, soap_action: &str) -> String {
        let mut xml = format!(
            "<wsse:Security xmlns:wsse=\"{WSSE_NS}\" xmlns:wsu=\"{WSU_NS}\">"
        );
        xml.push_str(&format!(
            "<wsse:BinarySecurityToken wsu:Id=\"{}\" EncodingType=\"{ENCODING_BASE64}\" ValueType=\"{VALUE_TYPE_X509V3}\">{}</wsse:BinarySecurityToken>",
            self.security_token_id, self.cert_base64,
        ));
        xml.push_str(&self.timestamp.to_xml());
        xml.push_str(&self.signature_xml);
        xml.push_str("</wsse:Security>");
        xml.push_str(&format!(
            "<wsa:Action xmlns:wsa=\"{WSA_NS}\">{soap_action}</wsa:Action>"
        ));
        xml.push_str(&wsa_to_xml(&self.wsa_to_id, &self.endpoint));
        xml
    }
}

fn wsa_to_xml(id: &str, endpoint: &str) -> String {
    format!(
        "<wsa:To xmlns:wsa=\"{WSA_NS}\" xmlns:wsu=\"{WSU_NS}\" wsu:Id=\"{id}\">{endpoint}</wsa:To>"
    )
}

/// Build the WS-Security header for a call to `endpoint`, signing the
/// timestamp and the `wsa:To` element with the credential key.
pub fn build_header(
    credentials: &Credentials,
    endpoint: &str,
) -> Result<WsSecurityHeader, FacturaError> {
    let security_token_id = format!("SecurityToken-{}", Uuid::new_v4());
    let wsa_to_id = format!("ID-{}", Uuid::new_v4());
    let timestamp = Timestamp::new();

    let signature_xml = sign_header(
        credentials,
        &timestamp,
        &security_token_id,
        &wsa_to_id,
        endpoint,
    )?;

    Ok(WsSecurityHeader {
        security_token_id,
        timestamp,
        wsa_to_id,
        endpoint: endpoint.to_string(),
        cert_base64: credentials.cert_base64(),
        signature_xml,
    })
}

fn sign_header(
    credentials: &Credentials,
    timestamp: &Timestamp,
    security_token_id: &str,
    wsa_to_id: &str,
    endpoint: &str,
) -> Result<String, FacturaError> {
    let canonicalizer = Canonicalizer::new();

    let ts_canonical = canonicalizer.canonicalize(&timestamp.to_xml())?;
    let ts_digest = STANDARD.encode(Sha256::digest(&ts_canonical));

    let to_canonical = canonicalizer.canonicalize(&wsa_to_xml(wsa_to_id, endpoint))?;
    let to_digest = STANDARD.encode(Sha256::digest(&to_canonical));

    let signed_info = build_signed_info(&timestamp.id, &ts_digest, wsa_to_id, &to_digest)?;
    let si_canonical = canonicalizer.canonicalize(&signed_info)?;
    let signature_value = credentials.sign_sha256(&Sha256::digest(&si_canonical))?;

    let mut w = XmlWriter::fragment();
    w.start_element_with_attrs("ds:Signature", &[("xmlns:ds", DS_NS)])?
        .raw(&signed_info)?
        .text_element("ds:SignatureValue", &STANDARD.encode(&signature_value))?
        .start_element("ds:KeyInfo")?
        .start_element_with_attrs("wsse:SecurityTokenReference", &[("xmlns:wsse", WSSE_NS)])?
        .empty_element_with_attrs(
            "wsse:Reference",
            &[
                ("URI", &format!("#{security_token_id}") as &str),
                ("ValueType", VALUE_TYPE_X509V3),
            ],
        )?
        .end_element("wsse:SecurityTokenReference")?
        .end_element("ds:KeyInfo")?
        .end_element("ds:Signature")?;
    w.into_string()
}

fn build_signed_info(
    timestamp_id: &str,
    timestamp_digest: &str,
    wsa_to_id: &str,
    wsa_to_digest: &str,
) -> Result<String, FacturaError> {
    let mut w = XmlWriter::fragment();
    w.start_element_with_attrs("ds:SignedInfo", &[("xmlns:ds", DS_NS)])?
        .empty_element_with_attrs("ds:CanonicalizationMethod", &[("Algorithm", ALG_EXC_C14N)])?
        .empty_element_with_attrs("ds:SignatureMethod", &[("Algorithm", ALG_RSA_SHA256)])?;

    for (id, digest) in [(timestamp_id, timestamp_digest), (wsa_to_id, wsa_to_digest)] {
        w.start_element_with_attrs("ds:Reference", &[("URI", &format!("#{id}") as &str)])?
            .start_element("ds:Transforms")?
            .empty_element_with_attrs("ds:Transform", &[("Algorithm", ALG_EXC_C14N)])?
            .end_element("ds:Transforms")?
            .empty_element_with_attrs("ds:DigestMethod", &[("Algorithm", ALG_SHA256)])?
            .text_element("ds:DigestValue", digest)?
            .end_element("ds:Reference")?;
    }

    w.end_element("ds:SignedInfo")?;
    w.into_string()
}

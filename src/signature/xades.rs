//! Enveloped XMLDSig + XAdES-EPES signature over the invoice document.
//!
//! The signature covers three references: the whole document (enveloped
//! transform), the `KeyInfo` element, and the XAdES `SignedProperties`.
//! Reference digests are taken over the exclusive canonical form of each
//! subtree, computed exactly as a verifier recomputes them from the final
//! document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, SecondsFormat};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::credentials::Credentials;
use crate::core::FacturaError;
use crate::ubl::xml_utils::XmlWriter;
use crate::ubl::{Canonicalizer, SIGNATURE_PLACEHOLDER, ns};

/// Signature policy published by the authority.
pub const POLICY_URL: &str =
    "https://facturaelectronica.dian.gov.co/politicadefirma/v2/politicadefirmav2.pdf";
/// SHA-256 of the published policy document, base64.
pub const POLICY_HASH: &str = "dMoMvtcG5aIzgYo0tIsSQeVJBDnUnfSOfBpxXrmor0Y=";
pub const POLICY_DESCRIPTION: &str =
    "Política de firma para facturas electrónicas de la República de Colombia";

const ALG_C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
const ALG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const ALG_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const ALG_ENVELOPED: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const XADES_SIGNED_PROPS: &str = "http://uri.etsi.org/01903#SignedProperties";

/// Produces and splices enveloped XAdES-EPES signatures.
pub struct XadesSigner<'a> {
    credentials: &'a Credentials,
    canonicalizer: Canonicalizer,
}

impl<'a> XadesSigner<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            credentials,
            canonicalizer: Canonicalizer::new(),
        }
    }

    /// Sign the serialized invoice and splice the signature into the empty
    /// extension placeholder. Every byte outside the insertion point is
    /// preserved.
    pub fn sign_document(&self, xml: &str) -> Result<String, FacturaError> {
        if !xml.contains(SIGNATURE_PLACEHOLDER) {
            return Err(FacturaError::SignatureAssembly(
                "document has no signature placeholder extension".into(),
            ));
        }

        let signature = self.build_signature(xml)?;
        let spliced = xml.replacen(
            SIGNATURE_PLACEHOLDER,
            &format!("<ext:ExtensionContent>{signature}</ext:ExtensionContent>"),
            1,
        );
        Ok(spliced)
    }

    /// Assemble the detached `ds:Signature` fragment for a document.
    pub fn build_signature(&self, xml: &str) -> Result<String, FacturaError> {
        let sid = format!("xmldsig-{}", Uuid::new_v4());
        let keyinfo_id = format!("{sid}-keyinfo");
        let props_id = format!("{sid}-signedprops");

        // R1: the whole document before the signature exists. Removing the
        // enveloped signature from the final document restores exactly the
        // empty placeholder digested here.
        let doc_canonical = self.canonicalizer.canonicalize(xml)?;
        let r1_digest = STANDARD.encode(Sha256::digest(&doc_canonical));

        let keyinfo_xml = self.build_keyinfo(&keyinfo_id)?;
        let wrapped_keyinfo = format!("<ds:Signature xmlns:ds=\"{}\">{keyinfo_xml}</ds:Signature>", ns::DS);
        let r2_digest = self.subtree_digest(&wrapped_keyinfo, &keyinfo_id)?;

        let props_xml = self.build_signed_properties(&props_id)?;
        let wrapped_props = format!(
            "<ds:Signature xmlns:ds=\"{}\"><ds:Object><xades:QualifyingProperties xmlns:xades=\"{}\">{props_xml}</xades:QualifyingProperties></ds:Object></ds:Signature>",
            ns::DS,
            ns::XADES,
        );
        let r3_digest = self.subtree_digest(&wrapped_props, &props_id)?;

        let signed_info = build_signed_info(&sid, &r1_digest, &keyinfo_id, &r2_digest, &props_id, &r3_digest)?;

        // Sign the canonical form of SignedInfo, which is what a verifier
        // reconstructs from the final document. The fragment declares the
        // ds prefix itself, so it canonicalizes standalone.
        let si_canonical = self.canonicalizer.canonicalize(&signed_info)?;
        let signature_value = self
            .credentials
            .sign_sha256(&Sha256::digest(&si_canonical))?;

        let mut w = XmlWriter::fragment();
        w.start_element_with_attrs(
            "ds:Signature",
            &[("xmlns:ds", ns::DS), ("Id", &sid)],
        )?
        .raw(&signed_info)?
        .text_element_with_attrs(
            "ds:SignatureValue",
            &STANDARD.encode(&signature_value),
            &[("Id", &format!("{sid}-sigvalue"))],
        )?
        .raw(&keyinfo_xml)?
        .start_element("ds:Object")?
        .start_element_with_attrs(
            "xades:QualifyingProperties",
            &[("xmlns:xades", ns::XADES), ("Target", &format!("#{sid}"))],
        )?
        .raw(&props_xml)?
        .end_element("xades:QualifyingProperties")?
        .end_element("ds:Object")?
        .end_element("ds:Signature")?;
        w.into_string()
    }

    /// Canonicalize the identified subtree of a wrapper document that
    /// reproduces the namespace context of the final assembly, then digest.
    fn subtree_digest(&self, wrapped: &str, id: &str) -> Result<String, FacturaError> {
        let canonical = self.canonicalizer.canonicalize_element(wrapped, id)?;
        Ok(STANDARD.encode(Sha256::digest(&canonical)))
    }

    fn build_keyinfo(&self, keyinfo_id: &str) -> Result<String, FacturaError> {
        let mut w = XmlWriter::fragment();
        w.start_element_with_attrs("ds:KeyInfo", &[("Id", keyinfo_id)])?
            .start_element("ds:X509Data")?
            .text_element("ds:X509Certificate", &self.credentials.cert_base64())?
            .end_element("ds:X509Data")?
            .end_element("ds:KeyInfo")?;
        w.into_string()
    }

    fn build_signed_properties(&self, props_id: &str) -> Result<String, FacturaError> {
        let cert_digest = STANDARD.encode(Sha256::digest(self.credentials.cert_der()));
        let signing_time = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let issuer = self.credentials.issuer_name()?;
        let serial = self.credentials.serial_decimal()?;

        let mut w = XmlWriter::fragment();
        w.start_element_with_attrs("xades:SignedProperties", &[("Id", props_id)])?
            .start_element("xades:SignedSignatureProperties")?
            .text_element("xades:SigningTime", &signing_time)?
            .start_element("xades:SigningCertificate")?
            .start_element("xades:Cert")?
            .start_element("xades:CertDigest")?
            .empty_element_with_attrs("ds:DigestMethod", &[("Algorithm", ALG_SHA256)])?
            .text_element("ds:DigestValue", &cert_digest)?
            .end_element("xades:CertDigest")?
            .start_element("xades:IssuerSerial")?
            .text_element("ds:X509IssuerName", &issuer)?
            .text_element("ds:X509SerialNumber", &serial)?
            .end_element("xades:IssuerSerial")?
            .end_element("xades:Cert")?
            .end_element("xades:SigningCertificate")?
            .start_element("xades:SignaturePolicyIdentifier")?
            .start_element("xades:SignaturePolicyId")?
            .start_element("xades:SigPolicyId")?
            .text_element("xades:Identifier", POLICY_URL)?
            .text_element("xades:Description", POLICY_DESCRIPTION)?
            .end_element("xades:SigPolicyId")?
            .start_element("xades:SigPolicyHash")?
            .empty_element_with_attrs("ds:DigestMethod", &[("Algorithm", ALG_SHA256)])?
            .text_element("ds:DigestValue", POLICY_HASH)?
            .end_element("xades:SigPolicyHash")?
            .end_element("xades:SignaturePolicyId")?
            .end_element("xades:SignaturePolicyIdentifier")?
            .end_element("xades:SignedSignatureProperties")?
            .end_element("xades:SignedProperties")?;
        w.into_string()
    }
}

fn build_signed_info(
    sid: &str,
    r1_digest: &str,
    keyinfo_id: &str,
    r2_digest: &str,
    props_id: &str,
    r3_digest: &str,
) -> Result<String, FacturaError> {
    let mut w = XmlWriter::fragment();
    w.start_element_with_attrs("ds:SignedInfo", &[("xmlns:ds", ns::DS)])?
        .empty_element_with_attrs("ds:CanonicalizationMethod", &[("Algorithm", ALG_C14N)])?
        .empty_element_with_attrs("ds:SignatureMethod", &[("Algorithm", ALG_RSA_SHA256)])?;

    // R1: the enveloped document.
    w.start_element_with_attrs(
        "ds:Reference",
        &[("Id", &format!("{sid}-ref0") as &str), ("URI", "")],
    )?
    .start_element("ds:Transforms")?
    .empty_element_with_attrs("ds:Transform", &[("Algorithm", ALG_ENVELOPED)])?
    .end_element("ds:Transforms")?
    .empty_element_with_attrs("ds:DigestMethod", &[("Algorithm", ALG_SHA256)])?
    .text_element("ds:DigestValue", r1_digest)?
    .end_element("ds:Reference")?;

    // R2: KeyInfo.
    w.start_element_with_attrs("ds:Reference", &[("URI", &format!("#{keyinfo_id}") as &str)])?
        .empty_element_with_attrs("ds:DigestMethod", &[("Algorithm", ALG_SHA256)])?
        .text_element("ds:DigestValue", r2_digest)?
        .end_element("ds:Reference")?;

    // R3: the XAdES SignedProperties.
    w.start_element_with_attrs(
        "ds:Reference",
        &[
            ("Type", XADES_SIGNED_PROPS),
            ("URI", &format!("#{props_id}") as &str),
        ],
    )?
    .empty_element_with_attrs("ds:DigestMethod", &[("Algorithm", ALG_SHA256)])?
    .text_element("ds:DigestValue", r3_digest)?
    .end_element("ds:Reference")?;

    w.end_element("ds:SignedInfo")?;
    w.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../../tests/fixtures/cert.pem");
    const KEY_PEM: &str = include_str!("../../tests/fixtures/key.pem");

    fn credentials() -> Credentials {
        Credentials::from_pem(CERT_PEM, KEY_PEM).unwrap()
    }

    fn doc() -> String {
        format!(
            "<Invoice xmlns=\"{}\" xmlns:ext=\"{}\"><ext:UBLExtensions><ext:UBLExtension><ext:ExtensionContent>x</ext:ExtensionContent></ext:UBLExtension><ext:UBLExtension>{SIGNATURE_PLACEHOLDER}</ext:UBLExtension></ext:UBLExtensions><cbc:ID xmlns:cbc=\"{}\">SETP1</cbc:ID></Invoice>",
            ns::INVOICE,
            ns::EXT,
            ns::CBC,
        )
    }

    #[test]
    fn splices_into_placeholder() {
        let creds = credentials();
        let signed = XadesSigner::new(&creds).sign_document(&doc()).unwrap();
        assert!(!signed.contains(SIGNATURE_PLACEHOLDER));
        assert!(signed.contains("<ext:ExtensionContent><ds:Signature"));
        // Bytes outside the insertion point are untouched.
        let original = doc();
        let (before, after) = original.split_once(SIGNATURE_PLACEHOLDER).unwrap();
        assert!(signed.starts_with(before));
        assert!(signed.ends_with(after));
    }

    #[test]
    fn signature_has_three_references() {
        let creds = credentials();
        let signature = XadesSigner::new(&creds).build_signature(&doc()).unwrap();
        assert_eq!(signature.matches("<ds:Reference").count(), 3);
        assert!(signature.contains(ALG_ENVELOPED));
        assert!(signature.contains(ALG_RSA_SHA256));
        assert!(signature.contains(POLICY_URL));
        assert!(signature.contains(POLICY_HASH));
    }

    #[test]
    fn missing_placeholder_is_rejected() {
        let creds = credentials();
        let err = XadesSigner::new(&creds)
            .sign_document("<Invoice></Invoice>")
            .unwrap_err();
        assert!(matches!(err, FacturaError::SignatureAssembly(_)));
    }
}

#![cfg(feature = "transmit")]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use facturacol::core::{Environment, FacturaError};
use facturacol::signature::{Credentials, build_header};
use facturacol::soap::{
    SOAP_ACTION, build_send_bill_sync, endpoint, extract_send_bill_sync_result,
    parse_application_response,
};
use facturacol::ubl::Canonicalizer;
use rsa::pkcs1v15::Pkcs1v15Sign;
use sha2::{Digest, Sha256};
use std::time::Duration;

const CERT_PEM: &str = include_str!("fixtures/cert.pem");
const KEY_PEM: &str = include_str!("fixtures/key.pem");

fn credentials() -> Credentials {
    Credentials::from_pem(CERT_PEM, KEY_PEM).unwrap()
}

fn between<'a>(haystack: &'a str, start: &str, end: &str) -> &'a str {
    let from = haystack.find(start).expect(start) + start.len();
    let len = haystack[from..].find(end).expect(end);
    &haystack[from..from + len]
}

#[test]
fn endpoints_per_environment() {
    assert_eq!(
        endpoint(Environment::Production),
        "https://vpfe.dian.gov.co/WcfDianCustomerServices.svc"
    );
    assert_eq!(
        endpoint(Environment::Test),
        "https://vpfe-hab.dian.gov.co/WcfDianCustomerServices.svc"
    );
}

#[test]
fn envelope_embeds_header_and_base64_payload() {
    let creds = credentials();
    let to = endpoint(Environment::Test);
    let header = build_header(&creds, to).unwrap();
    let payload = STANDARD.encode("<Invoice/>");
    let envelope =
        build_send_bill_sync("SETP990000001.xml", &payload, &header.to_xml(SOAP_ACTION)).unwrap();

    assert!(envelope.contains("<wsse:Security"));
    assert!(envelope.contains("<wsse:BinarySecurityToken"));
    assert!(envelope.contains(&format!("<wsa:Action xmlns:wsa=\"http://www.w3.org/2005/08/addressing\">{SOAP_ACTION}</wsa:Action>")));
    assert!(envelope.contains(to));
    assert!(envelope.contains("<wcf:fileName>SETP990000001.xml</wcf:fileName>"));
    assert!(envelope.contains(&format!("<wcf:contentFile>{payload}</wcf:contentFile>")));
}

/// The detached WS-Security signature must verify from the envelope alone:
/// extract the referenced subtrees by wsu:Id, canonicalize, digest, and
/// check the RSA signature over the canonical SignedInfo.
#[test]
fn ws_security_signature_verifies_from_envelope() {
    let creds = credentials();
    let header = build_header(&creds, endpoint(Environment::Test)).unwrap();
    let envelope =
        build_send_bill_sync("f.xml", "QQ==", &header.to_xml(SOAP_ACTION)).unwrap();

    let c14n = Canonicalizer::new();
    let signed_info = between(&envelope, "<ds:SignedInfo", "</ds:SignedInfo>");

    // Reference digests: Timestamp first, wsa:To second.
    for (id, nth) in [(header.timestamp.id.as_str(), 0), (header.wsa_to_id.as_str(), 1)] {
        let canonical = c14n.canonicalize_element(&envelope, id).unwrap();
        let expected = STANDARD.encode(Sha256::digest(&canonical));
        let digest = signed_info
            .match_indices("<ds:DigestValue>")
            .nth(nth)
            .map(|(pos, _)| between(&signed_info[pos..], "<ds:DigestValue>", "</ds:DigestValue>"))
            .unwrap();
        assert_eq!(digest, expected, "digest mismatch for {id}");
    }

    // SignedInfo signature.
    let si_with_end = &envelope[envelope.find("<ds:SignedInfo").unwrap()
        ..envelope.find("</ds:SignedInfo>").unwrap() + "</ds:SignedInfo>".len()];
    let canonical = c14n.canonicalize(si_with_end).unwrap();
    let digest = Sha256::digest(&canonical);
    let signature = STANDARD
        .decode(between(&envelope, "<ds:SignatureValue>", "</ds:SignatureValue>"))
        .unwrap();
    creds
        .public_key()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .expect("WS-Security signature must verify");
}

#[test]
fn token_reference_points_at_binary_security_token() {
    let creds = credentials();
    let header = build_header(&creds, endpoint(Environment::Test)).unwrap();
    let xml = header.to_xml(SOAP_ACTION);
    assert!(xml.contains(&format!(
        "<wsse:BinarySecurityToken wsu:Id=\"{}\"",
        header.security_token_id
    )));
    assert!(xml.contains(&format!("URI=\"#{}\"", header.security_token_id)));
    assert!(header.security_token_id.starts_with("SecurityToken-"));
    assert!(header.timestamp.id.starts_with("Timestamp-"));
}

/// Authority rejection: a round-trip that ends in a non-"00" code is a
/// receipt, not a transport error, and exposes the error list verbatim.
#[test]
fn rejected_application_response_yields_unaccepted_receipt() {
    let response = r#"<ApplicationResponse xmlns:cac="urn:cac" xmlns:cbc="urn:cbc">
        <cac:DocumentResponse>
          <cac:Response>
            <cbc:ResponseCode>99</cbc:ResponseCode>
            <cbc:Description>Documento con errores en campos mandatorios</cbc:Description>
          </cac:Response>
          <cac:DocumentReference><cbc:UUID>deadbeef</cbc:UUID></cac:DocumentReference>
          <cac:LineResponse>
            <cbc:Description>Regla: FAD06, Rechazo: NIT del emisor no autorizado</cbc:Description>
          </cac:LineResponse>
        </cac:DocumentResponse>
    </ApplicationResponse>"#;

    let receipt = parse_application_response(response)
        .unwrap()
        .into_receipt(Duration::from_millis(870));

    assert!(!receipt.accepted);
    assert_eq!(receipt.status_code, "99");
    assert_eq!(receipt.cufe, "deadbeef");
    assert_eq!(receipt.errors.len(), 2);
    assert!(receipt.errors[1].contains("FAD06"));

    match receipt.ensure_accepted() {
        Err(FacturaError::Rejected { status_code, errors }) => {
            assert_eq!(status_code, "99");
            assert_eq!(errors.len(), 2);
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn accepted_response_round_trips_through_base64() {
    let app = r#"<ApplicationResponse xmlns:cbc="urn:cbc" xmlns:cac="urn:cac"><cac:DocumentResponse><cac:Response><cbc:ResponseCode>00</cbc:ResponseCode><cbc:Description>Procesado Correctamente</cbc:Description></cac:Response><cac:DocumentReference><cbc:UUID>ok-cufe</cbc:UUID></cac:DocumentReference></cac:DocumentResponse></ApplicationResponse>"#;
    let envelope = format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><SendBillSyncResponse xmlns="http://wcf.dian.colombia"><SendBillSyncResult>{}</SendBillSyncResult></SendBillSyncResponse></s:Body></s:Envelope>"#,
        STANDARD.encode(app)
    );

    let inner = extract_send_bill_sync_result(&envelope).unwrap();
    let decoded = String::from_utf8(STANDARD.decode(inner).unwrap()).unwrap();
    let receipt = parse_application_response(&decoded)
        .unwrap()
        .into_receipt(Duration::from_millis(5));
    assert!(receipt.accepted);
    assert_eq!(receipt.status_message, "Procesado Correctamente");
    assert!(receipt.errors.is_empty());
}

//! SOAP 1.2 envelope assembly and ApplicationResponse decoding.

use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::core::FacturaError;
use crate::ubl::xml_utils::{XmlResult, XmlWriter};

/// SOAP 1.2 envelope namespace.
pub const SOAP_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
/// Authority service namespace.
pub const WCF_NS: &str = "http://wcf.dian.colombia";
/// Action of the synchronous submission operation.
pub const SOAP_ACTION: &str = "http://wcf.dian.colombia/IWcfDianCustomerServices/SendBillSync";

/// Assemble the `SendBillSync` envelope. `header_xml` is the WS-Security
/// header content, injected verbatim so its signed bytes are preserved;
/// `content_file` is the base64 payload.
pub fn build_send_bill_sync(
    file_name: &str,
    content_file: &str,
    header_xml: &str,
) -> XmlResult {
    let mut w = XmlWriter::document()?;
    w.start_element_with_attrs(
        "soap:Envelope",
        &[("xmlns:soap", SOAP_NS), ("xmlns:wcf", WCF_NS)],
    )?
    .start_element("soap:Header")?
    .raw(header_xml)?
    .end_element("soap:Header")?
    .start_element("soap:Body")?
    .start_element("wcf:SendBillSync")?
    .text_element("wcf:fileName", file_name)?
    .text_element("wcf:contentFile", content_file)?
    .end_element("wcf:SendBillSync")?
    .end_element("soap:Body")?
    .end_element("soap:Envelope")?;
    w.into_string()
}

/// Outcome of one synchronous submission.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// True iff the authority's response code was `"00"`.
    pub accepted: bool,
    /// Authority response code.
    pub status_code: String,
    /// Human-readable status.
    pub status_message: String,
    /// CUFE echoed by the authority.
    pub cufe: String,
    /// Error descriptions for rejected documents, verbatim.
    pub errors: Vec<String>,
    /// Measured round-trip duration.
    pub response_time: Duration,
}

impl Receipt {
    /// Convert a refused document into [`FacturaError::Rejected`].
    pub fn ensure_accepted(self) -> Result<Self, FacturaError> {
        if self.accepted {
            Ok(self)
        } else {
            Err(FacturaError::Rejected {
                status_code: self.status_code,
                errors: self.errors,
            })
        }
    }
}

/// Code of an accepted document.
const ACCEPTED_CODE: &str = "00";

/// Parsed fields of a UBL ApplicationResponse.
#[derive(Debug, Clone, Default)]
pub struct ApplicationResponse {
    pub response_code: String,
    pub status_message: String,
    pub cufe: String,
    pub errors: Vec<String>,
}

impl ApplicationResponse {
    pub fn into_receipt(self, response_time: Duration) -> Receipt {
        Receipt {
            accepted: self.response_code == ACCEPTED_CODE,
            status_code: self.response_code,
            status_message: self.status_message,
            cufe: self.cufe,
            errors: self.errors,
            response_time,
        }
    }
}

/// Extract the base64 `SendBillSyncResult` text from the response envelope.
pub fn extract_send_bill_sync_result(envelope: &str) -> Result<String, FacturaError> {
    let mut reader = Reader::from_str(envelope);
    let mut in_result = false;
    let mut result = String::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(FacturaError::TransportBody(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                if local_name_is(start.name().as_ref(), "SendBillSyncResult") {
                    in_result = true;
                }
            }
            Ok(Event::End(end)) => {
                if local_name_is(end.name().as_ref(), "SendBillSyncResult") && in_result {
                    return Ok(result);
                }
            }
            Ok(Event::Text(text)) if in_result => {
                let chunk = text
                    .unescape()
                    .map_err(|e| FacturaError::TransportBody(e.to_string()))?;
                result.push_str(chunk.trim());
            }
            Ok(_) => {}
        }
    }

    Err(FacturaError::TransportBody(
        "response envelope has no SendBillSyncResult".into(),
    ))
}

/// Parse the ApplicationResponse document returned by the authority.
///
/// The walk is namespace-prefix agnostic: elements are matched by local
/// name within their enclosing aggregate.
pub fn parse_application_response(xml: &str) -> Result<ApplicationResponse, FacturaError> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut response = ApplicationResponse::default();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Err(e) => return Err(FacturaError::TransportBody(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let local = local_of(start.name().as_ref()).to_string();
                if path.is_empty() {
                    if local != "ApplicationResponse" {
                        return Err(FacturaError::TransportBody(format!(
                            "expected ApplicationResponse root, found {local}"
                        )));
                    }
                    seen_root = true;
                }
                path.push(local);
            }
            Ok(Event::Empty(_)) => {}
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|e| FacturaError::TransportBody(e.to_string()))?
                    .trim()
                    .to_string();
                if value.is_empty() {
                    continue;
                }
                match path_suffix(&path) {
                    ("Response", "ResponseCode") if response.response_code.is_empty() => {
                        response.response_code = value;
                    }
                    ("Response", "Description") | ("LineResponse", "Description") => {
                        if response.status_message.is_empty() {
                            response.status_message = value.clone();
                        }
                        response.errors.push(value);
                    }
                    ("Status", "StatusReason") if response.status_message.is_empty() => {
                        response.status_message = value;
                    }
                    ("DocumentReference", "UUID") if response.cufe.is_empty() => {
                        response.cufe = value;
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
        }
    }

    if !seen_root {
        return Err(FacturaError::TransportBody(
            "empty ApplicationResponse document".into(),
        ));
    }
    // An accepted document should not carry its acceptance note as errors.
    if response.response_code == ACCEPTED_CODE {
        response.errors.clear();
    }
    Ok(response)
}

fn path_suffix(path: &[String]) -> (&str, &str) {
    match path {
        [.., parent, leaf] => (parent.as_str(), leaf.as_str()),
        [leaf] => ("", leaf.as_str()),
        [] => ("", ""),
    }
}

fn local_of(qname: &[u8]) -> &str {
    let s = std::str::from_utf8(qname).unwrap_or_default();
    match s.rsplit_once(':') {
        Some((_, local)) => local,
        None => s,
    }
}

fn local_name_is(qname: &[u8], expected: &str) -> bool {
    local_of(qname) == expected
}

//! Synchronous SOAP transport over mutual TLS.

use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use super::envelope::{
    SOAP_ACTION, build_send_bill_sync, extract_send_bill_sync_result, parse_application_response,
};
use super::{Receipt, endpoint};
use crate::core::{Environment, FacturaError};
use crate::signature::{Credentials, build_header};

/// Total budget for one round-trip, connection included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of a single submission. Terminal in the last three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransmissionState {
    Idle,
    Connecting,
    Sending,
    AwaitingResponse,
    Parsing,
    Accepted,
    Rejected,
    Failed,
}

/// SOAP client bound to one environment and one client certificate.
pub struct SoapClient {
    http: reqwest::Client,
    endpoint: &'static str,
}

impl SoapClient {
    /// Build an mTLS client (TLS ≥ 1.2) presenting the signing credential
    /// as the client identity.
    pub fn new(environment: Environment, credentials: &Credentials) -> Result<Self, FacturaError> {
        let identity = reqwest::Identity::from_pem(credentials.identity_pem().as_bytes())
            .map_err(|e| {
                FacturaError::CredentialLoad(format!("building TLS identity: {e}"))
            })?;

        let http = reqwest::Client::builder()
            .identity(identity)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FacturaError::CredentialLoad(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint(environment),
        })
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// Submit a signed invoice through `SendBillSync` and decode the
    /// ApplicationResponse. The payload travels base64-encoded under the
    /// given file name.
    pub async fn send_bill_sync(
        &self,
        file_name: &str,
        signed_xml: &[u8],
        credentials: &Credentials,
    ) -> Result<Receipt, FacturaError> {
        let mut state = TransmissionState::Idle;
        let started = Instant::now();

        let header = build_header(credentials, self.endpoint)?;
        let envelope = build_send_bill_sync(
            file_name,
            &STANDARD.encode(signed_xml),
            &header.to_xml(SOAP_ACTION),
        )?;

        state = transition(state, TransmissionState::Connecting);
        let request = self
            .http
            .post(self.endpoint)
            .header("Content-Type", "application/soap+xml;charset=UTF-8")
            .header("SOAPAction", SOAP_ACTION)
            .header("Accept", "application/soap+xml")
            .body(envelope);

        state = transition(state, TransmissionState::Sending);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                transition(state, TransmissionState::Failed);
                return Err(if e.is_timeout() {
                    FacturaError::TransportTimeout
                } else {
                    FacturaError::TransportHttp {
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        body: e.to_string(),
                    }
                });
            }
        };

        state = transition(state, TransmissionState::AwaitingResponse);
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                transition(state, TransmissionState::Failed);
                return Err(if e.is_timeout() {
                    FacturaError::TransportTimeout
                } else {
                    FacturaError::TransportBody(e.to_string())
                });
            }
        };

        if status.as_u16() != 200 {
            transition(state, TransmissionState::Failed);
            return Err(FacturaError::TransportHttp {
                status: status.as_u16(),
                body,
            });
        }

        state = transition(state, TransmissionState::Parsing);
        let receipt = decode_response(&body, started.elapsed())?;
        transition(
            state,
            if receipt.accepted {
                TransmissionState::Accepted
            } else {
                TransmissionState::Rejected
            },
        );
        Ok(receipt)
    }
}

fn transition(from: TransmissionState, to: TransmissionState) -> TransmissionState {
    debug!(?from, ?to, "transmission state");
    to
}

/// Decode a 200 response body: unwrap the SOAP envelope, base64-decode the
/// result, parse the ApplicationResponse.
fn decode_response(body: &str, response_time: Duration) -> Result<Receipt, FacturaError> {
    let result_b64 = extract_send_bill_sync_result(body)?;
    let response_xml = STANDARD
        .decode(result_b64.as_bytes())
        .map_err(|e| FacturaError::TransportBody(format!("base64 result: {e}")))?;
    let response_xml = String::from_utf8(response_xml)
        .map_err(|e| FacturaError::TransportBody(format!("result encoding: {e}")))?;
    let response = parse_application_response(&response_xml)?;
    Ok(response.into_receipt(response_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_unwraps_envelope_and_base64() {
        let app_response = r#"<ApplicationResponse xmlns:cac="urn:cac" xmlns:cbc="urn:cbc"><cac:DocumentResponse><cac:Response><cbc:ResponseCode>00</cbc:ResponseCode></cac:Response><cac:DocumentReference><cbc:UUID>cufe-value</cbc:UUID></cac:DocumentReference></cac:DocumentResponse></ApplicationResponse>"#;
        let encoded = STANDARD.encode(app_response);
        let envelope = format!(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><SendBillSyncResponse xmlns="http://wcf.dian.colombia"><SendBillSyncResult>{encoded}</SendBillSyncResult></SendBillSyncResponse></s:Body></s:Envelope>"#
        );
        let receipt = decode_response(&envelope, Duration::from_millis(10)).unwrap();
        assert!(receipt.accepted);
        assert_eq!(receipt.cufe, "cufe-value");
    }

    #[test]
    fn malformed_base64_is_a_body_error() {
        let envelope = r#"<e><SendBillSyncResult>!!</SendBillSyncResult></e>"#;
        assert!(matches!(
            decode_response(envelope, Duration::ZERO),
            Err(FacturaError::TransportBody(_))
        ));
    }
}

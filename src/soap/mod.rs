//! SOAP 1.2 transport: envelope assembly, the synchronous `SendBillSync`
//! call over mutual TLS, and ApplicationResponse decoding.

mod client;
mod envelope;

pub use client::{REQUEST_TIMEOUT, SoapClient};
pub use envelope::{
    ApplicationResponse, Receipt, SOAP_ACTION, build_send_bill_sync,
    extract_send_bill_sync_result, parse_application_response,
};

use crate::core::Environment;

/// Per-environment service endpoint.
pub fn endpoint(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "https://vpfe.dian.gov.co/WcfDianCustomerServices.svc",
        Environment::Test => "https://vpfe-hab.dian.gov.co/WcfDianCustomerServices.svc",
    }
}

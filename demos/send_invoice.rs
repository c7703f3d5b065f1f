//! Sign an invoice and submit it to the test environment.
//!
//! Expects the certificate paths and authorization data in environment
//! variables, e.g.:
//!
//! ```sh
//! export FACTURACOL_P12=certificado.p12
//! export FACTURACOL_P12_PASSWORD=secreta
//! cargo run --example send_invoice --features transmit
//! ```

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use facturacol::core::*;
use facturacol::signature::Credentials;
use facturacol::{Config, DianClient};
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let p12 = std::env::var("FACTURACOL_P12")?;
    let password = std::env::var("FACTURACOL_P12_PASSWORD")?;
    let credentials = Credentials::from_pkcs12_file(&p12, &password)?;

    let config = Config {
        nit: std::env::var("FACTURACOL_NIT")?,
        software_id: std::env::var("FACTURACOL_SOFTWARE_ID")?,
        pin: std::env::var("FACTURACOL_PIN")?,
        technical_key: std::env::var("FACTURACOL_TECHNICAL_KEY")?,
        environment: Environment::Test,
        invoice_authorization: "18760000001".into(),
        auth_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        auth_end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        invoice_prefix: "SETP".into(),
        auth_from: "990000000".into(),
        auth_to: "995000000".into(),
    };
    let nit = config.nit.clone();
    let client = DianClient::new(config, credentials)?;

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let issued = DateTime::parse_from_rfc3339(&now)?;
    let mut invoice = InvoiceBuilder::new("SETP990000001", issued)
        .supplier(
            PartyBuilder::new("Soluciones Andinas SAS", nit, TaxIdScheme::Nit)
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

    let receipt = client.issue(&mut invoice).await?;
    println!(
        "accepted={} status={} message={} in {:?}",
        receipt.accepted, receipt.status_code, receipt.status_message, receipt.response_time
    );
    for error in &receipt.errors {
        println!("  error: {error}");
    }
    Ok(())
}

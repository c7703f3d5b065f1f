//! Build an invoice, derive its CUFE, and print the UBL document ready for
//! signing.
//!
//! Run with: `cargo run --example basic_invoice --features ubl`

use chrono::{DateTime, NaiveDate};
use facturacol::core::*;
use facturacol::ubl::{self, ExtensionConfig};
use rust_decimal_macros::dec;

fn main() {
    let issued = DateTime::parse_from_rfc3339("2024-01-15T10:00:00-05:00").unwrap();

    let mut invoice = InvoiceBuilder::new("SETP990000001", issued)
        .supplier(
            PartyBuilder::new("Soluciones Andinas SAS", "900373115", TaxIdScheme::Nit)
                .tax_level_code("O-13")
                .email("facturacion@andinas.co")
                .address(
                    AddressBuilder::new("Calle 93 13-24", "Bogotá", "Bogotá D.C.")
                        .city_code("11001")
                        .department_code("11")
                        .build(),
                )
                .build(),
        )
        .customer(
            PartyBuilder::new("Carlos Pérez", "1032402388", TaxIdScheme::CitizenId)
                .person_type(PersonType::Natural)
                .address(AddressBuilder::new("Carrera 7 71-21", "Bogotá", "Bogotá D.C.").build())
                .build(),
        )
        .payment_means(PaymentMeans {
            id: "1".into(),
            means_code: "10".into(),
            due_date: None,
        })
        .add_line(
            LineBuilder::new("Servicio de consultoría", dec!(1), "94", dec!(100000))
                .iva(dec!(19))
                .build(),
        )
        .build();

    let violations = validate_invoice(&invoice);
    if !violations.is_empty() {
        for v in &violations {
            eprintln!("invalid: {v}");
        }
        std::process::exit(1);
    }

    let cufe = cufe(
        &invoice,
        "900373115",
        "fc8eac422eba16e22ffd8c6f94b3f40a6e38162c",
        Environment::Test,
    )
    .expect("invoice carries IVA");
    println!("CUFE: {cufe}");
    println!("QR:   {}", qr_url("900373115", &invoice.id, &cufe));
    invoice.cufe = Some(cufe.clone());

    let extensions = ubl::build_dian_extensions(
        &ExtensionConfig {
            nit: "900373115".into(),
            software_id: "e4e52dc6-a624-4b06-b041-f4e60ad5ea44".into(),
            pin: "pin12345".into(),
            invoice_authorization: "18760000001".into(),
            auth_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            auth_end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            invoice_prefix: "SETP".into(),
            auth_from: "990000000".into(),
            auth_to: "995000000".into(),
        },
        &invoice.id,
        &cufe,
    )
    .unwrap();

    let xml = ubl::to_ubl_xml(&invoice, &extensions, Environment::Test).unwrap();
    println!("{xml}");
}

use chrono::{DateTime, NaiveDate};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use facturacol::core::*;
use facturacol::signature::{Credentials, XadesSigner};
use facturacol::ubl::{self, Canonicalizer, ExtensionConfig};

const CERT_PEM: &str = include_str!("../tests/fixtures/cert.pem");
const KEY_PEM: &str = include_str!("../tests/fixtures/key.pem");

fn build_10_line_invoice() -> Invoice {
    let issued = DateTime::parse_from_rfc3339("2024-01-15T10:00:00-05:00").unwrap();
    let mut builder = InvoiceBuilder::new("SETP990000001", issued)
        .supplier(
            PartyBuilder::new("Soluciones Andinas SAS", "900373115", TaxIdScheme::Nit)
                .address(AddressBuilder::new("Calle 93 13-24", "Bogotá", "Bogotá D.C.").build())
                .build(),
        )
        .customer(
            PartyBuilder::new("Carlos Pérez", "1032402388", TaxIdScheme::CitizenId)
                .address(AddressBuilder::new("Carrera 7 71-21", "Bogotá", "Bogotá D.C.").build())
                .build(),
        );
    for i in 0..10 {
        builder = builder.add_line(
            LineBuilder::new(format!("Ítem {i}"), dec!(2), "94", dec!(45000))
                .iva(dec!(19))
                .build(),
        );
    }
    builder.build()
}

fn unsigned_xml() -> String {
    let mut invoice = build_10_line_invoice();
    let cufe = cufe(
        &invoice,
        "900373115",
        "fc8eac422eba16e22ffd8c6f94b3f40a6e38162c",
        Environment::Test,
    )
    .unwrap();
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
    ubl::to_ubl_xml(&invoice, &extensions, Environment::Test).unwrap()
}

fn bench_serialize(c: &mut Criterion) {
    let invoice = build_10_line_invoice();
    c.bench_function("serialize_10_lines", |b| {
        b.iter(|| {
            cufe(
                black_box(&invoice),
                "900373115",
                "fc8eac422eba16e22ffd8c6f94b3f40a6e38162c",
                Environment::Test,
            )
            .unwrap()
        })
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    let xml = unsigned_xml();
    let canonicalizer = Canonicalizer::new();
    c.bench_function("canonicalize_invoice", |b| {
        b.iter(|| canonicalizer.canonicalize(black_box(&xml)).unwrap())
    });
}

fn bench_sign(c: &mut Criterion) {
    let xml = unsigned_xml();
    let credentials = Credentials::from_pem(CERT_PEM, KEY_PEM).unwrap();
    let signer = XadesSigner::new(&credentials);
    c.bench_function("xades_sign_invoice", |b| {
        b.iter(|| signer.sign_document(black_box(&xml)).unwrap())
    });
}

criterion_group!(benches, bench_serialize, bench_canonicalize, bench_sign);
criterion_main!(benches);

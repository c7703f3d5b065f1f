use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Electronic sales invoice — the top-level document sent to the authority.
///
/// Constructed by the caller (usually through [`InvoiceBuilder`]), mutated
/// only during orchestration (the CUFE is written into [`Invoice::cufe`]),
/// then read-only for signing.
///
/// [`InvoiceBuilder`]: crate::core::InvoiceBuilder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Business identifier: authorization prefix + sequence (e.g. "SETP990000001").
    pub id: String,
    /// Issue instant with the issuer's UTC offset. Date and time parts are
    /// formatted separately on the wire (`YYYY-MM-DD`, `HH:MM:SS±HH:MM`).
    pub issued_at: DateTime<FixedOffset>,
    /// Payment due date.
    pub due_date: Option<NaiveDate>,
    /// DIAN invoice type code.
    pub type_code: InvoiceTypeCode,
    /// CUFE, populated during orchestration. Carried as `cbc:UUID`.
    pub cufe: Option<String>,
    /// Document currency code (ISO 4217, e.g. "COP").
    pub currency: String,
    /// Free-text notes.
    pub notes: Vec<String>,
    /// Supplier (emisor).
    pub supplier: Party,
    /// Customer (adquiriente).
    pub customer: Party,
    /// Payment means entries.
    pub payment_means: Vec<PaymentMeans>,
    /// Invoice lines. At least one is required.
    pub lines: Vec<InvoiceLine>,
    /// Document-level tax totals, one per tax scheme.
    pub tax_totals: Vec<TaxTotal>,
    /// Prepaid amount, subtracted from the tax-inclusive total.
    pub prepaid_amount: Decimal,
    /// Legal monetary total (set by `compute_totals()` or by the caller).
    pub monetary_total: MonetaryTotal,
}

impl Invoice {
    /// Number of invoice lines, carried as `cbc:LineCountNumeric`.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Issue date formatted as `YYYY-MM-DD`.
    pub fn issue_date(&self) -> String {
        self.issued_at.format("%Y-%m-%d").to_string()
    }

    /// Issue time formatted as `HH:MM:SS±HH:MM`.
    pub fn issue_time(&self) -> String {
        self.issued_at.format("%H:%M:%S%:z").to_string()
    }

    /// The document-level tax total for the given scheme, if present.
    pub fn tax_total(&self, scheme: TaxSchemeCode) -> Option<&TaxTotal> {
        self.tax_totals.iter().find(|t| t.scheme == scheme)
    }

    /// Derive the document tax totals and the legal monetary total from the
    /// invoice lines. Line extension amounts are summed as-is; per-line
    /// taxes are aggregated by scheme.
    pub fn compute_totals(&mut self) {
        let mut line_extension = Decimal::ZERO;
        let mut totals: Vec<TaxTotal> = Vec::new();

        for line in &self.lines {
            line_extension += line.line_extension;
            if let Some(tax) = &line.tax {
                match totals.iter_mut().find(|t| t.scheme == tax.scheme) {
                    Some(total) => {
                        total.amount += tax.amount;
                        if let Some(sub) = &mut total.subtotal {
                            sub.taxable_amount += tax.taxable_amount;
                        }
                    }
                    None => totals.push(TaxTotal {
                        amount: tax.amount,
                        scheme: tax.scheme,
                        subtotal: Some(TaxSubtotal {
                            taxable_amount: tax.taxable_amount,
                            percent: tax.percent,
                        }),
                    }),
                }
            }
        }

        let tax_amount: Decimal = totals.iter().map(|t| t.amount).sum();
        self.tax_totals = totals;
        self.monetary_total = MonetaryTotal {
            line_extension,
            tax_exclusive: line_extension,
            tax_inclusive: line_extension + tax_amount,
            payable: line_extension + tax_amount - self.prepaid_amount,
        };
    }
}

/// Target environment of the authority's platform.
///
/// Drives the endpoint, the `cbc:ProfileExecutionID`, the `schemeID` of the
/// CUFE, and whether the technical key enters the CUFE derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Production,
    Test,
}

impl Environment {
    /// Profile execution code: "1" production, "2" test (habilitación).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Production => "1",
            Self::Test => "2",
        }
    }
}

/// DIAN invoice type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceTypeCode {
    /// 01 — Factura electrónica de venta.
    SalesInvoice,
    /// 02 — Factura de exportación.
    ExportInvoice,
    /// 03 — Factura por contingencia facturador.
    ContingencyInvoice,
    /// 91 — Nota crédito.
    CreditNote,
    /// 92 — Nota débito.
    DebitNote,
}

impl InvoiceTypeCode {
    /// DIAN numeric code as carried in `cbc:InvoiceTypeCode`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SalesInvoice => "01",
            Self::ExportInvoice => "02",
            Self::ContingencyInvoice => "03",
            Self::CreditNote => "91",
            Self::DebitNote => "92",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::SalesInvoice),
            "02" => Some(Self::ExportInvoice),
            "03" => Some(Self::ContingencyInvoice),
            "91" => Some(Self::CreditNote),
            "92" => Some(Self::DebitNote),
            _ => None,
        }
    }
}

/// A party (supplier or customer) with its fiscal identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    /// Registered legal name.
    pub registration_name: String,
    /// Fiscal identifier (NIT without verification digit, cédula number, or
    /// foreign document number).
    pub tax_id: String,
    /// Scheme of the fiscal identifier.
    pub id_scheme: TaxIdScheme,
    /// Legal (juridical) or natural person, `cbc:AdditionalAccountID`.
    pub person_type: PersonType,
    /// Fiscal responsibility code (e.g. "O-13"), `cbc:TaxLevelCode`.
    pub tax_level_code: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Postal address.
    pub address: Address,
}

/// Closed set of fiscal identification schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxIdScheme {
    /// 31 — NIT (Número de Identificación Tributaria).
    Nit,
    /// 13 — Cédula de ciudadanía.
    CitizenId,
    /// 42 — Documento de identificación extranjero.
    Foreign,
}

impl TaxIdScheme {
    /// DIAN document-type code, `@schemeName` on `cbc:CompanyID`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Nit => "31",
            Self::CitizenId => "13",
            Self::Foreign => "42",
        }
    }
}

/// Person type carried as `cbc:AdditionalAccountID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonType {
    /// 1 — Persona jurídica.
    Legal,
    /// 2 — Persona natural.
    Natural,
}

impl PersonType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Legal => "1",
            Self::Natural => "2",
        }
    }
}

/// Postal address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Street line.
    pub line: String,
    /// City name.
    pub city: String,
    /// DANE municipality code (e.g. "11001" for Bogotá).
    pub city_code: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Department (country subdivision) name.
    pub department: String,
    /// DANE department code (e.g. "11").
    pub department_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
}

/// Payment means entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMeans {
    /// Payment form: "1" contado, "2" crédito.
    pub id: String,
    /// Payment means code (e.g. "10" cash, "48" card, "42" bank transfer).
    pub means_code: String,
    /// Payment due date for credit forms.
    pub due_date: Option<NaiveDate>,
}

/// Invoice line, ordered within the invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Line identifier, 1-based position as a string.
    pub id: String,
    /// Invoiced quantity.
    pub quantity: Decimal,
    /// Unit of measure (UNECE Rec 20, e.g. "94" unit, "HUR" hour).
    pub unit_code: String,
    /// Net unit price.
    pub unit_price: Decimal,
    /// Line extension amount. Must equal `quantity × unit_price` within
    /// 0.01 of a currency unit.
    pub line_extension: Decimal,
    /// Per-line tax.
    pub tax: Option<LineTax>,
    /// Item description.
    pub description: String,
    /// Seller's item identifier.
    pub item_id: Option<String>,
}

/// Per-line tax amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTax {
    /// Taxable base, normally the line extension amount.
    pub taxable_amount: Decimal,
    /// Tax amount.
    pub amount: Decimal,
    /// Rate percentage.
    pub percent: Decimal,
    /// Tax scheme.
    pub scheme: TaxSchemeCode,
}

/// Document-level tax total for one scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxTotal {
    /// Total tax amount for the scheme.
    pub amount: Decimal,
    /// Tax scheme.
    pub scheme: TaxSchemeCode,
    /// Aggregated subtotal.
    pub subtotal: Option<TaxSubtotal>,
}

/// Taxable base and rate backing a [`TaxTotal`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSubtotal {
    pub taxable_amount: Decimal,
    pub percent: Decimal,
}

/// DIAN tax scheme codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxSchemeCode {
    /// 01 — IVA (value added tax).
    Iva,
    /// 03 — ICA (industry and commerce).
    Ica,
    /// 04 — INC (national consumption tax).
    Inc,
    /// 06 — ReteFuente (income withholding).
    ReteFuente,
}

impl TaxSchemeCode {
    /// `cbc:ID` of the `cac:TaxScheme`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Iva => "01",
            Self::Ica => "03",
            Self::Inc => "04",
            Self::ReteFuente => "06",
        }
    }

    /// `cbc:Name` of the `cac:TaxScheme`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Iva => "IVA",
            Self::Ica => "ICA",
            Self::Inc => "INC",
            Self::ReteFuente => "ReteFuente",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Iva),
            "03" => Some(Self::Ica),
            "04" => Some(Self::Inc),
            "06" => Some(Self::ReteFuente),
            _ => None,
        }
    }
}

/// Legal monetary total of the invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonetaryTotal {
    /// Sum of all line extension amounts.
    pub line_extension: Decimal,
    /// Total before taxes.
    pub tax_exclusive: Decimal,
    /// Total including taxes: `tax_exclusive + Σ tax amounts`.
    pub tax_inclusive: Decimal,
    /// Amount due: `tax_inclusive − prepaid`.
    pub payable: Decimal,
}

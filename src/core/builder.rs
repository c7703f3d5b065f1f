use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;

use super::types::*;

/// Builder for constructing invoices.
///
/// ```
/// use chrono::DateTime;
/// use facturacol::core::*;
/// use rust_decimal_macros::dec;
///
/// let issued = DateTime::parse_from_rfc3339("2024-01-15T10:00:00-05:00").unwrap();
/// let mut invoice = InvoiceBuilder::new("SETP990000001", issued)
///     .supplier(
///         PartyBuilder::new("Soluciones Andinas SAS", "900373115", TaxIdScheme::Nit)
///             .address(AddressBuilder::new("Calle 93 13-24", "Bogotá", "Bogotá D.C.").build())
///             .build(),
///     )
///     .customer(
///         PartyBuilder::new("Carlos Pérez", "1032402388", TaxIdScheme::CitizenId)
///             .person_type(PersonType::Natural)
///             .address(AddressBuilder::new("Carrera 7 71-21", "Bogotá", "Bogotá D.C.").build())
///             .build(),
///     )
///     .add_line(
///         LineBuilder::new("Servicio de consultoría", dec!(1), "94", dec!(100000))
///             .iva(dec!(19))
///             .build(),
///     )
///     .build();
///
/// assert_eq!(invoice.monetary_total.payable, dec!(119000.00));
/// ```
pub struct InvoiceBuilder {
    id: String,
    issued_at: DateTime<FixedOffset>,
    due_date: Option<NaiveDate>,
    type_code: InvoiceTypeCode,
    currency: String,
    notes: Vec<String>,
    supplier: Option<Party>,
    customer: Option<Party>,
    payment_means: Vec<PaymentMeans>,
    lines: Vec<InvoiceLine>,
    prepaid_amount: Decimal,
}

impl InvoiceBuilder {
    /// Create a builder with the required document id and issue instant.
    pub fn new(id: impl Into<String>, issued_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: id.into(),
            issued_at,
            due_date: None,
            type_code: InvoiceTypeCode::SalesInvoice,
            currency: "COP".to_string(),
            notes: Vec::new(),
            supplier: None,
            customer: None,
            payment_means: Vec::new(),
            lines: Vec::new(),
            prepaid_amount: Decimal::ZERO,
        }
    }

    /// Set the payment due date.
    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Set the invoice type code. Defaults to `SalesInvoice` ("01").
    pub fn type_code(mut self, code: InvoiceTypeCode) -> Self {
        self.type_code = code;
        self
    }

    /// Set the document currency. Defaults to `"COP"`.
    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = code.into();
        self
    }

    /// Add a free-text note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Set the supplier party. Required.
    pub fn supplier(mut self, party: Party) -> Self {
        self.supplier = Some(party);
        self
    }

    /// Set the customer party. Required.
    pub fn customer(mut self, party: Party) -> Self {
        self.customer = Some(party);
        self
    }

    /// Add a payment means entry.
    pub fn payment_means(mut self, means: PaymentMeans) -> Self {
        self.payment_means.push(means);
        self
    }

    /// Add an invoice line. At least one is required. Line ids are assigned
    /// from the insertion order.
    pub fn add_line(mut self, mut line: InvoiceLine) -> Self {
        line.id = (self.lines.len() + 1).to_string();
        self.lines.push(line);
        self
    }

    /// Set the prepaid amount subtracted from the payable total.
    pub fn prepaid(mut self, amount: Decimal) -> Self {
        self.prepaid_amount = amount;
        self
    }

    /// Assemble the invoice and derive its totals. Validation is deferred
    /// to [`validate_invoice`]; missing parties are left as placeholder
    /// values it will flag.
    ///
    /// [`validate_invoice`]: crate::core::validate_invoice
    pub fn build(self) -> Invoice {
        let placeholder = || Party {
            registration_name: String::new(),
            tax_id: String::new(),
            id_scheme: TaxIdScheme::Nit,
            person_type: PersonType::Legal,
            tax_level_code: None,
            email: None,
            address: Address {
                line: String::new(),
                city: String::new(),
                city_code: None,
                postal_code: None,
                department: String::new(),
                department_code: None,
                country_code: "CO".to_string(),
            },
        };

        let mut invoice = Invoice {
            id: self.id,
            issued_at: self.issued_at,
            due_date: self.due_date,
            type_code: self.type_code,
            cufe: None,
            currency: self.currency,
            notes: self.notes,
            supplier: self.supplier.unwrap_or_else(placeholder),
            customer: self.customer.unwrap_or_else(placeholder),
            payment_means: self.payment_means,
            lines: self.lines,
            tax_totals: Vec::new(),
            prepaid_amount: self.prepaid_amount,
            monetary_total: MonetaryTotal::default(),
        };
        invoice.compute_totals();
        invoice
    }
}

/// Builder for parties.
pub struct PartyBuilder {
    registration_name: String,
    tax_id: String,
    id_scheme: TaxIdScheme,
    person_type: PersonType,
    tax_level_code: Option<String>,
    email: Option<String>,
    address: Option<Address>,
}

impl PartyBuilder {
    pub fn new(
        registration_name: impl Into<String>,
        tax_id: impl Into<String>,
        id_scheme: TaxIdScheme,
    ) -> Self {
        Self {
            registration_name: registration_name.into(),
            tax_id: tax_id.into(),
            id_scheme,
            person_type: PersonType::Legal,
            tax_level_code: None,
            email: None,
            address: None,
        }
    }

    /// Set the person type. Defaults to `Legal`.
    pub fn person_type(mut self, person_type: PersonType) -> Self {
        self.person_type = person_type;
        self
    }

    /// Set the fiscal responsibility code (e.g. "O-13").
    pub fn tax_level_code(mut self, code: impl Into<String>) -> Self {
        self.tax_level_code = Some(code.into());
        self
    }

    /// Set the contact email.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the postal address.
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn build(self) -> Party {
        Party {
            registration_name: self.registration_name,
            tax_id: self.tax_id,
            id_scheme: self.id_scheme,
            person_type: self.person_type,
            tax_level_code: self.tax_level_code,
            email: self.email,
            address: self.address.unwrap_or(Address {
                line: String::new(),
                city: String::new(),
                city_code: None,
                postal_code: None,
                department: String::new(),
                department_code: None,
                country_code: "CO".to_string(),
            }),
        }
    }
}

/// Builder for addresses.
pub struct AddressBuilder {
    line: String,
    city: String,
    city_code: Option<String>,
    postal_code: Option<String>,
    department: String,
    department_code: Option<String>,
    country_code: String,
}

impl AddressBuilder {
    pub fn new(
        line: impl Into<String>,
        city: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            line: line.into(),
            city: city.into(),
            city_code: None,
            postal_code: None,
            department: department.into(),
            department_code: None,
            country_code: "CO".to_string(),
        }
    }

    /// Set the DANE municipality code.
    pub fn city_code(mut self, code: impl Into<String>) -> Self {
        self.city_code = Some(code.into());
        self
    }

    pub fn postal_code(mut self, code: impl Into<String>) -> Self {
        self.postal_code = Some(code.into());
        self
    }

    /// Set the DANE department code.
    pub fn department_code(mut self, code: impl Into<String>) -> Self {
        self.department_code = Some(code.into());
        self
    }

    /// Set the country code. Defaults to `"CO"`.
    pub fn country(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    pub fn build(self) -> Address {
        Address {
            line: self.line,
            city: self.city,
            city_code: self.city_code,
            postal_code: self.postal_code,
            department: self.department,
            department_code: self.department_code,
            country_code: self.country_code,
        }
    }
}

/// Builder for invoice lines.
pub struct LineBuilder {
    description: String,
    quantity: Decimal,
    unit_code: String,
    unit_price: Decimal,
    tax: Option<LineTax>,
    item_id: Option<String>,
}

impl LineBuilder {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_code: impl Into<String>,
        unit_price: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_code: unit_code.into(),
            unit_price,
            tax: None,
            item_id: None,
        }
    }

    /// Apply IVA at the given rate percentage over the line extension.
    pub fn iva(self, percent: Decimal) -> Self {
        self.tax(TaxSchemeCode::Iva, percent)
    }

    /// Apply a tax of the given scheme and rate over the line extension.
    pub fn tax(mut self, scheme: TaxSchemeCode, percent: Decimal) -> Self {
        let base = (self.quantity * self.unit_price).round_dp(2);
        self.tax = Some(LineTax {
            taxable_amount: base,
            amount: (base * percent / Decimal::from(100)).round_dp(2),
            percent,
            scheme,
        });
        self
    }

    /// Set the seller's item identifier.
    pub fn item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    pub fn build(self) -> InvoiceLine {
        InvoiceLine {
            id: String::new(),
            quantity: self.quantity,
            unit_code: self.unit_code,
            unit_price: self.unit_price,
            line_extension: (self.quantity * self.unit_price).round_dp(2),
            tax: self.tax,
            description: self.description,
            item_id: self.item_id,
        }
    }
}

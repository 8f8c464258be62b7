use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::wire::{
    deserialize_optional_date, deserialize_optional_timestamp, deserialize_timestamp,
    null_as_default,
};
use crate::workflows::applications::{
    ApplicationId, ApplicationKind, ApplicationStatus, ContactDetails, IdentityDetails,
};

/// Money in minor units (fils). Serialized as a JSON number of whole units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Panics on overflow; use [`Amount::checked_from_units`] for untrusted input.
    pub const fn from_units(units: u64) -> Self {
        Amount(units * 100)
    }

    pub const fn checked_from_units(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(minor) => Some(Amount(minor)),
            None => None,
        }
    }

    pub const fn checked_add(self, rhs: Amount) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(minor) => Some(Amount(minor)),
            None => None,
        }
    }

    pub const fn from_minor(minor: u64) -> Self {
        Amount(minor)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Whole units, truncating any fractional part.
    pub const fn whole_units(self) -> u64 {
        self.0 / 100
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "AED {}", self.0 / 100)
        } else {
            write!(f, "AED {}.{:02}", self.0 / 100, self.0 % 100)
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.0 as f64 / 100.0)
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let units = f64::deserialize(deserializer)?;
        if !units.is_finite() || units < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "amount must be a non-negative number, found {units}"
            )));
        }
        Ok(Amount((units * 100.0).round() as u64))
    }
}

/// Fee table for card applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    base: Amount,
    lanyard: Amount,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base: Amount::from_units(100),
            lanyard: Amount::from_units(20),
        }
    }
}

impl FeeSchedule {
    /// `None` when base plus lanyard does not fit in an [`Amount`].
    pub fn new(base: Amount, lanyard: Amount) -> Option<Self> {
        base.checked_add(lanyard)?;
        Some(Self { base, lanyard })
    }

    pub fn base(&self) -> Amount {
        self.base
    }

    pub fn lanyard(&self) -> Amount {
        self.lanyard
    }

    pub fn quote(&self, include_lanyard: bool) -> PaymentQuote {
        let lanyard = if include_lanyard {
            self.lanyard
        } else {
            Amount::ZERO
        };
        PaymentQuote {
            base: self.base,
            lanyard,
            total: Amount(self.base.0 + lanyard.0),
        }
    }
}

/// `base + surcharge` when the lanyard is included, `base` otherwise. `None` on overflow.
pub fn compute_total(
    base: Amount,
    lanyard_surcharge: Amount,
    include_lanyard: bool,
) -> Option<Amount> {
    if include_lanyard {
        base.checked_add(lanyard_surcharge)
    } else {
        Some(base)
    }
}

/// Amounts recorded on a payment, derived from the fee table and the lanyard flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentQuote {
    pub base: Amount,
    pub lanyard: Amount,
    pub total: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Submitted,
    Confirmed,
    Skipped,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Submitted => "Submitted",
            PaymentStatus::Confirmed => "Confirmed",
            PaymentStatus::Skipped => "Skipped",
        }
    }

    /// Whether an administrator may still settle the payment.
    pub const fn is_open(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Submitted)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "submitted" => Ok(PaymentStatus::Submitted),
            "confirmed" => Ok(PaymentStatus::Confirmed),
            "skipped" => Ok(PaymentStatus::Skipped),
            _ => Err(format!("unknown payment status '{s}'")),
        }
    }
}

/// Declared payment methods. Only bank transfer is actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    Paypal,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditCard,
        PaymentMethod::Paypal,
    ];

    pub const fn is_available(self) -> bool {
        matches!(self, PaymentMethod::BankTransfer)
    }

    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::CreditCard => "credit-card",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who is paying, pre-filled from the application's identity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentContact {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl PaymentContact {
    pub fn from_identity(identity: &IdentityDetails, contact: &ContactDetails) -> Self {
        Self {
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            phone_number: contact.phone_number.clone(),
        }
    }
}

/// Create payload for `POST /Payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub application_type: ApplicationKind,
    pub application_id: ApplicationId,
    #[serde(flatten)]
    pub contact: PaymentContact,
    pub base_amount: Amount,
    pub lanyard_amount: Amount,
    pub total_amount: Amount,
    pub include_lanyard: bool,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
}

/// Applicant claim of a completed bank transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferConfirmation {
    #[serde(flatten)]
    pub contact: PaymentContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub transfer_date: Option<NaiveDate>,
}

/// Optional transfer details the applicant may add when confirming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferDetails {
    pub transaction_reference: Option<String>,
    pub bank_name: Option<String>,
    pub transfer_date: Option<NaiveDate>,
}

/// Admin payload for `PUT /Payment/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub transfer_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

impl PaymentStatusUpdate {
    pub fn new(payment_status: PaymentStatus, admin_notes: Option<String>) -> Self {
        Self {
            payment_status,
            transaction_reference: None,
            bank_name: None,
            transfer_date: None,
            admin_notes,
        }
    }
}

/// Payment record as held by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub application_type: ApplicationKind,
    pub application_id: ApplicationId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
    pub base_amount: Amount,
    pub lanyard_amount: Amount,
    pub total_amount: Amount,
    pub include_lanyard: bool,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub transfer_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
}

impl Payment {
    /// Whether the stored total agrees with base plus the lanyard surcharge.
    pub fn total_is_consistent(&self) -> bool {
        let expected = compute_total(self.base_amount, self.lanyard_amount, self.include_lanyard);
        let lanyard_ok = self.include_lanyard || self.lanyard_amount == Amount::ZERO;
        lanyard_ok && expected == Some(self.total_amount)
    }

    /// Reference the applicant quotes on the bank transfer.
    pub fn transfer_reference(&self) -> String {
        transfer_reference(self.application_type, self.application_id)
    }

    /// Free-text search over names, phone, id, and transaction reference.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        let lowered = term.to_lowercase();
        self.first_name.to_lowercase().contains(&lowered)
            || self.last_name.to_lowercase().contains(&lowered)
            || self.phone_number.contains(term)
            || self.id.0.to_string().contains(term)
            || self
                .transaction_reference
                .as_deref()
                .is_some_and(|reference| reference.to_lowercase().contains(&lowered))
    }
}

pub fn transfer_reference(kind: ApplicationKind, id: ApplicationId) -> String {
    format!("{}-{}", kind.payment_type(), id)
}

/// Admin listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentQuery {
    pub page: u32,
    pub page_size: u32,
    pub status: Option<PaymentStatus>,
}

impl Default for PaymentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// Fallback used when the service omits pagination metadata.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            current_page: page,
            page_size,
            total_items: 0,
            total_pages: 1,
            has_next_page: false,
            has_previous_page: false,
        }
    }

    pub fn compute(page: u32, page_size: u32, total_items: u64) -> Self {
        let size = u64::from(page_size.max(1));
        let total_pages = total_items.div_ceil(size).max(1) as u32;
        Self {
            current_page: page,
            page_size,
            total_items,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub payments: Vec<Payment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pagination: Option<Pagination>,
}

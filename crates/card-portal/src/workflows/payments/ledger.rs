//! Administrator view over recorded payments.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Pagination, Payment, PaymentId, PaymentPage, PaymentQuery, PaymentStatus, PaymentStatusUpdate,
};
use crate::client::{ClientError, PortalBackend};
use crate::workflows::applications::ApplicationKind;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to load payments: {0}")]
    Load(#[source] ClientError),
    #[error("payment {0} not found")]
    NotFound(PaymentId),
    #[error("payment {id} is already {current}; only pending or submitted payments can be settled")]
    AlreadySettled { id: PaymentId, current: PaymentStatus },
    #[error("payments can only be settled as Confirmed or Skipped, not {0}")]
    InvalidTarget(PaymentStatus),
    #[error("failed to update payment status: {0}")]
    Update(#[source] ClientError),
    #[error("failed to write CSV export: {0}")]
    Export(#[from] csv::Error),
}

impl LedgerError {
    pub fn action(&self) -> &'static str {
        match self {
            LedgerError::Load(_) | LedgerError::NotFound(_) => "load payments",
            LedgerError::AlreadySettled { .. }
            | LedgerError::InvalidTarget(_)
            | LedgerError::Update(_) => "update payment status",
            LedgerError::Export(_) => "export payments",
        }
    }
}

/// Client-side narrowing applied to a fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub search: Option<String>,
    pub application_type: Option<ApplicationKind>,
}

impl LedgerFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |term| payment.matches_search(term));
        let kind_ok = self
            .application_type
            .map_or(true, |kind| payment.application_type == kind);
        search_ok && kind_ok
    }
}

/// A page of payments as shown to the administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerPage {
    pub payments: Vec<Payment>,
    pub pagination: Pagination,
    /// Records the service returned that did not match the requested status.
    pub discarded: usize,
}

pub struct PaymentLedger<B> {
    backend: Arc<B>,
}

impl<B> PaymentLedger<B>
where
    B: PortalBackend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Fetches one page. Records whose status differs from the requested one are dropped even
    /// if the service returned them.
    pub fn page(&self, query: &PaymentQuery, filter: &LedgerFilter) -> Result<LedgerPage, LedgerError> {
        let PaymentPage {
            mut payments,
            pagination,
        } = self.backend.list_payments(query).map_err(LedgerError::Load)?;

        let fetched = payments.len();
        if let Some(status) = query.status {
            payments.retain(|payment| payment.payment_status == status);
        }
        let discarded = fetched - payments.len();
        if discarded > 0 {
            warn!(
                requested = ?query.status,
                discarded,
                "payment listing returned records outside the requested status"
            );
        }

        payments.retain(|payment| filter.matches(payment));
        let pagination =
            pagination.unwrap_or_else(|| Pagination::empty(query.page, query.page_size));
        debug!(page = query.page, shown = payments.len(), "payment page loaded");

        Ok(LedgerPage {
            payments,
            pagination,
            discarded,
        })
    }

    /// Walks every page for the query.
    pub fn all(&self, query: &PaymentQuery, filter: &LedgerFilter) -> Result<Vec<Payment>, LedgerError> {
        let mut query = query.clone();
        query.page = query.page.max(1);
        let mut collected = Vec::new();
        loop {
            let page = self.page(&query, filter)?;
            collected.extend(page.payments);
            if !page.pagination.has_next_page || query.page >= page.pagination.total_pages {
                break;
            }
            query.page += 1;
        }
        Ok(collected)
    }

    pub fn get(&self, id: PaymentId) -> Result<Payment, LedgerError> {
        self.backend
            .get_payment(id)
            .map_err(LedgerError::Load)?
            .ok_or(LedgerError::NotFound(id))
    }

    pub fn confirm(&self, id: PaymentId, notes: Option<String>) -> Result<Payment, LedgerError> {
        self.settle(id, PaymentStatus::Confirmed, notes)
    }

    pub fn mark_skipped(&self, id: PaymentId, notes: Option<String>) -> Result<Payment, LedgerError> {
        self.settle(id, PaymentStatus::Skipped, notes)
    }

    /// Moves an open payment to `target`, re-reading the current record first.
    pub fn settle(
        &self,
        id: PaymentId,
        target: PaymentStatus,
        notes: Option<String>,
    ) -> Result<Payment, LedgerError> {
        if !matches!(target, PaymentStatus::Confirmed | PaymentStatus::Skipped) {
            return Err(LedgerError::InvalidTarget(target));
        }

        let current = self.get(id)?;
        if !current.payment_status.is_open() {
            return Err(LedgerError::AlreadySettled {
                id,
                current: current.payment_status,
            });
        }

        let notes = notes.filter(|text| !text.trim().is_empty());
        let updated = self
            .backend
            .update_payment_status(id, &PaymentStatusUpdate::new(target, notes))
            .map_err(LedgerError::Update)?;
        info!(payment_id = %id, from = %current.payment_status, to = %target, "payment settled");
        Ok(updated)
    }
}

#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    id: u64,
    application_type: &'static str,
    application_id: u64,
    first_name: &'a str,
    last_name: &'a str,
    phone_number: &'a str,
    base_amount: String,
    lanyard_amount: String,
    total_amount: String,
    include_lanyard: bool,
    payment_method: &'static str,
    payment_status: &'static str,
    transfer_reference: String,
    transaction_reference: &'a str,
    bank_name: &'a str,
    transfer_date: String,
    created_at: String,
    admin_notes: &'a str,
}

impl<'a> From<&'a Payment> for PaymentRow<'a> {
    fn from(payment: &'a Payment) -> Self {
        Self {
            id: payment.id.0,
            application_type: payment.application_type.payment_type(),
            application_id: payment.application_id.0,
            first_name: &payment.first_name,
            last_name: &payment.last_name,
            phone_number: &payment.phone_number,
            base_amount: payment.base_amount.to_string(),
            lanyard_amount: payment.lanyard_amount.to_string(),
            total_amount: payment.total_amount.to_string(),
            include_lanyard: payment.include_lanyard,
            payment_method: payment.payment_method.label(),
            payment_status: payment.payment_status.label(),
            transfer_reference: payment.transfer_reference(),
            transaction_reference: payment.transaction_reference.as_deref().unwrap_or_default(),
            bank_name: payment.bank_name.as_deref().unwrap_or_default(),
            transfer_date: payment
                .transfer_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            created_at: payment.created_at.to_rfc3339(),
            admin_notes: payment.admin_notes.as_deref().unwrap_or_default(),
        }
    }
}

/// Writes payments as CSV with a header row.
pub fn export_csv<W: io::Write>(payments: &[Payment], writer: W) -> Result<(), LedgerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for payment in payments {
        csv_writer.serialize(PaymentRow::from(payment))?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

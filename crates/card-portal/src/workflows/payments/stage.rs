//! Inline payment finalization after an application is committed.
//!
//! The applicant either confirms a bank transfer or skips ("pay later"). Both paths first create
//! the payment record as `Pending`; confirming moves it to `Submitted` and leaves `Confirmed` to
//! an administrator. Totals are recomputed from the lanyard flag on every read.

use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{
    transfer_reference, Amount, BankTransferConfirmation, FeeSchedule, NewPayment, Payment,
    PaymentContact, PaymentMethod, PaymentQuote, PaymentStatus, TransferDetails,
};
use crate::client::{ClientError, PortalBackend};
use crate::workflows::applications::{ApplicationId, ApplicationKind, SubmittedApplication};

#[derive(Debug, thiserror::Error)]
pub enum PaymentStageError {
    #[error("please fill in all required fields (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0} is not available yet; please use bank transfer")]
    MethodUnavailable(PaymentMethod),
    #[error("the payment was already created; its amounts can no longer change")]
    AmountsLocked,
    #[error("payment creation failed: {0}")]
    Create(#[source] ClientError),
    #[error("bank transfer confirmation failed: {0}")]
    Confirm(#[source] ClientError),
    #[error("skipping payment failed: {0}")]
    Skip(#[source] ClientError),
}

impl PaymentStageError {
    pub fn action(&self) -> &'static str {
        match self {
            PaymentStageError::MissingFields(_) => "confirm payment details",
            PaymentStageError::MethodUnavailable(_) => "select payment method",
            PaymentStageError::AmountsLocked => "change lanyard option",
            PaymentStageError::Create(_) => "create payment",
            PaymentStageError::Confirm(_) => "confirm bank transfer",
            PaymentStageError::Skip(_) => "skip payment",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentStageError::Create(err)
            | PaymentStageError::Confirm(err)
            | PaymentStageError::Skip(err) => err.is_retryable(),
            _ => false,
        }
    }
}

pub struct PaymentStage<B> {
    backend: Arc<B>,
    kind: ApplicationKind,
    application_id: ApplicationId,
    fees: FeeSchedule,
    include_lanyard: bool,
    method: PaymentMethod,
    contact: PaymentContact,
    payment: Option<Payment>,
}

impl<B> PaymentStage<B>
where
    B: PortalBackend + 'static,
{
    pub fn new(
        backend: Arc<B>,
        application: &SubmittedApplication,
        contact: PaymentContact,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            backend,
            kind: application.kind(),
            application_id: application.id,
            fees,
            include_lanyard: application.fields.include_lanyard,
            method: PaymentMethod::BankTransfer,
            contact,
            payment: None,
        }
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    pub fn include_lanyard(&self) -> bool {
        self.include_lanyard
    }

    /// Toggles the lanyard add-on. Refused once the payment record exists.
    pub fn set_include_lanyard(&mut self, include: bool) -> Result<(), PaymentStageError> {
        if self.payment.is_some() && include != self.include_lanyard {
            return Err(PaymentStageError::AmountsLocked);
        }
        self.include_lanyard = include;
        Ok(())
    }

    pub fn quote(&self) -> PaymentQuote {
        self.fees.quote(self.include_lanyard)
    }

    pub fn total(&self) -> Amount {
        self.quote().total
    }

    /// Reference to quote on the bank transfer.
    pub fn transfer_reference(&self) -> String {
        transfer_reference(self.kind, self.application_id)
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn select_method(&mut self, method: PaymentMethod) -> Result<(), PaymentStageError> {
        if !method.is_available() {
            return Err(PaymentStageError::MethodUnavailable(method));
        }
        self.method = method;
        Ok(())
    }

    pub fn contact(&self) -> &PaymentContact {
        &self.contact
    }

    pub fn contact_mut(&mut self) -> &mut PaymentContact {
        &mut self.contact
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    /// Whether the stage reached a terminal applicant-side status.
    pub fn is_finished(&self) -> bool {
        self.payment.as_ref().is_some_and(|payment| {
            matches!(
                payment.payment_status,
                PaymentStatus::Submitted | PaymentStatus::Skipped | PaymentStatus::Confirmed
            )
        })
    }

    /// Required contact fields for bank transfer.
    pub fn validate(&self) -> Result<(), PaymentStageError> {
        if self.method != PaymentMethod::BankTransfer {
            return Ok(());
        }
        let missing: Vec<&'static str> = [
            ("firstName", &self.contact.first_name),
            ("lastName", &self.contact.last_name),
            ("phoneNumber", &self.contact.phone_number),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentStageError::MissingFields(missing))
        }
    }

    fn new_payment(&self) -> NewPayment {
        let quote = self.quote();
        NewPayment {
            application_type: self.kind,
            application_id: self.application_id,
            contact: self.contact.clone(),
            base_amount: quote.base,
            lanyard_amount: quote.lanyard,
            total_amount: quote.total,
            include_lanyard: self.include_lanyard,
            payment_method: self.method,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// Creates the `Pending` payment record once; later calls reuse it.
    pub fn ensure_payment(&mut self) -> Result<&Payment, PaymentStageError> {
        let payment = match self.payment.take() {
            Some(payment) => payment,
            None => match self.backend.create_payment(&self.new_payment()) {
                Ok(created) => {
                    info!(
                        payment_id = %created.id,
                        application_id = %self.application_id,
                        total = %created.total_amount,
                        "payment record created"
                    );
                    created
                }
                Err(err) => self.recover_committed(err)?,
            },
        };
        Ok(self.payment.insert(payment))
    }

    /// A create that timed out or conflicted may already be committed; reuse that record.
    fn recover_committed(&self, err: ClientError) -> Result<Payment, PaymentStageError> {
        let ambiguous = matches!(err, ClientError::Timeout | ClientError::Transport(_))
            || err.status() == Some(409);
        if !ambiguous {
            return Err(PaymentStageError::Create(err));
        }
        match self
            .backend
            .payment_for_application(self.kind, self.application_id)
        {
            Ok(Some(existing)) => {
                info!(
                    payment_id = %existing.id,
                    application_id = %self.application_id,
                    status = %existing.payment_status,
                    "reusing payment committed by an earlier attempt"
                );
                Ok(existing)
            }
            Ok(None) => Err(PaymentStageError::Create(err)),
            Err(lookup) => {
                warn!(
                    application_id = %self.application_id,
                    error = %lookup,
                    "could not look up an existing payment"
                );
                Err(PaymentStageError::Create(err))
            }
        }
    }

    /// Records the applicant's bank transfer claim.
    pub fn confirm_bank_transfer(
        &mut self,
        details: TransferDetails,
    ) -> Result<&Payment, PaymentStageError> {
        self.validate()?;
        let payment_id = self.ensure_payment()?.id;

        let confirmation = BankTransferConfirmation {
            contact: self.contact.clone(),
            transaction_reference: details.transaction_reference,
            bank_name: details.bank_name,
            transfer_date: details.transfer_date,
        };
        let updated = self
            .backend
            .confirm_bank_transfer(payment_id, &confirmation)
            .map_err(PaymentStageError::Confirm)?;
        info!(%payment_id, status = %updated.payment_status, "bank transfer confirmation recorded");
        Ok(self.payment.insert(updated))
    }

    /// Defers payment. Requires no contact fields.
    pub fn skip(&mut self) -> Result<&Payment, PaymentStageError> {
        let payment_id = self.ensure_payment()?.id;
        let updated = self
            .backend
            .skip_payment(payment_id)
            .map_err(PaymentStageError::Skip)?;
        info!(%payment_id, "payment skipped");
        Ok(self.payment.insert(updated))
    }
}

//! Access to the remote application/payment/card service.
//!
//! `PortalBackend` is the seam the workflows are written against. `HttpPortalClient` speaks the
//! REST API; the sandbox store implements the same trait in memory.

pub mod download;
mod http;
mod multipart;

use std::fmt;

pub use http::{AdminSession, HttpPortalClient};

use crate::workflows::applications::{
    ApplicationFields, ApplicationId, ApplicationKind, ApplicationStatus, Attachment,
    SubmittedApplication,
};
use crate::workflows::cards::{Card, CardId, CardUpdate, NewCard};
use crate::workflows::payments::{
    BankTransferConfirmation, NewPayment, Payment, PaymentId, PaymentPage, PaymentQuery,
    PaymentStatusUpdate,
};

/// Per-application file slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    ProfilePicture,
    MedicalDocument,
}

impl AttachmentSlot {
    /// Endpoint path for the slot, or `None` when the kind has no such slot.
    pub fn path(self, kind: ApplicationKind, id: ApplicationId) -> Option<String> {
        match (self, kind) {
            (AttachmentSlot::ProfilePicture, _) => {
                Some(format!("/{}/{}/profile-picture", kind.resource(), id))
            }
            (AttachmentSlot::MedicalDocument, ApplicationKind::Disability) => {
                Some(format!("/{}/{}/medical-documents", kind.resource(), id))
            }
            (AttachmentSlot::MedicalDocument, _) => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AttachmentSlot::ProfilePicture => "profile picture",
            AttachmentSlot::MedicalDocument => "medical document",
        }
    }
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure taxonomy of remote calls. A 404 on a lookup is not an error; lookups return `None`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed ({status}): {message}")]
    Request { status: u16, message: String },
    #[error("{slot} upload failed: {source}")]
    AttachmentUpload {
        slot: AttachmentSlot,
        #[source]
        source: Box<ClientError>,
    },
    #[error("card number {number} already exists")]
    DuplicateCardNumber { number: String },
    #[error("{kind} applications have no {slot} upload")]
    UnsupportedAttachment {
        kind: ApplicationKind,
        slot: AttachmentSlot,
    },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => Some(*status),
            ClientError::AttachmentUpload { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether showing a retry affordance makes sense. Nothing retries automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::Transport(_) => true,
            ClientError::Request { status, .. } => *status >= 500 || *status == 429,
            ClientError::AttachmentUpload { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub(crate) fn attachment(slot: AttachmentSlot, source: ClientError) -> Self {
        match source {
            already @ ClientError::AttachmentUpload { .. } => already,
            other => ClientError::AttachmentUpload {
                slot,
                source: Box::new(other),
            },
        }
    }
}

/// Operations offered by the remote system of record.
///
/// Lookups that may legitimately find nothing return `Ok(None)` on a 404.
pub trait PortalBackend: Send + Sync {
    fn submit_application(
        &self,
        kind: ApplicationKind,
        fields: &ApplicationFields,
    ) -> Result<SubmittedApplication, ClientError>;

    fn upload_attachment(
        &self,
        kind: ApplicationKind,
        application_id: ApplicationId,
        slot: AttachmentSlot,
        file: &Attachment,
    ) -> Result<(), ClientError>;

    /// Batch upload for kinds whose documents precede the application record.
    fn upload_supporting_documents(
        &self,
        kind: ApplicationKind,
        files: &[Attachment],
    ) -> Result<Vec<String>, ClientError>;

    fn get_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<SubmittedApplication>, ClientError>;

    fn list_applications(
        &self,
        kind: ApplicationKind,
    ) -> Result<Vec<SubmittedApplication>, ClientError>;

    fn update_application_status(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), ClientError>;

    fn create_payment(&self, payment: &NewPayment) -> Result<Payment, ClientError>;

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, ClientError>;

    fn payment_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Payment>, ClientError>;

    fn confirm_bank_transfer(
        &self,
        id: PaymentId,
        details: &BankTransferConfirmation,
    ) -> Result<Payment, ClientError>;

    fn skip_payment(&self, id: PaymentId) -> Result<Payment, ClientError>;

    fn update_payment_status(
        &self,
        id: PaymentId,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment, ClientError>;

    fn list_payments(&self, query: &PaymentQuery) -> Result<PaymentPage, ClientError>;

    fn card_number_exists(&self, number: &str) -> Result<bool, ClientError>;

    fn create_card(&self, card: &NewCard) -> Result<Card, ClientError>;

    fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<Card, ClientError>;

    fn card_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Card>, ClientError>;
}

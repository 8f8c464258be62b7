use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::domain::{ApplicationDraft, CategoryDetails, DocumentPolicy, SubmittedApplication};
use super::form::{
    validate_all, FormController, ReceiptOutcome, SessionTicket, ValidationError,
};
use crate::client::{AttachmentSlot, ClientError, PortalBackend};
use crate::workflows::payments::{FeeSchedule, PaymentContact, PaymentStage};

/// Best-effort upload that failed after the application was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub slot: AttachmentSlot,
    pub file_name: String,
    pub error: String,
}

/// Outcome of a committed submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub application: SubmittedApplication,
    pub payment_contact: PaymentContact,
    /// Optional attachments that did not make it. The submission is still successful.
    pub degraded: Vec<AttachmentFailure>,
}

/// Errors that keep the applicant on the review step.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("supporting document upload failed: {0}")]
    DocumentUpload(#[source] ClientError),
    #[error("application submission failed: {0}")]
    Create(#[source] ClientError),
}

impl SubmissionError {
    /// Names the failed action for the user-visible notification.
    pub fn action(&self) -> &'static str {
        match self {
            SubmissionError::Validation(_) => "validate application",
            SubmissionError::DocumentUpload(_) => "upload supporting documents",
            SubmissionError::Create(_) => "submit application",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Validation(_) => false,
            SubmissionError::DocumentUpload(err) | SubmissionError::Create(err) => {
                err.is_retryable()
            }
        }
    }
}

/// Turns a validated draft into a committed application, then hands off to payment.
///
/// Order: validate, batch documents (fatal), create (the commit), per-file attachments
/// (best-effort). Nothing is retried here.
pub struct SubmissionOrchestrator<B> {
    backend: Arc<B>,
}

impl<B> SubmissionOrchestrator<B>
where
    B: PortalBackend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn submit(&self, draft: &ApplicationDraft) -> Result<SubmissionReceipt, SubmissionError> {
        validate_all(&draft.fields)?;

        let kind = draft.kind();
        let mut fields = draft.fields.clone();

        if kind.document_policy() == DocumentPolicy::UploadBeforeCreate
            && !draft.documents().is_empty()
        {
            let stored = self
                .backend
                .upload_supporting_documents(kind, draft.documents())
                .map_err(SubmissionError::DocumentUpload)?;
            debug!(%kind, count = stored.len(), "supporting documents stored");
            if let CategoryDetails::Carer(details) = &mut fields.category {
                details.supporting_documents = stored;
            }
        }

        let application = self
            .backend
            .submit_application(kind, &fields)
            .map_err(SubmissionError::Create)?;
        info!(%kind, application_id = %application.id, "application committed");

        let mut degraded = Vec::new();
        if let Some(picture) = draft.profile_picture() {
            if let Err(err) = self.backend.upload_attachment(
                kind,
                application.id,
                AttachmentSlot::ProfilePicture,
                picture,
            ) {
                warn!(
                    application_id = %application.id,
                    error = %err,
                    "profile picture upload failed; application stays submitted"
                );
                degraded.push(AttachmentFailure {
                    slot: AttachmentSlot::ProfilePicture,
                    file_name: picture.file_name.clone(),
                    error: err.to_string(),
                });
            }
        }

        if kind.document_policy() == DocumentPolicy::UploadAfterCreate {
            degraded.extend(self.upload_after_create(&application, draft));
        }

        let payment_contact =
            PaymentContact::from_identity(&draft.fields.identity, &draft.fields.contact);

        Ok(SubmissionReceipt {
            application,
            payment_contact,
            degraded,
        })
    }

    /// Per-file document uploads, dispatched together and awaited as a group.
    fn upload_after_create(
        &self,
        application: &SubmittedApplication,
        draft: &ApplicationDraft,
    ) -> Vec<AttachmentFailure> {
        let backend = self.backend.as_ref();
        let kind = draft.kind();
        let id = application.id;

        thread::scope(|scope| {
            let uploads: Vec<_> = draft
                .documents()
                .iter()
                .map(|document| {
                    let handle = scope.spawn(move || {
                        backend.upload_attachment(kind, id, AttachmentSlot::MedicalDocument, document)
                    });
                    (document, handle)
                })
                .collect();

            uploads
                .into_iter()
                .filter_map(|(document, handle)| {
                    let error = match handle.join() {
                        Ok(Ok(())) => return None,
                        Ok(Err(err)) => err.to_string(),
                        Err(_) => "upload worker panicked".to_string(),
                    };
                    warn!(
                        application_id = %id,
                        file = %document.file_name,
                        %error,
                        "medical document upload failed; application stays submitted"
                    );
                    Some(AttachmentFailure {
                        slot: AttachmentSlot::MedicalDocument,
                        file_name: document.file_name.clone(),
                        error,
                    })
                })
                .collect()
        })
    }

    /// Submits the controller's draft and moves it into the payment stage on success.
    ///
    /// The controller stays borrowed for the whole call, so it cannot be reset meanwhile.
    /// Callers that keep the form live while the request runs take a ticket with
    /// [`FormController::begin_submission`], submit a copy of the draft, and hand the receipt
    /// back through [`SubmissionOrchestrator::apply_receipt`].
    pub fn submit_from(
        &self,
        controller: &mut FormController,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let ticket = controller.begin_submission()?;
        let receipt = self.submit(controller.draft())?;
        self.apply_receipt(controller, ticket, &receipt);
        Ok(receipt)
    }

    /// Moves the controller into payment unless it was reset since `ticket` was taken.
    pub fn apply_receipt(
        &self,
        controller: &mut FormController,
        ticket: SessionTicket,
        receipt: &SubmissionReceipt,
    ) -> ReceiptOutcome {
        let outcome = controller.accept_receipt(ticket, receipt.application.clone());
        if outcome == ReceiptOutcome::Stale {
            debug!(application_id = %receipt.application.id, "dropping stale submission result");
        }
        outcome
    }

    /// Payment stage for a committed application.
    pub fn payment_stage(&self, receipt: &SubmissionReceipt, fees: FeeSchedule) -> PaymentStage<B> {
        PaymentStage::new(
            self.backend.clone(),
            &receipt.application,
            receipt.payment_contact.clone(),
            fees,
        )
    }
}

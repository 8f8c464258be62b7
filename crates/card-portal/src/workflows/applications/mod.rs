//! Application intake: draft state, step gating, submission, and admin review.

pub mod domain;
pub mod form;
pub mod review;
pub mod submission;

pub use domain::{
    ApplicationDraft, ApplicationFields, ApplicationId, ApplicationKind, ApplicationStatus,
    Attachment, CarerDetails, CategoryDetails, ContactDetails, DisabilityDetails, DocumentPolicy,
    DraftError, EmergencyContact, IdentityDetails, SubmittedApplication, SupportDetails,
};
pub use form::{
    missing_fields, required_fields, validate_all, validate_step, DraftField, FormController,
    FormStage, FormStep, ReceiptOutcome, SessionTicket, ValidationError,
};
pub use review::{ApplicationReview, ReviewError, ReviewFilter};
pub use submission::{
    AttachmentFailure, SubmissionError, SubmissionOrchestrator, SubmissionReceipt,
};

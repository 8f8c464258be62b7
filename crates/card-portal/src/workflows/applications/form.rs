//! Step-by-step draft editing with per-step completion gates.
//!
//! Steps are numbered `1..=5`: personal information, category details, contact and address,
//! attachments, review. Advancing past a step requires every field listed for that step and all
//! earlier steps to be non-empty. Attachments never gate advancement. The review step does not
//! advance on its own; it hands the draft to the submission orchestrator and only moves into the
//! payment stage once a committed receipt is accepted.

use std::fmt;

use super::domain::{
    ApplicationDraft, ApplicationFields, ApplicationKind, CategoryDetails, SubmittedApplication,
};
use crate::workflows::payments::PaymentContact;

/// Ordered steps of the applicant form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormStep {
    PersonalInformation = 1,
    CategoryDetails = 2,
    ContactAndAddress = 3,
    Attachments = 4,
    Review = 5,
}

impl FormStep {
    pub const ALL: [FormStep; 5] = [
        FormStep::PersonalInformation,
        FormStep::CategoryDetails,
        FormStep::ContactAndAddress,
        FormStep::Attachments,
        FormStep::Review,
    ];

    pub const fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.number() == number)
    }

    pub const fn title(self) -> &'static str {
        match self {
            FormStep::PersonalInformation => "Personal Information",
            FormStep::CategoryDetails => "Category Details",
            FormStep::ContactAndAddress => "Contact & Address",
            FormStep::Attachments => "Attachments",
            FormStep::Review => "Review & Submit",
        }
    }

    fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }
}

/// A field that can be required by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    FirstName,
    LastName,
    DateOfBirth,
    Gender,
    Nationality,
    NationalId,
    DisabilityType,
    DisabilityDescription,
    CareRecipientName,
    RelationshipToRecipient,
    CaregivingExperience,
    SupportType,
    SupportDescription,
    PhoneNumber,
    Email,
    Address,
    City,
    Region,
    EmergencyContactName,
    EmergencyContactPhone,
}

impl DraftField {
    /// Wire name of the field in the create payload.
    pub const fn name(self) -> &'static str {
        match self {
            DraftField::FirstName => "firstName",
            DraftField::LastName => "lastName",
            DraftField::DateOfBirth => "dateOfBirth",
            DraftField::Gender => "gender",
            DraftField::Nationality => "nationality",
            DraftField::NationalId => "emiratesId",
            DraftField::DisabilityType => "disabilityType",
            DraftField::DisabilityDescription => "disabilityDescription",
            DraftField::CareRecipientName => "careRecipientName",
            DraftField::RelationshipToRecipient => "relationshipToRecipient",
            DraftField::CaregivingExperience => "caregivingExperience",
            DraftField::SupportType => "supportType",
            DraftField::SupportDescription => "supportDescription",
            DraftField::PhoneNumber => "phoneNumber",
            DraftField::Email => "email",
            DraftField::Address => "address",
            DraftField::City => "city",
            DraftField::Region => "emirate",
            DraftField::EmergencyContactName => "emergencyContactName",
            DraftField::EmergencyContactPhone => "emergencyContactPhone",
        }
    }

    /// Current value, or `None` when the field does not belong to the draft's kind.
    pub fn value(self, fields: &ApplicationFields) -> Option<&str> {
        let identity = &fields.identity;
        let contact = &fields.contact;
        let value = match (self, &fields.category) {
            (DraftField::FirstName, _) => &identity.first_name,
            (DraftField::LastName, _) => &identity.last_name,
            (DraftField::DateOfBirth, _) => &identity.date_of_birth,
            (DraftField::Gender, _) => &identity.gender,
            (DraftField::Nationality, _) => &identity.nationality,
            (DraftField::NationalId, _) => &identity.national_id,
            (DraftField::PhoneNumber, _) => &contact.phone_number,
            (DraftField::Email, _) => &contact.email,
            (DraftField::Address, _) => &contact.address,
            (DraftField::City, _) => &contact.city,
            (DraftField::Region, _) => &contact.region,
            (DraftField::EmergencyContactName, _) => &fields.emergency.name,
            (DraftField::EmergencyContactPhone, _) => &fields.emergency.phone,
            (DraftField::DisabilityType, CategoryDetails::Disability(d)) => &d.disability_type,
            (DraftField::DisabilityDescription, CategoryDetails::Disability(d)) => {
                &d.disability_description
            }
            (DraftField::CareRecipientName, CategoryDetails::Carer(c)) => &c.care_recipient_name,
            (DraftField::RelationshipToRecipient, CategoryDetails::Carer(c)) => {
                &c.relationship_to_recipient
            }
            (DraftField::CaregivingExperience, CategoryDetails::Carer(c)) => {
                &c.caregiving_experience
            }
            (DraftField::SupportType, CategoryDetails::CustomerSupport(s)) => &s.support_type,
            (DraftField::SupportDescription, CategoryDetails::CustomerSupport(s)) => {
                &s.support_description
            }
            _ => return None,
        };
        Some(value.as_str())
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fields a single step requires, for a given kind.
pub fn required_fields(kind: ApplicationKind, step: FormStep) -> &'static [DraftField] {
    match step {
        FormStep::PersonalInformation => &[
            DraftField::FirstName,
            DraftField::LastName,
            DraftField::DateOfBirth,
            DraftField::Gender,
            DraftField::Nationality,
            DraftField::NationalId,
        ],
        FormStep::CategoryDetails => match kind {
            ApplicationKind::Disability => {
                &[DraftField::DisabilityType, DraftField::DisabilityDescription]
            }
            ApplicationKind::Carer => &[
                DraftField::CareRecipientName,
                DraftField::RelationshipToRecipient,
                DraftField::CaregivingExperience,
            ],
            ApplicationKind::CustomerSupport => {
                &[DraftField::SupportType, DraftField::SupportDescription]
            }
        },
        FormStep::ContactAndAddress => &[
            DraftField::PhoneNumber,
            DraftField::Email,
            DraftField::Address,
            DraftField::City,
            DraftField::Region,
            DraftField::EmergencyContactName,
            DraftField::EmergencyContactPhone,
        ],
        FormStep::Attachments | FormStep::Review => &[],
    }
}

/// Required fields of steps `1..=through` that are blank in the given fields.
pub fn missing_fields(fields: &ApplicationFields, through: FormStep) -> Vec<DraftField> {
    let kind = fields.kind();
    FormStep::ALL
        .into_iter()
        .take_while(|step| *step <= through)
        .flat_map(|step| required_fields(kind, step).iter().copied())
        .filter(|field| {
            field
                .value(fields)
                .map_or(true, |value| value.trim().is_empty())
        })
        .collect()
}

/// True iff every field required by steps `1..=step` is non-empty.
pub fn validate_step(fields: &ApplicationFields, step: FormStep) -> bool {
    missing_fields(fields, step).is_empty()
}

/// Local, pre-network validation failure. No request is made when this is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("please fill in all required fields before continuing (missing: {})", join_fields(.missing))]
pub struct ValidationError {
    pub step: FormStep,
    pub missing: Vec<DraftField>,
}

fn join_fields(fields: &[DraftField]) -> String {
    fields
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates the whole form, as done right before submission.
pub fn validate_all(fields: &ApplicationFields) -> Result<(), ValidationError> {
    let missing = missing_fields(fields, FormStep::Review);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            step: FormStep::Review,
            missing,
        })
    }
}

/// Where the applicant session currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum FormStage {
    Editing(FormStep),
    /// The application is committed; the payment stage drives the session from here.
    Payment {
        application: Box<SubmittedApplication>,
        contact: PaymentContact,
    },
}

/// Token tying an in-flight submission to the session state it was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTicket(u64);

/// Result of handing a receipt back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Applied,
    /// The session was reset or dismissed while the request was in flight.
    Stale,
}

/// Owns the draft, the current step, and navigation.
#[derive(Debug, Clone)]
pub struct FormController {
    draft: ApplicationDraft,
    stage: FormStage,
    epoch: u64,
}

impl FormController {
    pub fn new(kind: ApplicationKind) -> Self {
        Self::with_draft(ApplicationDraft::new(kind))
    }

    pub fn with_draft(draft: ApplicationDraft) -> Self {
        Self {
            draft,
            stage: FormStage::Editing(FormStep::PersonalInformation),
            epoch: 0,
        }
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    /// Mutable access for input handlers. Edits are ignored by navigation until `next()`.
    pub fn draft_mut(&mut self) -> &mut ApplicationDraft {
        &mut self.draft
    }

    pub fn stage(&self) -> &FormStage {
        &self.stage
    }

    /// Current editing step, or `None` once the session reached the payment stage.
    pub fn current_step(&self) -> Option<FormStep> {
        match self.stage {
            FormStage::Editing(step) => Some(step),
            FormStage::Payment { .. } => None,
        }
    }

    pub fn validate_current(&self) -> Result<(), ValidationError> {
        let step = self.current_step().unwrap_or(FormStep::Review);
        let missing = missing_fields(&self.draft.fields, step);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { step, missing })
        }
    }

    /// Moves forward one step if the gate passes. Stays on review.
    pub fn next(&mut self) -> Result<FormStep, ValidationError> {
        let Some(step) = self.current_step() else {
            return Ok(FormStep::Review);
        };
        self.validate_current()?;

        let target = step.next().unwrap_or(FormStep::Review);
        self.stage = FormStage::Editing(target);
        Ok(target)
    }

    /// Moves back one step; no-op on the first step or after commit.
    pub fn previous(&mut self) -> Option<FormStep> {
        let step = self.current_step()?;
        let target = step.previous().unwrap_or(step);
        self.stage = FormStage::Editing(target);
        Some(target)
    }

    /// Returns to the first step keeping the draft ("modify" from the confirmation prompt).
    pub fn modify(&mut self) {
        if self.current_step().is_some() {
            self.stage = FormStage::Editing(FormStep::PersonalInformation);
        }
    }

    /// Starts a submission from the review step.
    pub fn begin_submission(&self) -> Result<SessionTicket, ValidationError> {
        validate_all(&self.draft.fields)?;
        Ok(SessionTicket(self.epoch))
    }

    /// Applies a committed application, pre-filling the payment contact from the identity fields.
    pub fn accept_receipt(
        &mut self,
        ticket: SessionTicket,
        application: SubmittedApplication,
    ) -> ReceiptOutcome {
        if ticket.0 != self.epoch || self.current_step().is_none() {
            return ReceiptOutcome::Stale;
        }

        let contact = PaymentContact::from_identity(
            &self.draft.fields.identity,
            &self.draft.fields.contact,
        );
        self.stage = FormStage::Payment {
            application: Box::new(application),
            contact,
        };
        ReceiptOutcome::Applied
    }

    /// Discards the session. Results of requests started before this are dropped.
    pub fn reset(&mut self) {
        let kind = self.draft.kind();
        self.draft = ApplicationDraft::new(kind);
        self.stage = FormStage::Editing(FormStep::PersonalInformation);
        self.epoch += 1;
    }
}

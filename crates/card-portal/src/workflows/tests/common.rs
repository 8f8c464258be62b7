use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::{AttachmentSlot, ClientError, PortalBackend};
use crate::sandbox::SandboxStore;
use crate::workflows::applications::{
    ApplicationDraft, ApplicationFields, ApplicationId, ApplicationKind, ApplicationStatus,
    Attachment, CarerDetails, CategoryDetails, ContactDetails, DisabilityDetails,
    EmergencyContact, IdentityDetails, SubmittedApplication, SupportDetails,
};
use crate::workflows::cards::{Card, CardId, CardUpdate, NewCard};
use crate::workflows::payments::{
    BankTransferConfirmation, NewPayment, Payment, PaymentId, PaymentPage, PaymentQuery,
    PaymentStatusUpdate,
};

pub(super) fn identity() -> IdentityDetails {
    IdentityDetails {
        first_name: "Mariam".to_string(),
        last_name: "Al Mansoori".to_string(),
        date_of_birth: "1988-03-14".to_string(),
        gender: "female".to_string(),
        nationality: "UAE".to_string(),
        national_id: "784-1988-1234567-1".to_string(),
    }
}

pub(super) fn contact() -> ContactDetails {
    ContactDetails {
        phone_number: "0501112233".to_string(),
        email: "mariam@example.ae".to_string(),
        address: "Villa 12, Street 4".to_string(),
        city: "Abu Dhabi".to_string(),
        region: "Abu Dhabi".to_string(),
    }
}

pub(super) fn category(kind: ApplicationKind) -> CategoryDetails {
    match kind {
        ApplicationKind::Disability => CategoryDetails::Disability(DisabilityDetails {
            disability_type: "Visual".to_string(),
            disability_description: "Low vision since birth".to_string(),
        }),
        ApplicationKind::Carer => CategoryDetails::Carer(CarerDetails {
            care_recipient_name: "Fatima Al Mansoori".to_string(),
            relationship_to_recipient: "Daughter".to_string(),
            caregiving_experience: "Six years of full-time care".to_string(),
            supporting_documents: Vec::new(),
        }),
        ApplicationKind::CustomerSupport => CategoryDetails::CustomerSupport(SupportDetails {
            support_type: "Mobility".to_string(),
            support_description: "Step-free access at service centres".to_string(),
            special_requirements: String::new(),
        }),
    }
}

pub(super) fn complete_fields(kind: ApplicationKind) -> ApplicationFields {
    ApplicationFields {
        identity: identity(),
        contact: contact(),
        category: category(kind),
        emergency: EmergencyContact {
            name: "Khalid Al Mansoori".to_string(),
            phone: "0504445566".to_string(),
        },
        include_lanyard: false,
    }
}

pub(super) fn complete_draft(kind: ApplicationKind) -> ApplicationDraft {
    ApplicationDraft::from_fields(complete_fields(kind))
}

pub(super) fn pdf(name: &str) -> Attachment {
    Attachment::new(name, b"%PDF-1.7 test".to_vec())
}

pub(super) fn png(name: &str) -> Attachment {
    Attachment::new(name, vec![0x89, b'P', b'N', b'G'])
}

/// Stores an application directly and moves it to `status`.
pub(super) fn seeded_application(
    store: &SandboxStore,
    kind: ApplicationKind,
    status: ApplicationStatus,
) -> SubmittedApplication {
    let application = store
        .create_application(kind, complete_fields(kind))
        .expect("seed application");
    store
        .set_application_status(kind, application.id, status)
        .expect("seed status");
    store.application(kind, application.id).expect("seeded")
}

/// Backend wrapper that records every call and fails the operations it is told to.
#[derive(Default)]
pub(super) struct RecordingBackend {
    pub(super) store: SandboxStore,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<HashMap<&'static str, u16>>,
}

impl RecordingBackend {
    pub(super) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every later call of `operation` fails with `status`.
    pub(super) fn fail(&self, operation: &'static str, status: u16) {
        self.failures
            .lock()
            .expect("failure mutex poisoned")
            .insert(operation, status);
    }

    pub(super) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    pub(super) fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    fn enter(&self, operation: &'static str) -> Result<(), ClientError> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push(operation);
        match self
            .failures
            .lock()
            .expect("failure mutex poisoned")
            .get(operation)
        {
            Some(status) => Err(ClientError::Request {
                status: *status,
                message: format!("injected {operation} failure"),
            }),
            None => Ok(()),
        }
    }
}

impl PortalBackend for RecordingBackend {
    fn submit_application(
        &self,
        kind: ApplicationKind,
        fields: &ApplicationFields,
    ) -> Result<SubmittedApplication, ClientError> {
        self.enter("submit_application")?;
        self.store.submit_application(kind, fields)
    }

    fn upload_attachment(
        &self,
        kind: ApplicationKind,
        application_id: ApplicationId,
        slot: AttachmentSlot,
        file: &Attachment,
    ) -> Result<(), ClientError> {
        let operation = match slot {
            AttachmentSlot::ProfilePicture => "upload_profile_picture",
            AttachmentSlot::MedicalDocument => "upload_medical_document",
        };
        self.enter(operation)
            .map_err(|err| ClientError::attachment(slot, err))?;
        self.store
            .upload_attachment(kind, application_id, slot, file)
    }

    fn upload_supporting_documents(
        &self,
        kind: ApplicationKind,
        files: &[Attachment],
    ) -> Result<Vec<String>, ClientError> {
        self.enter("upload_supporting_documents")?;
        self.store.upload_supporting_documents(kind, files)
    }

    fn get_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<SubmittedApplication>, ClientError> {
        self.enter("get_application")?;
        self.store.get_application(kind, id)
    }

    fn list_applications(
        &self,
        kind: ApplicationKind,
    ) -> Result<Vec<SubmittedApplication>, ClientError> {
        self.enter("list_applications")?;
        self.store.list_applications(kind)
    }

    fn update_application_status(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), ClientError> {
        self.enter("update_application_status")?;
        self.store.update_application_status(kind, id, status)
    }

    fn create_payment(&self, payment: &NewPayment) -> Result<Payment, ClientError> {
        self.enter("create_payment")?;
        PortalBackend::create_payment(&self.store, payment)
    }

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, ClientError> {
        self.enter("get_payment")?;
        self.store.get_payment(id)
    }

    fn payment_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Payment>, ClientError> {
        self.enter("payment_for_application")?;
        PortalBackend::payment_for_application(&self.store, kind, id)
    }

    fn confirm_bank_transfer(
        &self,
        id: PaymentId,
        details: &BankTransferConfirmation,
    ) -> Result<Payment, ClientError> {
        self.enter("confirm_bank_transfer")?;
        self.store.confirm_bank_transfer(id, details)
    }

    fn skip_payment(&self, id: PaymentId) -> Result<Payment, ClientError> {
        self.enter("skip_payment")?;
        PortalBackend::skip_payment(&self.store, id)
    }

    fn update_payment_status(
        &self,
        id: PaymentId,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment, ClientError> {
        self.enter("update_payment_status")?;
        PortalBackend::update_payment_status(&self.store, id, update)
    }

    fn list_payments(&self, query: &PaymentQuery) -> Result<PaymentPage, ClientError> {
        self.enter("list_payments")?;
        PortalBackend::list_payments(&self.store, query)
    }

    fn card_number_exists(&self, number: &str) -> Result<bool, ClientError> {
        self.enter("card_number_exists")?;
        PortalBackend::card_number_exists(&self.store, number)
    }

    fn create_card(&self, card: &NewCard) -> Result<Card, ClientError> {
        self.enter("create_card")?;
        PortalBackend::create_card(&self.store, card)
    }

    fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<Card, ClientError> {
        self.enter("update_card")?;
        PortalBackend::update_card(&self.store, id, update)
    }

    fn card_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Card>, ClientError> {
        self.enter("card_for_application")?;
        PortalBackend::card_for_application(&self.store, kind, id)
    }
}

/// Reports taken card numbers as free, like a pre-check that lost a race.
pub(super) struct StaleNumberCheck(pub(super) Arc<RecordingBackend>);

impl PortalBackend for StaleNumberCheck {
    fn submit_application(
        &self,
        kind: ApplicationKind,
        fields: &ApplicationFields,
    ) -> Result<SubmittedApplication, ClientError> {
        self.0.submit_application(kind, fields)
    }

    fn upload_attachment(
        &self,
        kind: ApplicationKind,
        application_id: ApplicationId,
        slot: AttachmentSlot,
        file: &Attachment,
    ) -> Result<(), ClientError> {
        self.0.upload_attachment(kind, application_id, slot, file)
    }

    fn upload_supporting_documents(
        &self,
        kind: ApplicationKind,
        files: &[Attachment],
    ) -> Result<Vec<String>, ClientError> {
        self.0.upload_supporting_documents(kind, files)
    }

    fn get_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<SubmittedApplication>, ClientError> {
        self.0.get_application(kind, id)
    }

    fn list_applications(
        &self,
        kind: ApplicationKind,
    ) -> Result<Vec<SubmittedApplication>, ClientError> {
        self.0.list_applications(kind)
    }

    fn update_application_status(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), ClientError> {
        self.0.update_application_status(kind, id, status)
    }

    fn create_payment(&self, payment: &NewPayment) -> Result<Payment, ClientError> {
        self.0.create_payment(payment)
    }

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, ClientError> {
        self.0.get_payment(id)
    }

    fn payment_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Payment>, ClientError> {
        self.0.payment_for_application(kind, id)
    }

    fn confirm_bank_transfer(
        &self,
        id: PaymentId,
        details: &BankTransferConfirmation,
    ) -> Result<Payment, ClientError> {
        self.0.confirm_bank_transfer(id, details)
    }

    fn skip_payment(&self, id: PaymentId) -> Result<Payment, ClientError> {
        self.0.skip_payment(id)
    }

    fn update_payment_status(
        &self,
        id: PaymentId,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment, ClientError> {
        self.0.update_payment_status(id, update)
    }

    fn list_payments(&self, query: &PaymentQuery) -> Result<PaymentPage, ClientError> {
        self.0.list_payments(query)
    }

    fn card_number_exists(&self, _number: &str) -> Result<bool, ClientError> {
        Ok(false)
    }

    fn create_card(&self, card: &NewCard) -> Result<Card, ClientError> {
        self.0.create_card(card)
    }

    fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<Card, ClientError> {
        self.0.update_card(id, update)
    }

    fn card_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Card>, ClientError> {
        self.0.card_for_application(kind, id)
    }
}

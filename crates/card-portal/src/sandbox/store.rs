use std::collections::BTreeMap;
use std::sync::Mutex;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::client::{AttachmentSlot, ClientError, PortalBackend};
use crate::workflows::applications::{
    ApplicationFields, ApplicationId, ApplicationKind, ApplicationStatus, Attachment,
    CategoryDetails, DocumentPolicy, SubmittedApplication,
};
use crate::workflows::cards::{Card, CardId, CardUpdate, NewCard};
use crate::workflows::payments::{
    compute_total, BankTransferConfirmation, NewPayment, Pagination, Payment, PaymentId,
    PaymentPage, PaymentQuery, PaymentStatus, PaymentStatusUpdate,
};

/// Failures the sandbox can be told to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxFaults {
    pub reject_application_create: bool,
    pub reject_profile_pictures: bool,
    pub reject_supporting_documents: bool,
    pub reject_medical_documents: bool,
    /// Return every payment from the listing regardless of the requested status.
    pub ignore_payment_status_filter: bool,
}

/// Errors as the remote service reports them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("admin authorization required")]
    Unauthorized,
    #[error("{0}")]
    Unavailable(String),
}

impl SandboxError {
    pub fn status(&self) -> StatusCode {
        match self {
            SandboxError::NotFound(_) => StatusCode::NOT_FOUND,
            SandboxError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SandboxError::Conflict(_) => StatusCode::CONFLICT,
            SandboxError::Unauthorized => StatusCode::UNAUTHORIZED,
            SandboxError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for SandboxError {
    fn into_response(self) -> Response {
        let payload = json!({ "message": self.to_string() });
        (self.status(), Json(payload)).into_response()
    }
}

impl From<SandboxError> for ClientError {
    fn from(value: SandboxError) -> Self {
        ClientError::Request {
            status: value.status().as_u16(),
            message: value.to_string(),
        }
    }
}

/// A file kept by the sandbox, served back under `/uploads/{name}`.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct SandboxState {
    next_application: u64,
    next_payment: u64,
    next_card: u64,
    next_upload: u64,
    applications: BTreeMap<(ApplicationKind, ApplicationId), SubmittedApplication>,
    payments: BTreeMap<PaymentId, Payment>,
    cards: BTreeMap<CardId, Card>,
    uploads: BTreeMap<String, StoredUpload>,
    faults: SandboxFaults,
}

impl SandboxState {
    fn store_upload(&mut self, file: &Attachment) -> String {
        self.next_upload += 1;
        let safe_name: String = file
            .file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        let name = format!("{:04}-{}", self.next_upload, safe_name);
        self.uploads.insert(
            name.clone(),
            StoredUpload {
                content_type: file.content_type.to_string(),
                bytes: file.bytes.clone(),
            },
        );
        name
    }

    fn application_mut(
        &mut self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<&mut SubmittedApplication, SandboxError> {
        self.applications
            .get_mut(&(kind, id))
            .ok_or_else(|| SandboxError::NotFound(format!("{kind} application {id}")))
    }

    fn payment_mut(&mut self, id: PaymentId) -> Result<&mut Payment, SandboxError> {
        self.payments
            .get_mut(&id)
            .ok_or_else(|| SandboxError::NotFound(format!("payment {id}")))
    }

    /// Fills the applicant columns the listing joins in from the application table.
    fn enriched(&self, payment: &Payment) -> Payment {
        let mut payment = payment.clone();
        if let Some(application) = self
            .applications
            .get(&(payment.application_type, payment.application_id))
        {
            payment.applicant_name = Some(application.full_name());
            payment.applicant_email = Some(application.fields.contact.email.clone());
            payment.application_status = Some(application.status);
        }
        payment
    }
}

/// In-memory stand-in for the remote system of record.
#[derive(Debug, Default)]
pub struct SandboxStore {
    state: Mutex<SandboxState>,
}

impl SandboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SandboxState> {
        self.state.lock().expect("sandbox mutex poisoned")
    }

    pub fn set_faults(&self, faults: SandboxFaults) {
        self.state().faults = faults;
    }

    pub fn faults(&self) -> SandboxFaults {
        self.state().faults.clone()
    }

    pub fn create_application(
        &self,
        kind: ApplicationKind,
        mut fields: ApplicationFields,
    ) -> Result<SubmittedApplication, SandboxError> {
        let mut state = self.state();
        if state.faults.reject_application_create {
            return Err(SandboxError::Unavailable(
                "application store is unavailable".to_string(),
            ));
        }
        if fields.kind() != kind {
            return Err(SandboxError::BadRequest(format!(
                "payload does not describe a {kind} application"
            )));
        }
        if let CategoryDetails::Carer(details) = &mut fields.category {
            details
                .supporting_documents
                .retain(|name| state.uploads.contains_key(name));
        }

        state.next_application += 1;
        let application = SubmittedApplication {
            id: ApplicationId(state.next_application),
            status: ApplicationStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            profile_picture_url: None,
            medical_documents: Vec::new(),
            fields,
        };
        state
            .applications
            .insert((kind, application.id), application.clone());
        debug!(%kind, id = %application.id, "sandbox stored application");
        Ok(application)
    }

    pub fn store_attachment(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        slot: AttachmentSlot,
        file: &Attachment,
    ) -> Result<(), SandboxError> {
        let mut state = self.state();
        let rejected = match slot {
            AttachmentSlot::ProfilePicture => state.faults.reject_profile_pictures,
            AttachmentSlot::MedicalDocument => state.faults.reject_medical_documents,
        };
        if rejected {
            return Err(SandboxError::Unavailable(format!("{slot} storage is unavailable")));
        }
        if slot.path(kind, id).is_none() {
            return Err(SandboxError::BadRequest(format!(
                "{kind} applications have no {slot} upload"
            )));
        }
        if file.is_empty() {
            return Err(SandboxError::BadRequest("no file uploaded".to_string()));
        }
        state.application_mut(kind, id)?;

        let url = format!("/uploads/{}", state.store_upload(file));
        let application = state.application_mut(kind, id)?;
        match slot {
            AttachmentSlot::ProfilePicture => application.profile_picture_url = Some(url),
            AttachmentSlot::MedicalDocument => application.medical_documents.push(url),
        }
        application.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn store_supporting_documents(
        &self,
        kind: ApplicationKind,
        files: &[Attachment],
    ) -> Result<Vec<String>, SandboxError> {
        let mut state = self.state();
        if state.faults.reject_supporting_documents {
            return Err(SandboxError::Unavailable(
                "document storage is unavailable".to_string(),
            ));
        }
        if kind.document_policy() != DocumentPolicy::UploadBeforeCreate {
            return Err(SandboxError::BadRequest(format!(
                "{kind} applications do not take a document batch"
            )));
        }
        if files.is_empty() {
            return Err(SandboxError::BadRequest("no files uploaded".to_string()));
        }
        Ok(files.iter().map(|file| state.store_upload(file)).collect())
    }

    pub fn application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<SubmittedApplication, SandboxError> {
        self.state()
            .applications
            .get(&(kind, id))
            .cloned()
            .ok_or_else(|| SandboxError::NotFound(format!("{kind} application {id}")))
    }

    /// Applications of one kind, newest first.
    pub fn applications(&self, kind: ApplicationKind) -> Vec<SubmittedApplication> {
        self.state()
            .applications
            .iter()
            .rev()
            .filter(|((stored_kind, _), _)| *stored_kind == kind)
            .map(|(_, application)| application.clone())
            .collect()
    }

    pub fn set_application_status(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), SandboxError> {
        let mut state = self.state();
        let application = state.application_mut(kind, id)?;
        application.status = status;
        application.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn create_payment(&self, new: &NewPayment) -> Result<Payment, SandboxError> {
        let mut state = self.state();
        if !state
            .applications
            .contains_key(&(new.application_type, new.application_id))
        {
            return Err(SandboxError::BadRequest(format!(
                "{} application {} does not exist",
                new.application_type, new.application_id
            )));
        }
        if state.payments.values().any(|payment| {
            payment.application_type == new.application_type
                && payment.application_id == new.application_id
        }) {
            return Err(SandboxError::Conflict(format!(
                "a payment already exists for application {}",
                new.application_id
            )));
        }
        match compute_total(new.base_amount, new.lanyard_amount, new.include_lanyard) {
            Some(expected) if expected == new.total_amount => {}
            Some(expected) => {
                return Err(SandboxError::BadRequest(format!(
                    "total {} does not match base and lanyard amounts ({expected})",
                    new.total_amount
                )));
            }
            None => {
                return Err(SandboxError::BadRequest(
                    "base and lanyard amounts overflow".to_string(),
                ));
            }
        }

        state.next_payment += 1;
        let payment = Payment {
            id: PaymentId(state.next_payment),
            application_type: new.application_type,
            application_id: new.application_id,
            first_name: new.contact.first_name.clone(),
            last_name: new.contact.last_name.clone(),
            phone_number: new.contact.phone_number.clone(),
            base_amount: new.base_amount,
            lanyard_amount: new.lanyard_amount,
            total_amount: new.total_amount,
            include_lanyard: new.include_lanyard,
            payment_method: new.payment_method,
            payment_status: new.payment_status,
            created_at: Utc::now(),
            updated_at: None,
            confirmed_at: None,
            transaction_reference: None,
            bank_name: None,
            transfer_date: None,
            admin_notes: None,
            applicant_name: None,
            applicant_email: None,
            application_status: None,
        };
        state.payments.insert(payment.id, payment.clone());
        Ok(state.enriched(&payment))
    }

    pub fn payment(&self, id: PaymentId) -> Result<Payment, SandboxError> {
        let state = self.state();
        state
            .payments
            .get(&id)
            .map(|payment| state.enriched(payment))
            .ok_or_else(|| SandboxError::NotFound(format!("payment {id}")))
    }

    pub fn payment_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Payment, SandboxError> {
        let state = self.state();
        state
            .payments
            .values()
            .find(|payment| payment.application_type == kind && payment.application_id == id)
            .map(|payment| state.enriched(payment))
            .ok_or_else(|| SandboxError::NotFound(format!("payment for {kind} application {id}")))
    }

    pub fn confirm_transfer(
        &self,
        id: PaymentId,
        confirmation: &BankTransferConfirmation,
    ) -> Result<Payment, SandboxError> {
        let mut state = self.state();
        let payment = state.payment_mut(id)?;
        if !payment.payment_status.is_open() {
            return Err(SandboxError::BadRequest(format!(
                "Payment is already {}",
                payment.payment_status.label().to_lowercase()
            )));
        }
        payment.first_name = confirmation.contact.first_name.clone();
        payment.last_name = confirmation.contact.last_name.clone();
        payment.phone_number = confirmation.contact.phone_number.clone();
        payment.transaction_reference = confirmation.transaction_reference.clone();
        payment.bank_name = confirmation.bank_name.clone();
        payment.transfer_date = confirmation.transfer_date;
        payment.payment_status = PaymentStatus::Submitted;
        payment.updated_at = Some(Utc::now());
        let payment = payment.clone();
        Ok(state.enriched(&payment))
    }

    /// Applicant-side skip. Only a pending payment can be skipped.
    pub fn skip_payment(&self, id: PaymentId) -> Result<Payment, SandboxError> {
        let mut state = self.state();
        let payment = state.payment_mut(id)?;
        match payment.payment_status {
            PaymentStatus::Pending => {}
            PaymentStatus::Skipped => {
                return Err(SandboxError::BadRequest("Payment already skipped".to_string()))
            }
            other => {
                return Err(SandboxError::BadRequest(format!(
                    "Payment is {} and cannot be skipped",
                    other.label().to_lowercase()
                )))
            }
        }
        payment.payment_status = PaymentStatus::Skipped;
        payment.updated_at = Some(Utc::now());
        let payment = payment.clone();
        Ok(state.enriched(&payment))
    }

    pub fn update_payment_status(
        &self,
        id: PaymentId,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment, SandboxError> {
        let mut state = self.state();
        let payment = state.payment_mut(id)?;
        let now = Utc::now();
        payment.payment_status = update.payment_status;
        payment.updated_at = Some(now);
        if update.payment_status == PaymentStatus::Confirmed {
            payment.confirmed_at = Some(now);
        }
        if update.transaction_reference.is_some() {
            payment.transaction_reference = update.transaction_reference.clone();
        }
        if update.bank_name.is_some() {
            payment.bank_name = update.bank_name.clone();
        }
        if update.transfer_date.is_some() {
            payment.transfer_date = update.transfer_date;
        }
        if update.admin_notes.is_some() {
            payment.admin_notes = update.admin_notes.clone();
        }
        let payment = payment.clone();
        Ok(state.enriched(&payment))
    }

    /// Newest first, paged. Page numbers start at 1.
    pub fn list_payments(&self, query: &PaymentQuery) -> PaymentPage {
        let state = self.state();
        let filter_status = query
            .status
            .filter(|_| !state.faults.ignore_payment_status_filter);
        let matching: Vec<&Payment> = state
            .payments
            .values()
            .rev()
            .filter(|payment| filter_status.map_or(true, |status| payment.payment_status == status))
            .collect();

        let page = query.page.max(1);
        let page_size = query.page_size.max(1);
        let pagination = Pagination::compute(page, page_size, matching.len() as u64);
        let skip = (page as usize - 1) * page_size as usize;
        let payments = matching
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .map(|payment| state.enriched(payment))
            .collect();

        PaymentPage {
            payments,
            pagination: Some(pagination),
        }
    }

    pub fn card_number_exists(&self, number: &str) -> bool {
        self.state()
            .cards
            .values()
            .any(|card| card.card_number.eq_ignore_ascii_case(number))
    }

    pub fn create_card(&self, new: &NewCard) -> Result<Card, SandboxError> {
        let mut state = self.state();
        if state
            .cards
            .values()
            .any(|card| card.card_number.eq_ignore_ascii_case(&new.card_number))
        {
            return Err(SandboxError::Conflict(format!(
                "Card number {} already exists",
                new.card_number
            )));
        }
        let kind = new.original_application_type;
        let application = state
            .applications
            .get(&(kind, new.original_application_id))
            .ok_or_else(|| {
                SandboxError::BadRequest(format!(
                    "{kind} application {} does not exist",
                    new.original_application_id
                ))
            })?;
        if application.status != ApplicationStatus::Approved {
            return Err(SandboxError::BadRequest(format!(
                "application {} is not approved",
                application.id
            )));
        }
        if state.cards.values().any(|card| {
            card.original_application_type == kind
                && card.original_application_id == new.original_application_id
        }) {
            return Err(SandboxError::BadRequest(format!(
                "a card was already issued for application {}",
                new.original_application_id
            )));
        }

        state.next_card += 1;
        let card = Card {
            id: CardId(state.next_card),
            card_number: new.card_number.clone(),
            cardholder_name: new.cardholder_name.clone(),
            card_type: new.card_type.clone(),
            issued_date: new.issued_date,
            expiry_date: new.expiry_date,
            status: new.status,
            notes: new.notes.clone(),
            original_application_id: new.original_application_id,
            original_application_type: kind,
        };
        state.cards.insert(card.id, card.clone());
        Ok(card)
    }

    pub fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<Card, SandboxError> {
        let mut state = self.state();
        let card = state
            .cards
            .get_mut(&id)
            .ok_or_else(|| SandboxError::NotFound(format!("card {id}")))?;
        update.apply_to(card);
        Ok(card.clone())
    }

    pub fn card_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Card, SandboxError> {
        self.state()
            .cards
            .values()
            .find(|card| card.original_application_type == kind && card.original_application_id == id)
            .cloned()
            .ok_or_else(|| SandboxError::NotFound(format!("card for {kind} application {id}")))
    }

    pub fn upload(&self, name: &str) -> Option<StoredUpload> {
        self.state().uploads.get(name).cloned()
    }
}

fn absent_on_not_found<T>(result: Result<T, SandboxError>) -> Result<Option<T>, ClientError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SandboxError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// In-process backend with the same semantics the HTTP client gives the workflows.
impl PortalBackend for SandboxStore {
    fn submit_application(
        &self,
        kind: ApplicationKind,
        fields: &ApplicationFields,
    ) -> Result<SubmittedApplication, ClientError> {
        Ok(self.create_application(kind, fields.clone())?)
    }

    fn upload_attachment(
        &self,
        kind: ApplicationKind,
        application_id: ApplicationId,
        slot: AttachmentSlot,
        file: &Attachment,
    ) -> Result<(), ClientError> {
        if slot.path(kind, application_id).is_none() {
            return Err(ClientError::UnsupportedAttachment { kind, slot });
        }
        self.store_attachment(kind, application_id, slot, file)
            .map_err(|err| ClientError::attachment(slot, err.into()))
    }

    fn upload_supporting_documents(
        &self,
        kind: ApplicationKind,
        files: &[Attachment],
    ) -> Result<Vec<String>, ClientError> {
        Ok(self.store_supporting_documents(kind, files)?)
    }

    fn get_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<SubmittedApplication>, ClientError> {
        absent_on_not_found(self.application(kind, id))
    }

    fn list_applications(
        &self,
        kind: ApplicationKind,
    ) -> Result<Vec<SubmittedApplication>, ClientError> {
        Ok(self.applications(kind))
    }

    fn update_application_status(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), ClientError> {
        Ok(self.set_application_status(kind, id, status)?)
    }

    fn create_payment(&self, payment: &NewPayment) -> Result<Payment, ClientError> {
        Ok(SandboxStore::create_payment(self, payment)?)
    }

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, ClientError> {
        absent_on_not_found(self.payment(id))
    }

    fn payment_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Payment>, ClientError> {
        absent_on_not_found(SandboxStore::payment_for_application(self, kind, id))
    }

    fn confirm_bank_transfer(
        &self,
        id: PaymentId,
        details: &BankTransferConfirmation,
    ) -> Result<Payment, ClientError> {
        Ok(self.confirm_transfer(id, details)?)
    }

    fn skip_payment(&self, id: PaymentId) -> Result<Payment, ClientError> {
        match SandboxStore::skip_payment(self, id) {
            Ok(payment) => Ok(payment),
            Err(err) => match self.payment(id) {
                Ok(current) if current.payment_status == PaymentStatus::Skipped => Ok(current),
                _ => Err(err.into()),
            },
        }
    }

    fn update_payment_status(
        &self,
        id: PaymentId,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment, ClientError> {
        Ok(SandboxStore::update_payment_status(self, id, update)?)
    }

    fn list_payments(&self, query: &PaymentQuery) -> Result<PaymentPage, ClientError> {
        Ok(SandboxStore::list_payments(self, query))
    }

    fn card_number_exists(&self, number: &str) -> Result<bool, ClientError> {
        Ok(SandboxStore::card_number_exists(self, number))
    }

    fn create_card(&self, card: &NewCard) -> Result<Card, ClientError> {
        SandboxStore::create_card(self, card).map_err(|err| match err {
            SandboxError::Conflict(_) => ClientError::DuplicateCardNumber {
                number: card.card_number.clone(),
            },
            other => other.into(),
        })
    }

    fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<Card, ClientError> {
        Ok(SandboxStore::update_card(self, id, update)?)
    }

    fn card_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Card>, ClientError> {
        absent_on_not_found(SandboxStore::card_for_application(self, kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::applications::{DisabilityDetails, IdentityDetails};
    use crate::workflows::payments::{Amount, PaymentContact, PaymentMethod};

    fn disability_fields() -> ApplicationFields {
        let mut fields = ApplicationFields::empty(ApplicationKind::Disability);
        fields.identity = IdentityDetails {
            first_name: "Mariam".to_string(),
            last_name: "Al Mansoori".to_string(),
            ..IdentityDetails::default()
        };
        fields.category = CategoryDetails::Disability(DisabilityDetails {
            disability_type: "Visual".to_string(),
            disability_description: String::new(),
        });
        fields
    }

    fn new_payment(id: ApplicationId, status: PaymentStatus) -> NewPayment {
        NewPayment {
            application_type: ApplicationKind::Disability,
            application_id: id,
            contact: PaymentContact::default(),
            base_amount: Amount::from_units(100),
            lanyard_amount: Amount::ZERO,
            total_amount: Amount::from_units(100),
            include_lanyard: false,
            payment_method: PaymentMethod::BankTransfer,
            payment_status: status,
        }
    }

    #[test]
    fn rejects_payload_for_another_kind() {
        let store = SandboxStore::new();
        let err = store
            .create_application(ApplicationKind::Carer, disability_fields())
            .expect_err("kind mismatch");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn second_skip_is_rejected_by_the_store_but_idempotent_through_the_backend() {
        let store = SandboxStore::new();
        let application = store
            .create_application(ApplicationKind::Disability, disability_fields())
            .expect("stored");
        let payment = SandboxStore::create_payment(
            &store,
            &new_payment(application.id, PaymentStatus::Pending),
        )
        .expect("payment");

        SandboxStore::skip_payment(&store, payment.id).expect("first skip");
        let err = SandboxStore::skip_payment(&store, payment.id).expect_err("second skip");
        assert!(err.to_string().contains("already skipped"));

        let via_backend = PortalBackend::skip_payment(&store, payment.id).expect("idempotent");
        assert_eq!(via_backend.payment_status, PaymentStatus::Skipped);
    }

    #[test]
    fn inconsistent_totals_are_refused() {
        let store = SandboxStore::new();
        let application = store
            .create_application(ApplicationKind::Disability, disability_fields())
            .expect("stored");
        let mut payment = new_payment(application.id, PaymentStatus::Pending);
        payment.total_amount = Amount::from_units(120);

        let err = SandboxStore::create_payment(&store, &payment).expect_err("bad total");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn listing_pages_and_enriches_payments() {
        let store = SandboxStore::new();
        for _ in 0..3 {
            let application = store
                .create_application(ApplicationKind::Disability, disability_fields())
                .expect("stored");
            SandboxStore::create_payment(&store, &new_payment(application.id, PaymentStatus::Pending))
                .expect("payment");
        }

        let page = SandboxStore::list_payments(
            &store,
            &PaymentQuery {
                page: 2,
                page_size: 2,
                status: None,
            },
        );
        assert_eq!(page.payments.len(), 1);
        let pagination = page.pagination.expect("pagination");
        assert_eq!(pagination.total_items, 3);
        assert!(pagination.has_previous_page);
        assert!(!pagination.has_next_page);
        assert_eq!(
            page.payments[0].applicant_name.as_deref(),
            Some("Mariam Al Mansoori")
        );
    }
}

//! Card issuance for approved applications.
//!
//! The number pre-check is advisory. Two administrators can pass it concurrently with the same
//! number; the create call is the authority and its duplicate rejection surfaces as
//! `CardIssueError::DuplicateCardNumber`.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use super::domain::{
    compose_card_number, Card, CardStatus, CardUpdate, NewCard, CARD_VALIDITY_DAYS,
};
use crate::client::{ClientError, PortalBackend};
use crate::workflows::applications::{
    ApplicationId, ApplicationKind, ApplicationStatus, SubmittedApplication,
};

#[derive(Debug, thiserror::Error)]
pub enum CardIssueError {
    #[error("{kind} application {id} not found")]
    ApplicationNotFound {
        kind: ApplicationKind,
        id: ApplicationId,
    },
    #[error("application {id} is {status}; cards are issued for approved applications only")]
    NotApproved {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("please enter the card number")]
    MissingNumber,
    #[error("card number {0} already exists")]
    DuplicateCardNumber(String),
    #[error("expiry date {expiry} is before the issue date {issued}")]
    InvalidDates { issued: NaiveDate, expiry: NaiveDate },
    #[error("card lookup failed: {0}")]
    Lookup(#[source] ClientError),
    #[error("card creation failed: {0}")]
    Create(#[source] ClientError),
    #[error("card update failed: {0}")]
    Update(#[source] ClientError),
}

impl CardIssueError {
    pub fn action(&self) -> &'static str {
        match self {
            CardIssueError::ApplicationNotFound { .. }
            | CardIssueError::NotApproved { .. }
            | CardIssueError::Lookup(_) => "load card",
            CardIssueError::MissingNumber
            | CardIssueError::DuplicateCardNumber(_)
            | CardIssueError::InvalidDates { .. }
            | CardIssueError::Create(_) => "issue card",
            CardIssueError::Update(_) => "update card",
        }
    }
}

/// Whether the form creates a new card or edits the one already issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFormMode {
    Create,
    Edit(Card),
}

/// Editable card form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardForm {
    mode: CardFormMode,
    application_id: ApplicationId,
    kind: ApplicationKind,
    prefix: String,
    manual_number: String,
    cardholder_name: String,
    pub card_type: String,
    pub issued_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    pub notes: String,
}

impl CardForm {
    /// Defaults for a new card: holder from the application, issued today, two-year validity.
    pub fn create(application: &SubmittedApplication, prefix: &str, today: NaiveDate) -> Self {
        let kind = application.kind();
        Self {
            mode: CardFormMode::Create,
            application_id: application.id,
            kind,
            prefix: prefix.to_string(),
            manual_number: String::new(),
            cardholder_name: application.full_name(),
            card_type: kind.card_label().to_string(),
            issued_date: today,
            expiry_date: today + Duration::days(CARD_VALIDITY_DAYS),
            status: CardStatus::Active,
            notes: String::new(),
        }
    }

    /// Form over an existing card; only status, expiry and notes remain editable.
    pub fn edit(card: Card) -> Self {
        Self {
            application_id: card.original_application_id,
            kind: card.original_application_type,
            prefix: String::new(),
            manual_number: String::new(),
            cardholder_name: card.cardholder_name.clone(),
            card_type: card.card_type.clone(),
            issued_date: card.issued_date,
            expiry_date: card.expiry_date,
            status: card.status,
            notes: card.notes.clone(),
            mode: CardFormMode::Edit(card),
        }
    }

    pub fn mode(&self) -> &CardFormMode {
        &self.mode
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, CardFormMode::Edit(_))
    }

    pub fn cardholder_name(&self) -> &str {
        &self.cardholder_name
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    /// Sets the typed number part; non-digits are dropped. Ignored in edit mode.
    pub fn set_manual_number(&mut self, input: &str) {
        if !self.is_edit() {
            self.manual_number = input.chars().filter(char::is_ascii_digit).collect();
        }
    }

    pub fn manual_number(&self) -> &str {
        &self.manual_number
    }

    /// Full card number: the prefix plus digits, or the existing number in edit mode.
    pub fn card_number(&self) -> String {
        match &self.mode {
            CardFormMode::Edit(card) => card.card_number.clone(),
            CardFormMode::Create => compose_card_number(&self.prefix, &self.manual_number),
        }
    }

    fn check_dates(&self) -> Result<(), CardIssueError> {
        if self.expiry_date < self.issued_date {
            return Err(CardIssueError::InvalidDates {
                issued: self.issued_date,
                expiry: self.expiry_date,
            });
        }
        Ok(())
    }

    fn new_card(&self) -> NewCard {
        NewCard {
            card_number: self.card_number(),
            cardholder_name: self.cardholder_name.clone(),
            card_type: self.card_type.clone(),
            issued_date: self.issued_date,
            expiry_date: self.expiry_date,
            status: self.status,
            notes: self.notes.clone(),
            original_application_id: self.application_id,
            original_application_type: self.kind,
        }
    }

    fn update(&self) -> CardUpdate {
        CardUpdate {
            status: Some(self.status),
            expiry_date: Some(self.expiry_date),
            notes: Some(self.notes.clone()),
        }
    }
}

pub struct CardIssuer<B> {
    backend: Arc<B>,
    prefix: String,
}

impl<B> CardIssuer<B>
where
    B: PortalBackend + 'static,
{
    pub fn new(backend: Arc<B>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Opens the form for an approved application, in edit mode when a card already exists.
    pub fn prepare(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        today: NaiveDate,
    ) -> Result<CardForm, CardIssueError> {
        let application = self
            .backend
            .get_application(kind, id)
            .map_err(CardIssueError::Lookup)?
            .ok_or(CardIssueError::ApplicationNotFound { kind, id })?;
        if application.status != ApplicationStatus::Approved {
            return Err(CardIssueError::NotApproved {
                id,
                status: application.status,
            });
        }

        match self
            .backend
            .card_for_application(kind, id)
            .map_err(CardIssueError::Lookup)?
        {
            Some(card) => Ok(CardForm::edit(card)),
            None => Ok(CardForm::create(&application, &self.prefix, today)),
        }
    }

    /// Advisory uniqueness check for the number currently in the form.
    pub fn number_taken(&self, form: &CardForm) -> Result<bool, CardIssueError> {
        self.backend
            .card_number_exists(&form.card_number())
            .map_err(CardIssueError::Lookup)
    }

    /// Creates the card, or saves the editable fields of an existing one.
    pub fn save(&self, form: &CardForm) -> Result<Card, CardIssueError> {
        form.check_dates()?;
        match form.mode() {
            CardFormMode::Edit(card) => {
                let updated = self
                    .backend
                    .update_card(card.id, &form.update())
                    .map_err(CardIssueError::Update)?;
                info!(card_id = %updated.id, "card updated");
                Ok(updated)
            }
            CardFormMode::Create => self.issue(form),
        }
    }

    fn issue(&self, form: &CardForm) -> Result<Card, CardIssueError> {
        if form.manual_number().is_empty() {
            return Err(CardIssueError::MissingNumber);
        }
        let number = form.card_number();
        if self.number_taken(form)? {
            return Err(CardIssueError::DuplicateCardNumber(number));
        }

        match self.backend.create_card(&form.new_card()) {
            Ok(card) => {
                info!(
                    card_id = %card.id,
                    card_number = %card.card_number,
                    application_id = %form.application_id(),
                    "card issued"
                );
                Ok(card)
            }
            Err(ClientError::DuplicateCardNumber { number }) => {
                warn!(%number, "card number taken between pre-check and create");
                Err(CardIssueError::DuplicateCardNumber(number))
            }
            Err(err) => Err(CardIssueError::Create(err)),
        }
    }
}

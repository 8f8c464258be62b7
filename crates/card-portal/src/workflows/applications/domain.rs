use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::wire::{deserialize_optional_timestamp, deserialize_timestamp, null_as_default};

/// Server-assigned identifier of a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application category. Decides the field set, the document policy, and endpoint routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApplicationKind {
    Disability,
    Carer,
    CustomerSupport,
}

/// How supporting documents travel for a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPolicy {
    NotAccepted,
    /// Uploaded in one batch before the application exists; the stored names are embedded in the
    /// create payload.
    UploadBeforeCreate,
    /// Uploaded one file per call after the application exists, keyed by its id.
    UploadAfterCreate,
}

impl ApplicationKind {
    pub const ALL: [ApplicationKind; 3] = [
        ApplicationKind::Disability,
        ApplicationKind::Carer,
        ApplicationKind::CustomerSupport,
    ];

    /// REST resource holding applications of this kind.
    pub const fn resource(self) -> &'static str {
        match self {
            ApplicationKind::Disability => "DisabilityApplication",
            ApplicationKind::Carer => "CarersApplication",
            ApplicationKind::CustomerSupport => "CustomerSupportApplication",
        }
    }

    /// `applicationType` value used by payment records.
    pub const fn payment_type(self) -> &'static str {
        match self {
            ApplicationKind::Disability => "Disability",
            ApplicationKind::Carer => "Carers",
            ApplicationKind::CustomerSupport => "CustomerSupport",
        }
    }

    /// Path segment of the status update endpoint.
    pub const fn status_segment(self) -> &'static str {
        match self {
            ApplicationKind::Disability => "disability",
            ApplicationKind::Carer => "carers",
            ApplicationKind::CustomerSupport => "customer-support",
        }
    }

    /// Card type code stored with issued cards.
    pub const fn card_code(self) -> &'static str {
        match self {
            ApplicationKind::Disability => "disability",
            ApplicationKind::Carer => "carer",
            ApplicationKind::CustomerSupport => "customer_support",
        }
    }

    pub const fn card_label(self) -> &'static str {
        match self {
            ApplicationKind::Disability => "National Disability Card",
            ApplicationKind::Carer => "National Carers Card",
            ApplicationKind::CustomerSupport => "National Support Card",
        }
    }

    pub const fn document_policy(self) -> DocumentPolicy {
        match self {
            ApplicationKind::Disability => DocumentPolicy::UploadAfterCreate,
            ApplicationKind::Carer => DocumentPolicy::UploadBeforeCreate,
            ApplicationKind::CustomerSupport => DocumentPolicy::NotAccepted,
        }
    }

    /// Accepts any of the spellings the remote service uses for a kind.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "disability" | "disabilityapplication" => Some(ApplicationKind::Disability),
            "carer" | "carers" | "carersapplication" => Some(ApplicationKind::Carer),
            "customersupport" | "support" | "customersupportapplication" => {
                Some(ApplicationKind::CustomerSupport)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payment_type())
    }
}

impl FromStr for ApplicationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown application kind '{s}'"))
    }
}

impl Serialize for ApplicationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.payment_type())
    }
}

impl<'de> Deserialize<'de> for ApplicationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ApplicationKind::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown application kind '{raw}'"))
        })
    }
}

/// Review status owned by the remote service. Read case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown application status '{s}'"))
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ApplicationStatus::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown application status '{raw}'"))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDetails {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub nationality: String,
    #[serde(rename = "emiratesId")]
    pub national_id: String,
}

impl IdentityDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub city: String,
    #[serde(rename = "emirate")]
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(rename = "emergencyContactName")]
    pub name: String,
    #[serde(rename = "emergencyContactPhone")]
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabilityDetails {
    pub disability_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disability_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarerDetails {
    pub care_recipient_name: String,
    pub relationship_to_recipient: String,
    pub caregiving_experience: String,
    /// Stored names returned by the batch document upload.
    #[serde(default, deserialize_with = "null_as_default")]
    pub supporting_documents: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportDetails {
    pub support_type: String,
    pub support_description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub special_requirements: String,
}

/// Category-specific fields, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryDetails {
    Disability(DisabilityDetails),
    Carer(CarerDetails),
    CustomerSupport(SupportDetails),
}

impl CategoryDetails {
    pub fn empty(kind: ApplicationKind) -> Self {
        match kind {
            ApplicationKind::Disability => CategoryDetails::Disability(DisabilityDetails::default()),
            ApplicationKind::Carer => CategoryDetails::Carer(CarerDetails::default()),
            ApplicationKind::CustomerSupport => {
                CategoryDetails::CustomerSupport(SupportDetails::default())
            }
        }
    }

    pub fn kind(&self) -> ApplicationKind {
        match self {
            CategoryDetails::Disability(_) => ApplicationKind::Disability,
            CategoryDetails::Carer(_) => ApplicationKind::Carer,
            CategoryDetails::CustomerSupport(_) => ApplicationKind::CustomerSupport,
        }
    }
}

/// Non-file fields of an application; this is the JSON body of the create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFields {
    #[serde(flatten)]
    pub identity: IdentityDetails,
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(flatten)]
    pub category: CategoryDetails,
    #[serde(flatten)]
    pub emergency: EmergencyContact,
    #[serde(default)]
    pub include_lanyard: bool,
}

impl ApplicationFields {
    pub fn empty(kind: ApplicationKind) -> Self {
        Self {
            identity: IdentityDetails::default(),
            contact: ContactDetails::default(),
            category: CategoryDetails::empty(kind),
            emergency: EmergencyContact::default(),
            include_lanyard: false,
        }
    }

    pub fn kind(&self) -> ApplicationKind {
        self.category.kind()
    }
}

/// A file selected by the applicant, held in memory until upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Builds an attachment, guessing the content type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name).first_or_octet_stream();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type.essence_str())
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// In-progress application held by the applicant session. Nothing here is persisted until the
/// orchestrator commits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDraft {
    kind: ApplicationKind,
    pub fields: ApplicationFields,
    profile_picture: Option<Attachment>,
    documents: Vec<Attachment>,
}

impl ApplicationDraft {
    pub fn new(kind: ApplicationKind) -> Self {
        Self {
            kind,
            fields: ApplicationFields::empty(kind),
            profile_picture: None,
            documents: Vec::new(),
        }
    }

    /// Wraps already-collected fields; the kind follows the category variant.
    pub fn from_fields(fields: ApplicationFields) -> Self {
        Self {
            kind: fields.kind(),
            fields,
            profile_picture: None,
            documents: Vec::new(),
        }
    }

    pub fn kind(&self) -> ApplicationKind {
        self.kind
    }

    pub fn profile_picture(&self) -> Option<&Attachment> {
        self.profile_picture.as_ref()
    }

    pub fn documents(&self) -> &[Attachment] {
        &self.documents
    }

    pub fn set_profile_picture(&mut self, picture: Attachment) {
        self.profile_picture = Some(picture);
    }

    pub fn clear_profile_picture(&mut self) {
        self.profile_picture = None;
    }

    pub fn attach_document(&mut self, document: Attachment) -> Result<(), DraftError> {
        if self.kind.document_policy() == DocumentPolicy::NotAccepted {
            return Err(DraftError::DocumentsNotAccepted(self.kind));
        }
        self.documents.push(document);
        Ok(())
    }

    pub fn remove_document(&mut self, index: usize) -> Option<Attachment> {
        (index < self.documents.len()).then(|| self.documents.remove(index))
    }

    pub fn set_include_lanyard(&mut self, include: bool) {
        self.fields.include_lanyard = include;
    }

    /// Replaces the category fields. The variant must match the draft's kind.
    pub fn set_category(&mut self, category: CategoryDetails) -> Result<(), DraftError> {
        if category.kind() != self.kind {
            return Err(DraftError::CategoryMismatch {
                expected: self.kind,
                found: category.kind(),
            });
        }
        self.fields.category = category;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("{0} applications do not accept supporting documents")]
    DocumentsNotAccepted(ApplicationKind),
    #[error("category fields for {found} cannot be used on a {expected} application")]
    CategoryMismatch {
        expected: ApplicationKind,
        found: ApplicationKind,
    },
}

/// Application record as held by the remote system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedApplication {
    pub id: ApplicationId,
    #[serde(rename = "applicationStatus")]
    pub status: ApplicationStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_documents: Vec<String>,
    #[serde(flatten)]
    pub fields: ApplicationFields,
}

impl SubmittedApplication {
    pub fn kind(&self) -> ApplicationKind {
        self.fields.kind()
    }

    pub fn full_name(&self) -> String {
        self.fields.identity.full_name()
    }

    /// Case-insensitive search over full name, e-mail, and phone number.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        let lowered = term.to_lowercase();
        self.full_name().to_lowercase().contains(&lowered)
            || self.fields.contact.email.to_lowercase().contains(&lowered)
            || self.fields.contact.phone_number.contains(term)
    }
}

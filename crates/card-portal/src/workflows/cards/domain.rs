use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::wire::{deserialize_date, deserialize_optional_date, null_as_default};
use crate::workflows::applications::{ApplicationId, ApplicationKind};

pub const DEFAULT_CARD_PREFIX: &str = "NDAid-";

/// Days between issue and expiry for newly issued cards.
pub const CARD_VALIDITY_DAYS: i64 = 2 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    Active,
    Inactive,
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(CardStatus::Active),
            "inactive" => Ok(CardStatus::Inactive),
            _ => Err(format!("unknown card status '{s}'")),
        }
    }
}

/// Card type codes travel as `disability` / `carer` / `customer_support`.
mod card_code {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::workflows::applications::ApplicationKind;

    pub fn serialize<S: Serializer>(kind: &ApplicationKind, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(kind.card_code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ApplicationKind, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ApplicationKind::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown card type '{raw}'")))
    }
}

/// Identification card issued for an approved application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub card_number: String,
    pub cardholder_name: String,
    pub card_type: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub issued_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    pub original_application_id: ApplicationId,
    #[serde(with = "card_code")]
    pub original_application_type: ApplicationKind,
}

/// Create payload for a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub card_number: String,
    pub cardholder_name: String,
    pub card_type: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub issued_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    #[serde(default)]
    pub notes: String,
    pub original_application_id: ApplicationId,
    #[serde(with = "card_code")]
    pub original_application_type: ApplicationKind,
}

/// Partial update. The cardholder name and number are immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CardStatus>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CardUpdate {
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(status) = self.status {
            card.status = status;
        }
        if let Some(expiry) = self.expiry_date {
            card.expiry_date = expiry;
        }
        if let Some(notes) = &self.notes {
            card.notes = notes.clone();
        }
    }
}

/// Joins the prefix with the digits of a manually typed number part.
pub fn compose_card_number(prefix: &str, manual_part: &str) -> String {
    let digits: String = manual_part.chars().filter(char::is_ascii_digit).collect();
    format!("{prefix}{digits}")
}

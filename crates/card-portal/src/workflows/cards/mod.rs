pub mod domain;
pub mod issuance;

pub use domain::{
    compose_card_number, Card, CardId, CardStatus, CardUpdate, NewCard, CARD_VALIDITY_DAYS,
    DEFAULT_CARD_PREFIX,
};
pub use issuance::{CardForm, CardFormMode, CardIssueError, CardIssuer};

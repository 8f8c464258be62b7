use crate::client::download::DownloadError;
use crate::client::ClientError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::applications::{DraftError, ReviewError, SubmissionError};
use crate::workflows::cards::CardIssueError;
use crate::workflows::payments::{LedgerError, PaymentStageError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Input(serde_json::Error),
    Client(ClientError),
    Draft(DraftError),
    Submission(SubmissionError),
    Payment(PaymentStageError),
    Review(ReviewError),
    Ledger(LedgerError),
    Card(CardIssueError),
    Download(DownloadError),
}

impl AppError {
    /// The user-facing action that failed, when the error came from a workflow.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            AppError::Submission(err) => Some(err.action()),
            AppError::Payment(err) => Some(err.action()),
            AppError::Review(err) => Some(err.action()),
            AppError::Ledger(err) => Some(err.action()),
            AppError::Card(err) => Some(err.action()),
            AppError::Download(_) => Some("download document"),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Input(err) => write!(f, "invalid input file: {}", err),
            AppError::Client(err) => write!(f, "remote service error: {}", err),
            AppError::Draft(err) => write!(f, "draft error: {}", err),
            AppError::Submission(err) => write!(f, "{}", err),
            AppError::Payment(err) => write!(f, "{}", err),
            AppError::Review(err) => write!(f, "{}", err),
            AppError::Ledger(err) => write!(f, "{}", err),
            AppError::Card(err) => write!(f, "{}", err),
            AppError::Download(err) => write!(f, "download error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Input(err) => Some(err),
            AppError::Client(err) => Some(err),
            AppError::Draft(err) => Some(err),
            AppError::Submission(err) => Some(err),
            AppError::Payment(err) => Some(err),
            AppError::Review(err) => Some(err),
            AppError::Ledger(err) => Some(err),
            AppError::Card(err) => Some(err),
            AppError::Download(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        AppError::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        AppError::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Input(value)
    }
}

impl From<ClientError> for AppError {
    fn from(value: ClientError) -> Self {
        AppError::Client(value)
    }
}

impl From<DraftError> for AppError {
    fn from(value: DraftError) -> Self {
        AppError::Draft(value)
    }
}

impl From<SubmissionError> for AppError {
    fn from(value: SubmissionError) -> Self {
        AppError::Submission(value)
    }
}

impl From<PaymentStageError> for AppError {
    fn from(value: PaymentStageError) -> Self {
        AppError::Payment(value)
    }
}

impl From<ReviewError> for AppError {
    fn from(value: ReviewError) -> Self {
        AppError::Review(value)
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        AppError::Ledger(value)
    }
}

impl From<CardIssueError> for AppError {
    fn from(value: CardIssueError) -> Self {
        AppError::Card(value)
    }
}

impl From<DownloadError> for AppError {
    fn from(value: DownloadError) -> Self {
        AppError::Download(value)
    }
}

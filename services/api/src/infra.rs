use card_portal::client::{AdminSession, HttpPortalClient};
use card_portal::config::AppConfig;
use card_portal::error::AppError;
use card_portal::workflows::applications::{ApplicationDraft, ApplicationFields, Attachment};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Client for the applicant commands. Never carries an admin session.
pub(crate) fn applicant_client(config: &AppConfig) -> HttpPortalClient {
    HttpPortalClient::from_config(&config.remote)
}

/// Client for the admin commands, logged in with the explicit token or `PORTAL_ADMIN_TOKEN`.
pub(crate) fn admin_client(config: &AppConfig, token: Option<String>) -> HttpPortalClient {
    let client = HttpPortalClient::from_config(&config.remote);
    match token.or_else(|| config.admin_token.clone()) {
        Some(token) => client.with_admin(AdminSession::login(token)),
        None => {
            warn!("no admin token supplied; admin calls will be sent without a session");
            client
        }
    }
}

/// Reads the draft fields from JSON and attaches the selected files.
pub(crate) fn load_draft(
    path: &Path,
    profile_picture: Option<&Path>,
    documents: &[PathBuf],
    include_lanyard: bool,
) -> Result<ApplicationDraft, AppError> {
    let raw = fs::read_to_string(path)?;
    let fields: ApplicationFields = serde_json::from_str(&raw)?;
    let mut draft = ApplicationDraft::from_fields(fields);
    if include_lanyard {
        draft.set_include_lanyard(true);
    }
    if let Some(picture) = profile_picture {
        draft.set_profile_picture(Attachment::from_path(picture)?);
    }
    for document in documents {
        draft.attach_document(Attachment::from_path(document)?)?;
    }
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_date(" 2025-02-28 "),
            Ok(NaiveDate::from_ymd_opt(2025, 2, 28).expect("valid"))
        );
        assert!(parse_date("28/02/2025").is_err());
    }
}

use std::sync::Arc;

use tracing::info;

use super::domain::{ApplicationId, ApplicationKind, ApplicationStatus, SubmittedApplication};
use crate::client::{ClientError, PortalBackend};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("failed to load {kind} applications: {source}")]
    Load {
        kind: ApplicationKind,
        #[source]
        source: ClientError,
    },
    #[error("{kind} application {id} not found")]
    NotFound {
        kind: ApplicationKind,
        id: ApplicationId,
    },
    #[error("application {id} is already {current}; only pending applications can be decided")]
    AlreadyDecided {
        id: ApplicationId,
        current: ApplicationStatus,
    },
    #[error("an application cannot be moved back to pending")]
    InvalidDecision,
    #[error("failed to update application status: {0}")]
    Update(#[source] ClientError),
}

impl ReviewError {
    pub fn action(&self) -> &'static str {
        match self {
            ReviewError::Load { .. } | ReviewError::NotFound { .. } => "load applications",
            ReviewError::AlreadyDecided { .. }
            | ReviewError::InvalidDecision
            | ReviewError::Update(_) => "update application status",
        }
    }
}

/// Listing narrowing for the review table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub search: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl ReviewFilter {
    pub fn matches(&self, application: &SubmittedApplication) -> bool {
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |term| application.matches_search(term));
        let status_ok = self.status.map_or(true, |status| application.status == status);
        search_ok && status_ok
    }
}

/// Approve/reject workflow over submitted applications.
pub struct ApplicationReview<B> {
    backend: Arc<B>,
}

impl<B> ApplicationReview<B>
where
    B: PortalBackend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn list(
        &self,
        kind: ApplicationKind,
        filter: &ReviewFilter,
    ) -> Result<Vec<SubmittedApplication>, ReviewError> {
        let mut applications = self
            .backend
            .list_applications(kind)
            .map_err(|source| ReviewError::Load { kind, source })?;
        applications.retain(|application| filter.matches(application));
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    pub fn get(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<SubmittedApplication, ReviewError> {
        self.backend
            .get_application(kind, id)
            .map_err(|source| ReviewError::Load { kind, source })?
            .ok_or(ReviewError::NotFound { kind, id })
    }

    pub fn approve(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<SubmittedApplication, ReviewError> {
        self.decide(kind, id, ApplicationStatus::Approved)
    }

    pub fn reject(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<SubmittedApplication, ReviewError> {
        self.decide(kind, id, ApplicationStatus::Rejected)
    }

    /// Moves a pending application to `decision` and returns the record as re-read afterwards.
    pub fn decide(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        decision: ApplicationStatus,
    ) -> Result<SubmittedApplication, ReviewError> {
        if decision == ApplicationStatus::Pending {
            return Err(ReviewError::InvalidDecision);
        }

        let current = self.get(kind, id)?;
        if current.status != ApplicationStatus::Pending {
            return Err(ReviewError::AlreadyDecided {
                id,
                current: current.status,
            });
        }

        self.backend
            .update_application_status(kind, id, decision)
            .map_err(ReviewError::Update)?;
        info!(%kind, application_id = %id, status = %decision, "application decided");

        self.get(kind, id)
    }
}

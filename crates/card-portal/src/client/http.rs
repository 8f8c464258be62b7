use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use ureq::http::Response;
use ureq::{Agent, Body};

use super::multipart::MultipartForm;
use super::{AttachmentSlot, ClientError, PortalBackend};
use crate::config::RemoteConfig;
use crate::workflows::applications::{
    ApplicationFields, ApplicationId, ApplicationKind, ApplicationStatus, Attachment,
    SubmittedApplication,
};
use crate::workflows::cards::{Card, CardId, CardUpdate, NewCard};
use crate::workflows::payments::{
    BankTransferConfirmation, NewPayment, Payment, PaymentId, PaymentPage, PaymentQuery,
    PaymentStatus, PaymentStatusUpdate,
};

/// Bearer credentials of a logged-in administrator.
///
/// Created on login and dropped on logout; the client only sees the token it is built with.
#[derive(Clone)]
pub struct AdminSession {
    token: String,
}

impl AdminSession {
    pub fn login(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn logout(self) {}

    fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession").finish_non_exhaustive()
    }
}

/// Blocking REST client for the remote service.
#[derive(Debug, Clone)]
pub struct HttpPortalClient {
    agent: Agent,
    base_url: String,
    admin: Option<AdminSession>,
}

#[derive(Debug, Deserialize)]
struct ApplicationList {
    #[serde(default, deserialize_with = "crate::wire::null_as_default")]
    applications: Vec<SubmittedApplication>,
}

#[derive(Debug, Deserialize)]
struct CardNumberCheck {
    exists: bool,
}

impl HttpPortalClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin: None,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    /// Client that attaches the session's bearer token to admin calls.
    pub fn with_admin(mut self, session: AdminSession) -> Self {
        self.admin = Some(session);
        self
    }

    /// Drops the admin credentials (logout).
    pub fn without_admin(mut self) -> Self {
        self.admin = None;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer header for admin-scoped calls; applicant calls never carry it.
    fn authorization(&self, access: Access) -> Option<String> {
        match access {
            Access::Admin => self.admin.as_ref().map(AdminSession::header_value),
            Access::Public => None,
        }
    }

    fn get_raw(
        &self,
        access: Access,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response<Body>, ClientError> {
        debug!(%path, "GET");
        let mut request = self.agent.get(self.url(path));
        for (key, value) in query {
            request = request.query(*key, value);
        }
        if let Some(auth) = self.authorization(access) {
            request = request.header("Authorization", auth);
        }
        request.call().map_err(transport_error)
    }

    fn send_json<T: Serialize + ?Sized>(
        &self,
        access: Access,
        method: Method,
        path: &str,
        body: Option<&T>,
    ) -> Result<Response<Body>, ClientError> {
        debug!(%path, method = method.as_str(), "sending request");
        let url = self.url(path);
        let mut request = match method {
            Method::Post => self.agent.post(url),
            Method::Put => self.agent.put(url),
        };
        if let Some(auth) = self.authorization(access) {
            request = request.header("Authorization", auth);
        }
        let response = match body {
            Some(body) => request.send_json(body),
            None => request.send_empty(),
        };
        response.map_err(transport_error)
    }

    /// Applicant uploads; always anonymous.
    fn send_multipart(&self, path: &str, form: MultipartForm) -> Result<Response<Body>, ClientError> {
        let (content_type, body) = form.finish();
        debug!(%path, bytes = body.len(), "uploading multipart form");
        self.agent
            .post(self.url(path))
            .header("Content-Type", content_type)
            .send(&body[..])
            .map_err(transport_error)
    }

    fn get_json<T: DeserializeOwned>(&self, access: Access, path: &str) -> Result<T, ClientError> {
        let response = self.get_raw(access, path, &[])?;
        read_json(response)
    }

    /// GET where a 404 means "no such record".
    fn get_optional<T: DeserializeOwned>(
        &self,
        access: Access,
        path: &str,
    ) -> Result<Option<T>, ClientError> {
        let response = self.get_raw(access, path, &[])?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        read_json(response).map(Some)
    }

    /// Raw bytes of a stored document or picture. Admin-scoped.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let mut request = self.agent.get(url);
        if let Some(auth) = self.authorization(Access::Admin) {
            request = request.header("Authorization", auth);
        }
        let mut response = request.call().map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(request_error(response));
        }
        response
            .body_mut()
            .read_to_vec()
            .map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Admin,
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Post,
    Put,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

fn transport_error(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Timeout(_) => ClientError::Timeout,
        other => ClientError::Transport(other.to_string()),
    }
}

/// Non-2xx response: the body text becomes the message verbatim.
fn request_error(mut response: Response<Body>) -> ClientError {
    let status = response.status();
    let text = response.body_mut().read_to_string().unwrap_or_default();
    let message = if text.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        text
    };
    ClientError::Request {
        status: status.as_u16(),
        message,
    }
}

fn read_json<T: DeserializeOwned>(mut response: Response<Body>) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(request_error(response));
    }
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|err| ClientError::Decode(err.to_string()))
}

fn expect_success(response: Response<Body>) -> Result<(), ClientError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(request_error(response))
    }
}

fn is_duplicate_card_error(err: &ClientError) -> bool {
    match err {
        ClientError::Request { status, message } => {
            let lowered = message.to_lowercase();
            *status == 409 || lowered.contains("already exists") || lowered.contains("duplicate")
        }
        _ => false,
    }
}

fn is_already_skipped(err: &ClientError) -> bool {
    match err {
        ClientError::Request { status, message } => {
            (*status == 400 || *status == 409) && message.to_lowercase().contains("skipped")
        }
        _ => false,
    }
}

impl PortalBackend for HttpPortalClient {
    fn submit_application(
        &self,
        kind: ApplicationKind,
        fields: &ApplicationFields,
    ) -> Result<SubmittedApplication, ClientError> {
        let path = format!("/{}", kind.resource());
        let response = self.send_json(Access::Public, Method::Post, &path, Some(fields))?;
        read_json(response)
    }

    fn upload_attachment(
        &self,
        kind: ApplicationKind,
        application_id: ApplicationId,
        slot: AttachmentSlot,
        file: &Attachment,
    ) -> Result<(), ClientError> {
        let path = slot
            .path(kind, application_id)
            .ok_or(ClientError::UnsupportedAttachment { kind, slot })?;
        let form = MultipartForm::new().file("file", file);
        self.send_multipart(&path, form)
            .and_then(expect_success)
            .map_err(|err| ClientError::attachment(slot, err))
    }

    fn upload_supporting_documents(
        &self,
        kind: ApplicationKind,
        files: &[Attachment],
    ) -> Result<Vec<String>, ClientError> {
        let form = files
            .iter()
            .fold(MultipartForm::new(), |form, file| form.file("files", file));
        let path = format!("/{}/upload-documents", kind.resource());
        let response = self.send_multipart(&path, form)?;
        read_json(response)
    }

    fn get_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<SubmittedApplication>, ClientError> {
        self.get_optional(Access::Admin, &format!("/{}/{}", kind.resource(), id))
    }

    fn list_applications(
        &self,
        kind: ApplicationKind,
    ) -> Result<Vec<SubmittedApplication>, ClientError> {
        let list: ApplicationList = self
            .get_json(Access::Admin, &format!("/{}", kind.resource()))?;
        Ok(list.applications)
    }

    fn update_application_status(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), ClientError> {
        let path = format!("/ApplicationStatus/{}/{}", kind.status_segment(), id);
        let body = json!({ "status": status.label() });
        let response = self.send_json(Access::Admin, Method::Put, &path, Some(&body))?;
        expect_success(response)
    }

    fn create_payment(&self, payment: &NewPayment) -> Result<Payment, ClientError> {
        let response = self.send_json(Access::Public, Method::Post, "/Payment", Some(payment))?;
        read_json(response)
    }

    fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, ClientError> {
        self.get_optional(Access::Public, &format!("/Payment/{id}"))
    }

    fn payment_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Payment>, ClientError> {
        self.get_optional(
            Access::Public,
            &format!("/Payment/application/{}/{}", kind.payment_type(), id),
        )
    }

    fn confirm_bank_transfer(
        &self,
        id: PaymentId,
        details: &BankTransferConfirmation,
    ) -> Result<Payment, ClientError> {
        let path = format!("/Payment/{id}/confirm-transfer");
        let response = self.send_json(Access::Public, Method::Post, &path, Some(details))?;
        read_json(response)
    }

    fn skip_payment(&self, id: PaymentId) -> Result<Payment, ClientError> {
        let path = format!("/Payment/{id}/skip");
        let response = self.send_json::<()>(Access::Public, Method::Post, &path, None)?;
        match read_json::<Payment>(response) {
            Ok(payment) => Ok(payment),
            Err(err) if is_already_skipped(&err) => {
                warn!(payment_id = %id, "payment already skipped; re-reading current record");
                match self.get_payment(id)? {
                    Some(payment) if payment.payment_status == PaymentStatus::Skipped => Ok(payment),
                    _ => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn update_payment_status(
        &self,
        id: PaymentId,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment, ClientError> {
        let path = format!("/Payment/{id}/status");
        let response = self.send_json(Access::Admin, Method::Put, &path, Some(update))?;
        read_json(response)
    }

    fn list_payments(&self, query: &PaymentQuery) -> Result<PaymentPage, ClientError> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];
        if let Some(status) = query.status {
            params.push(("status", status.label().to_string()));
        }
        let response = self.get_raw(Access::Admin, "/Payment", &params)?;
        read_json(response)
    }

    fn card_number_exists(&self, number: &str) -> Result<bool, ClientError> {
        let response = self.get_raw(
            Access::Admin,
            "/Card/check-number",
            &[("cardNumber", number.to_string())],
        )?;
        let check: CardNumberCheck = read_json(response)?;
        Ok(check.exists)
    }

    fn create_card(&self, card: &NewCard) -> Result<Card, ClientError> {
        let response = self.send_json(Access::Admin, Method::Post, "/Card", Some(card))?;
        read_json(response).map_err(|err| {
            if is_duplicate_card_error(&err) {
                ClientError::DuplicateCardNumber {
                    number: card.card_number.clone(),
                }
            } else {
                err
            }
        })
    }

    fn update_card(&self, id: CardId, update: &CardUpdate) -> Result<Card, ClientError> {
        let path = format!("/Card/{id}");
        let response = self.send_json(Access::Admin, Method::Put, &path, Some(update))?;
        read_json(response)
    }

    fn card_for_application(
        &self,
        kind: ApplicationKind,
        id: ApplicationId,
    ) -> Result<Option<Card>, ClientError> {
        self.get_optional(
            Access::Admin,
            &format!("/Card/application/{}/{}", kind.card_code(), id),
        )
    }
}

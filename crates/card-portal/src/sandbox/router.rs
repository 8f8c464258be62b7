use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::store::{SandboxError, SandboxStore};
use crate::client::AttachmentSlot;
use crate::workflows::applications::{
    ApplicationFields, ApplicationId, ApplicationKind, ApplicationStatus, Attachment,
};
use crate::workflows::cards::{CardId, CardUpdate, NewCard};
use crate::workflows::payments::{
    BankTransferConfirmation, NewPayment, PaymentId, PaymentQuery, PaymentStatus,
    PaymentStatusUpdate,
};

/// Shared handler state.
#[derive(Clone)]
pub struct SandboxApi {
    store: Arc<SandboxStore>,
    admin_token: Option<Arc<str>>,
}

impl SandboxApi {
    pub fn new(store: Arc<SandboxStore>, admin_token: Option<String>) -> Self {
        Self {
            store,
            admin_token: admin_token.map(Arc::from),
        }
    }

    /// Admin routes need the bearer token when one is configured.
    fn require_admin(&self, headers: &HeaderMap) -> Result<(), SandboxError> {
        let Some(expected) = self.admin_token.as_deref() else {
            return Ok(());
        };
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented == Some(expected) {
            Ok(())
        } else {
            Err(SandboxError::Unauthorized)
        }
    }
}

type ApiResult = Result<Response, SandboxError>;

/// Routes of the remote REST API, relative to its base path (the server nests them at `/api`).
pub fn sandbox_router(api: SandboxApi) -> Router {
    let mut router = Router::new();

    for kind in ApplicationKind::ALL {
        let base = format!("/{}", kind.resource());
        router = router
            .route(
                &base,
                get(move |state: State<SandboxApi>, headers: HeaderMap| {
                    list_applications(kind, state, headers)
                })
                .post(
                    move |state: State<SandboxApi>, body: Json<ApplicationFields>| {
                        create_application(kind, state, body)
                    },
                ),
            )
            .route(
                &format!("{base}/upload-documents"),
                post(move |state: State<SandboxApi>, form: Multipart| {
                    upload_documents(kind, state, form)
                }),
            )
            .route(
                &format!("{base}/:id"),
                get(
                    move |state: State<SandboxApi>, headers: HeaderMap, id: Path<u64>| {
                        get_application(kind, state, headers, id)
                    },
                ),
            )
            .route(
                &format!("{base}/:id/profile-picture"),
                post(
                    move |state: State<SandboxApi>, id: Path<u64>, form: Multipart| {
                        upload_attachment(kind, AttachmentSlot::ProfilePicture, state, id, form)
                    },
                ),
            )
            .route(
                &format!("{base}/:id/medical-documents"),
                post(
                    move |state: State<SandboxApi>, id: Path<u64>, form: Multipart| {
                        upload_attachment(kind, AttachmentSlot::MedicalDocument, state, id, form)
                    },
                ),
            );
    }

    router
        .route("/ApplicationStatus/:segment/:id", put(update_application_status))
        .route("/Payment", get(list_payments).post(create_payment))
        .route("/Payment/:id", get(get_payment))
        .route(
            "/Payment/application/:application_type/:id",
            get(payment_for_application),
        )
        .route("/Payment/:id/confirm-transfer", post(confirm_transfer))
        .route("/Payment/:id/skip", post(skip_payment))
        .route("/Payment/:id/status", put(update_payment_status))
        .route("/Card", post(create_card))
        .route("/Card/check-number", get(check_card_number))
        .route("/Card/:id", put(update_card))
        .route("/Card/application/:card_type/:id", get(card_for_application))
        .route("/uploads/:name", get(download_upload))
        .with_state(api)
}

fn parse_kind(raw: &str) -> Result<ApplicationKind, SandboxError> {
    ApplicationKind::parse(raw)
        .ok_or_else(|| SandboxError::BadRequest(format!("unknown application type '{raw}'")))
}

async fn read_files(mut form: Multipart) -> Result<Vec<Attachment>, SandboxError> {
    let mut files = Vec::new();
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|err| SandboxError::BadRequest(err.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| SandboxError::BadRequest(err.to_string()))?;
        let mut attachment = Attachment::new(file_name, bytes.to_vec());
        if let Some(parsed) = content_type.and_then(|raw| raw.parse::<mime::Mime>().ok()) {
            attachment.content_type = parsed;
        }
        files.push(attachment);
    }
    Ok(files)
}

async fn list_applications(
    kind: ApplicationKind,
    State(api): State<SandboxApi>,
    headers: HeaderMap,
) -> ApiResult {
    api.require_admin(&headers)?;
    let applications = api.store.applications(kind);
    Ok(Json(json!({ "applications": applications })).into_response())
}

async fn create_application(
    kind: ApplicationKind,
    State(api): State<SandboxApi>,
    Json(fields): Json<ApplicationFields>,
) -> ApiResult {
    let application = api.store.create_application(kind, fields)?;
    info!(%kind, id = %application.id, "sandbox application created");
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

async fn upload_documents(
    kind: ApplicationKind,
    State(api): State<SandboxApi>,
    form: Multipart,
) -> ApiResult {
    let files = read_files(form).await?;
    let stored = api.store.store_supporting_documents(kind, &files)?;
    Ok(Json(stored).into_response())
}

async fn get_application(
    kind: ApplicationKind,
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let application = api.store.application(kind, ApplicationId(id))?;
    Ok(Json(application).into_response())
}

async fn upload_attachment(
    kind: ApplicationKind,
    slot: AttachmentSlot,
    State(api): State<SandboxApi>,
    Path(id): Path<u64>,
    form: Multipart,
) -> ApiResult {
    let files = read_files(form).await?;
    let file = files
        .into_iter()
        .next()
        .ok_or_else(|| SandboxError::BadRequest("no file uploaded".to_string()))?;
    api.store
        .store_attachment(kind, ApplicationId(id), slot, &file)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: ApplicationStatus,
}

async fn update_application_status(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Path((segment, id)): Path<(String, u64)>,
    Json(body): Json<StatusBody>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let kind = parse_kind(&segment)?;
    api.store
        .set_application_status(kind, ApplicationId(id), body.status)?;
    Ok(Json(json!({ "message": format!("status updated to {}", body.status) })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<u32>,
    page_size: Option<u32>,
    status: Option<String>,
}

async fn list_payments(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let defaults = PaymentQuery::default();
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<PaymentStatus>()
                .map_err(SandboxError::BadRequest)?,
        ),
    };
    let query = PaymentQuery {
        page: params.page.unwrap_or(defaults.page),
        page_size: params.page_size.unwrap_or(defaults.page_size),
        status,
    };
    Ok(Json(api.store.list_payments(&query)).into_response())
}

async fn create_payment(
    State(api): State<SandboxApi>,
    Json(payment): Json<NewPayment>,
) -> ApiResult {
    let created = api.store.create_payment(&payment)?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn get_payment(State(api): State<SandboxApi>, Path(id): Path<u64>) -> ApiResult {
    Ok(Json(api.store.payment(PaymentId(id))?).into_response())
}

async fn payment_for_application(
    State(api): State<SandboxApi>,
    Path((application_type, id)): Path<(String, u64)>,
) -> ApiResult {
    let kind = parse_kind(&application_type)?;
    let payment = api.store.payment_for_application(kind, ApplicationId(id))?;
    Ok(Json(payment).into_response())
}

async fn confirm_transfer(
    State(api): State<SandboxApi>,
    Path(id): Path<u64>,
    Json(confirmation): Json<BankTransferConfirmation>,
) -> ApiResult {
    let payment = api.store.confirm_transfer(PaymentId(id), &confirmation)?;
    Ok(Json(payment).into_response())
}

async fn skip_payment(State(api): State<SandboxApi>, Path(id): Path<u64>) -> ApiResult {
    Ok(Json(api.store.skip_payment(PaymentId(id))?).into_response())
}

async fn update_payment_status(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(update): Json<PaymentStatusUpdate>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let payment = api.store.update_payment_status(PaymentId(id), &update)?;
    Ok(Json(payment).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardNumberParams {
    card_number: String,
}

async fn check_card_number(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Query(params): Query<CardNumberParams>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let exists = api.store.card_number_exists(&params.card_number);
    Ok(Json(json!({ "exists": exists })).into_response())
}

async fn create_card(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Json(card): Json<NewCard>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let created = api.store.create_card(&card)?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn update_card(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(update): Json<CardUpdate>,
) -> ApiResult {
    api.require_admin(&headers)?;
    Ok(Json(api.store.update_card(CardId(id), &update)?).into_response())
}

async fn card_for_application(
    State(api): State<SandboxApi>,
    headers: HeaderMap,
    Path((card_type, id)): Path<(String, u64)>,
) -> ApiResult {
    api.require_admin(&headers)?;
    let kind = parse_kind(&card_type)?;
    Ok(Json(api.store.card_for_application(kind, ApplicationId(id))?).into_response())
}

async fn download_upload(State(api): State<SandboxApi>, Path(name): Path<String>) -> ApiResult {
    let upload = api
        .store
        .upload(&name)
        .ok_or_else(|| SandboxError::NotFound(format!("upload {name}")))?;
    Ok(([(header::CONTENT_TYPE, upload.content_type)], upload.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router_with_token(token: Option<&str>) -> (Arc<SandboxStore>, Router) {
        let store = Arc::new(SandboxStore::new());
        let router = sandbox_router(SandboxApi::new(store.clone(), token.map(str::to_string)));
        (store, router)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn support_payload() -> Value {
        json!({
            "firstName": "Omar",
            "lastName": "Haddad",
            "dateOfBirth": "1990-04-02",
            "gender": "male",
            "nationality": "UAE",
            "emiratesId": "784-1990-1234567-1",
            "phoneNumber": "0501234567",
            "email": "omar@example.com",
            "address": "Street 1",
            "city": "Dubai",
            "emirate": "Dubai",
            "supportType": "Mobility",
            "supportDescription": "Wheelchair access",
            "specialRequirements": null,
            "emergencyContactName": "Lina Haddad",
            "emergencyContactPhone": "0507654321",
            "includeLanyard": true
        })
    }

    #[tokio::test]
    async fn creates_application_with_pending_status() {
        let (_, router) = router_with_token(None);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/CustomerSupportApplication")
                    .header("content-type", "application/json")
                    .body(Body::from(support_payload().to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["applicationStatus"], "pending");
        assert_eq!(body["supportType"], "Mobility");
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn admin_routes_require_the_configured_token() {
        let (_, router) = router_with_token(Some("s3cret"));

        let anonymous = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/Payment?page=1&pageSize=10")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let authorized = router
            .oneshot(
                Request::builder()
                    .uri("/Payment?page=1&pageSize=10&status=Pending")
                    .header("authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(authorized.status(), StatusCode::OK);
        let body = json_body(authorized).await;
        assert_eq!(body["payments"], json!([]));
        assert_eq!(body["pagination"]["currentPage"], 1);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let (_, router) = router_with_token(None);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/Payment/99")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_card_number_is_a_conflict() {
        let (store, router) = router_with_token(None);
        let fields: ApplicationFields =
            serde_json::from_value(support_payload()).expect("fields");
        let application = store
            .create_application(ApplicationKind::CustomerSupport, fields)
            .expect("stored");
        store
            .set_application_status(
                ApplicationKind::CustomerSupport,
                application.id,
                ApplicationStatus::Approved,
            )
            .expect("approved");

        let card = json!({
            "cardNumber": "NDAid-1001",
            "cardholderName": "Omar Haddad",
            "cardType": "National Support Card",
            "issuedDate": "2025-01-01",
            "expiryDate": "2027-01-01",
            "status": "Active",
            "notes": "",
            "originalApplicationId": application.id.0,
            "originalApplicationType": "customer_support"
        });
        let request = |body: &Value| {
            Request::builder()
                .method("POST")
                .uri("/Card")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request")
        };

        let first = router.clone().oneshot(request(&card)).await.expect("first");
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = router.oneshot(request(&card)).await.expect("second");
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = json_body(second).await;
        assert!(body["message"]
            .as_str()
            .is_some_and(|message| message.contains("already exists")));
    }
}

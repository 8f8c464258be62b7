//! End-to-end scenarios running the blocking HTTP client against the sandbox API.
//!
//! Each test binds the sandbox router on an ephemeral port inside its own Tokio runtime, then
//! drives the applicant and administrator workflows through `HttpPortalClient` exactly as the
//! CLI does against the real service.

mod common {
    use std::sync::Arc;

    use axum::Router;
    use tokio::runtime::Runtime;

    use card_portal::client::{AdminSession, HttpPortalClient};
    use card_portal::sandbox::{sandbox_router, SandboxApi, SandboxStore};
    use card_portal::workflows::applications::{
        ApplicationDraft, ApplicationFields, ApplicationKind, Attachment, CarerDetails,
        CategoryDetails, ContactDetails, DisabilityDetails, EmergencyContact, IdentityDetails,
        SupportDetails,
    };

    pub(super) const ADMIN_TOKEN: &str = "sandbox-admin";

    pub(super) struct SandboxServer {
        _runtime: Runtime,
        pub(super) base_url: String,
        pub(super) store: Arc<SandboxStore>,
    }

    impl SandboxServer {
        pub(super) fn start() -> Self {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("runtime");
            let store = Arc::new(SandboxStore::new());
            let api = SandboxApi::new(store.clone(), Some(ADMIN_TOKEN.to_string()));
            let app = Router::new().nest("/api", sandbox_router(api));

            let listener = runtime
                .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
                .expect("bind ephemeral port");
            let address = listener.local_addr().expect("local address");
            runtime.spawn(async move {
                axum::serve(listener, app).await.expect("sandbox server");
            });

            Self {
                _runtime: runtime,
                base_url: format!("http://{address}/api"),
                store,
            }
        }

        pub(super) fn applicant(&self) -> HttpPortalClient {
            HttpPortalClient::new(self.base_url.clone(), std::time::Duration::from_secs(5))
        }

        pub(super) fn admin(&self) -> HttpPortalClient {
            self.applicant().with_admin(AdminSession::login(ADMIN_TOKEN))
        }
    }

    pub(super) fn fields(kind: ApplicationKind) -> ApplicationFields {
        let category = match kind {
            ApplicationKind::Disability => CategoryDetails::Disability(DisabilityDetails {
                disability_type: "Hearing".to_string(),
                disability_description: "Profound hearing loss".to_string(),
            }),
            ApplicationKind::Carer => CategoryDetails::Carer(CarerDetails {
                care_recipient_name: "Salem Obaid".to_string(),
                relationship_to_recipient: "Son".to_string(),
                caregiving_experience: "Three years".to_string(),
                supporting_documents: Vec::new(),
            }),
            ApplicationKind::CustomerSupport => CategoryDetails::CustomerSupport(SupportDetails {
                support_type: "Visual".to_string(),
                support_description: "Large-print forms".to_string(),
                special_requirements: "Guide dog".to_string(),
            }),
        };
        ApplicationFields {
            identity: IdentityDetails {
                first_name: "Noura".to_string(),
                last_name: "Obaid".to_string(),
                date_of_birth: "1979-11-30".to_string(),
                gender: "female".to_string(),
                nationality: "UAE".to_string(),
                national_id: "784-1979-7654321-2".to_string(),
            },
            contact: ContactDetails {
                phone_number: "0523334444".to_string(),
                email: "noura.obaid@example.ae".to_string(),
                address: "Apartment 9, Corniche Road".to_string(),
                city: "Sharjah".to_string(),
                region: "Sharjah".to_string(),
            },
            category,
            emergency: EmergencyContact {
                name: "Hamad Obaid".to_string(),
                phone: "0526667777".to_string(),
            },
            include_lanyard: false,
        }
    }

    pub(super) fn draft(kind: ApplicationKind) -> ApplicationDraft {
        ApplicationDraft::from_fields(fields(kind))
    }

    pub(super) fn picture() -> Attachment {
        Attachment::new("portrait.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3])
    }

    pub(super) fn document(name: &str) -> Attachment {
        Attachment::new(name, format!("%PDF-1.4 {name}").into_bytes())
    }
}

use std::sync::Arc;

use chrono::NaiveDate;

use card_portal::client::download::download_document;
use card_portal::client::{ClientError, HttpPortalClient, PortalBackend};
use card_portal::workflows::applications::{
    ApplicationId, ApplicationKind, ApplicationReview, ApplicationStatus, CategoryDetails,
    SubmissionOrchestrator,
};
use card_portal::workflows::cards::{
    CardIssueError, CardIssuer, CardStatus, NewCard, DEFAULT_CARD_PREFIX,
};
use card_portal::workflows::payments::{
    Amount, FeeSchedule, LedgerFilter, PaymentId, PaymentLedger, PaymentQuery, PaymentStatus,
    TransferDetails,
};
use common::*;

#[test]
fn applicant_and_admin_complete_the_disability_flow() {
    let server = SandboxServer::start();
    let applicant = Arc::new(server.applicant());
    let orchestrator = SubmissionOrchestrator::new(applicant.clone());

    let mut draft = draft(ApplicationKind::Disability);
    draft.set_include_lanyard(true);
    draft.set_profile_picture(picture());
    draft.attach_document(document("audiogram.pdf")).expect("attach");

    let receipt = orchestrator.submit(&draft).expect("submitted over HTTP");
    assert!(receipt.degraded.is_empty(), "{:?}", receipt.degraded);
    assert_eq!(receipt.application.status, ApplicationStatus::Pending);

    let mut stage = orchestrator.payment_stage(&receipt, FeeSchedule::default());
    assert_eq!(stage.total(), Amount::from_units(120));
    let payment = stage
        .confirm_bank_transfer(TransferDetails {
            transaction_reference: Some("FT2503XYZ".to_string()),
            bank_name: Some("ADCB".to_string()),
            transfer_date: NaiveDate::from_ymd_opt(2025, 3, 4),
        })
        .expect("transfer confirmed")
        .clone();
    assert_eq!(payment.payment_status, PaymentStatus::Submitted);
    assert_eq!(payment.total_amount, Amount::from_units(120));

    let admin = Arc::new(server.admin());
    let ledger = PaymentLedger::new(admin.clone());
    let confirmed = ledger
        .confirm(payment.id, Some("Received".to_string()))
        .expect("admin confirms");
    assert_eq!(confirmed.payment_status, PaymentStatus::Confirmed);

    let review = ApplicationReview::new(admin.clone());
    let approved = review
        .approve(ApplicationKind::Disability, receipt.application.id)
        .expect("approved");
    assert_eq!(approved.status, ApplicationStatus::Approved);
    assert_eq!(approved.medical_documents.len(), 1);

    let issuer = CardIssuer::new(admin.clone(), DEFAULT_CARD_PREFIX);
    let mut form = issuer
        .prepare(
            ApplicationKind::Disability,
            receipt.application.id,
            NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid"),
        )
        .expect("card form");
    form.set_manual_number("3001");
    let card = issuer.save(&form).expect("card issued");
    assert_eq!(card.card_number, "NDAid-3001");
    assert_eq!(card.cardholder_name, "Noura Obaid");

    let downloads = tempfile::tempdir().expect("tempdir");
    let picture_url = approved.profile_picture_url.expect("picture stored");
    let written = download_document(
        &admin,
        &picture_url,
        &server.base_url,
        downloads.path(),
        None,
    )
    .expect("downloaded");
    assert_eq!(std::fs::read(written).expect("read"), picture().bytes);
}

#[test]
fn carer_documents_travel_in_one_batch_before_create() {
    let server = SandboxServer::start();
    let orchestrator = SubmissionOrchestrator::new(Arc::new(server.applicant()));

    let mut draft = draft(ApplicationKind::Carer);
    draft.attach_document(document("power-of-attorney.pdf")).expect("attach");
    draft.attach_document(document("care-plan.pdf")).expect("attach");

    let receipt = orchestrator.submit(&draft).expect("submitted");
    let stored = server
        .store
        .application(ApplicationKind::Carer, receipt.application.id)
        .expect("stored");
    match stored.fields.category {
        CategoryDetails::Carer(details) => assert_eq!(details.supporting_documents.len(), 2),
        other => panic!("expected carer details, got {other:?}"),
    }
}

#[test]
fn skip_twice_over_http_is_harmless() {
    let server = SandboxServer::start();
    let applicant = Arc::new(server.applicant());
    let orchestrator = SubmissionOrchestrator::new(applicant.clone());
    let receipt = orchestrator
        .submit(&draft(ApplicationKind::CustomerSupport))
        .expect("submitted");

    let mut stage = orchestrator.payment_stage(&receipt, FeeSchedule::default());
    let first = stage.skip().expect("skipped").clone();
    let again = applicant.skip_payment(first.id).expect("already skipped resolves");
    assert_eq!(again.payment_status, PaymentStatus::Skipped);
    assert_eq!(again.id, first.id);
}

#[test]
fn missing_records_are_absent_not_errors() {
    let server = SandboxServer::start();
    let admin = server.admin();

    assert!(admin.get_payment(PaymentId(404)).expect("lookup").is_none());
    assert!(admin
        .payment_for_application(ApplicationKind::Carer, ApplicationId(404))
        .expect("lookup")
        .is_none());
    assert!(admin
        .get_application(ApplicationKind::Disability, ApplicationId(404))
        .expect("lookup")
        .is_none());
    assert!(admin
        .card_for_application(ApplicationKind::Disability, ApplicationId(404))
        .expect("lookup")
        .is_none());
}

#[test]
fn admin_calls_without_a_session_are_rejected() {
    let server = SandboxServer::start();
    let anonymous = server.applicant();

    let err = anonymous
        .list_payments(&PaymentQuery::default())
        .expect_err("token required");
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_retryable());

    let logged_out = server.admin().without_admin();
    assert!(logged_out
        .list_applications(ApplicationKind::Disability)
        .is_err());
}

#[test]
fn pending_filter_holds_over_http_for_any_page_size() {
    let server = SandboxServer::start();
    let applicant = Arc::new(server.applicant());
    let orchestrator = SubmissionOrchestrator::new(applicant);
    for index in 0..5 {
        let receipt = orchestrator
            .submit(&draft(ApplicationKind::Disability))
            .expect("submitted");
        let mut stage = orchestrator.payment_stage(&receipt, FeeSchedule::default());
        if index % 2 == 0 {
            stage.ensure_payment().expect("pending");
        } else {
            stage.skip().expect("skipped");
        }
    }

    let ledger = PaymentLedger::new(Arc::new(server.admin()));
    for page_size in [1, 2, 10] {
        let pending = ledger
            .all(
                &PaymentQuery {
                    page: 1,
                    page_size,
                    status: Some(PaymentStatus::Pending),
                },
                &LedgerFilter::default(),
            )
            .expect("listing");
        assert_eq!(pending.len(), 3);
        assert!(pending
            .iter()
            .all(|payment| payment.payment_status == PaymentStatus::Pending));
    }
}

#[test]
fn duplicate_card_number_surfaces_as_duplicate_over_http() {
    let server = SandboxServer::start();
    let admin = Arc::new(server.admin());
    let orchestrator = SubmissionOrchestrator::new(Arc::new(server.applicant()));
    let review = ApplicationReview::new(admin.clone());
    let issuer = CardIssuer::new(admin.clone(), DEFAULT_CARD_PREFIX);
    let today = NaiveDate::from_ymd_opt(2025, 5, 5).expect("valid");

    let mut issued_ids = Vec::new();
    for _ in 0..2 {
        let receipt = orchestrator
            .submit(&draft(ApplicationKind::CustomerSupport))
            .expect("submitted");
        review
            .approve(ApplicationKind::CustomerSupport, receipt.application.id)
            .expect("approved");
        issued_ids.push(receipt.application.id);
    }

    let mut first = issuer
        .prepare(ApplicationKind::CustomerSupport, issued_ids[0], today)
        .expect("form");
    first.set_manual_number("8080");
    issuer.save(&first).expect("issued");

    let mut second = issuer
        .prepare(ApplicationKind::CustomerSupport, issued_ids[1], today)
        .expect("form");
    second.set_manual_number("8080");
    assert!(matches!(
        issuer.save(&second),
        Err(CardIssueError::DuplicateCardNumber(_))
    ));

    let raw = admin
        .create_card(&NewCard {
            card_number: "NDAid-8080".to_string(),
            cardholder_name: "Noura Obaid".to_string(),
            card_type: "National Support Card".to_string(),
            issued_date: today,
            expiry_date: today,
            status: CardStatus::Active,
            notes: String::new(),
            original_application_id: issued_ids[1],
            original_application_type: ApplicationKind::CustomerSupport,
        })
        .expect_err("bypassing the pre-check still fails");
    assert!(matches!(raw, ClientError::DuplicateCardNumber { .. }));
}

#[test]
fn unresponsive_service_times_out() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("address");
    let client = HttpPortalClient::new(
        format!("http://{address}/api"),
        std::time::Duration::from_millis(200),
    );

    let err = client
        .list_applications(ApplicationKind::Disability)
        .expect_err("nobody answers");
    assert!(matches!(err, ClientError::Timeout), "{err:?}");
    assert!(err.is_retryable());
    drop(listener);
}

use super::common::*;
use crate::client::AttachmentSlot;
use crate::sandbox::SandboxFaults;
use crate::workflows::applications::{
    ApplicationKind, ApplicationStatus, CategoryDetails, FormController, FormStage, FormStep,
    ReceiptOutcome, SubmissionError, SubmissionOrchestrator,
};
use crate::workflows::payments::{Amount, FeeSchedule};

#[test]
fn failed_document_batch_blocks_the_create_call() {
    let backend = RecordingBackend::shared();
    backend.fail("upload_supporting_documents", 500);
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let mut draft = complete_draft(ApplicationKind::Carer);
    draft.attach_document(pdf("guardianship.pdf")).expect("attach");

    let err = orchestrator.submit(&draft).expect_err("upload failure is fatal");
    assert!(matches!(err, SubmissionError::DocumentUpload(_)));
    assert_eq!(err.action(), "upload supporting documents");
    assert!(err.is_retryable());
    assert_eq!(backend.count("submit_application"), 0);
    assert!(backend.store.applications(ApplicationKind::Carer).is_empty());
}

#[test]
fn carer_documents_are_stored_before_create_and_embedded() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let mut draft = complete_draft(ApplicationKind::Carer);
    draft.attach_document(pdf("guardianship.pdf")).expect("attach");
    draft.attach_document(pdf("medical-report.pdf")).expect("attach");

    let receipt = orchestrator.submit(&draft).expect("submitted");
    assert_eq!(
        backend.calls(),
        vec!["upload_supporting_documents", "submit_application"]
    );
    match &receipt.application.fields.category {
        CategoryDetails::Carer(details) => {
            assert_eq!(details.supporting_documents.len(), 2);
            assert!(details.supporting_documents[0].ends_with("guardianship.pdf"));
        }
        other => panic!("expected carer details, got {other:?}"),
    }
}

#[test]
fn profile_picture_failure_still_reports_success() {
    let backend = RecordingBackend::shared();
    backend.store.set_faults(SandboxFaults {
        reject_profile_pictures: true,
        ..SandboxFaults::default()
    });
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let mut draft = complete_draft(ApplicationKind::CustomerSupport);
    draft.set_profile_picture(png("me.png"));

    let receipt = orchestrator.submit(&draft).expect("application committed");
    assert_eq!(receipt.application.status, ApplicationStatus::Pending);
    assert_eq!(receipt.degraded.len(), 1);
    assert_eq!(receipt.degraded[0].slot, AttachmentSlot::ProfilePicture);
    assert_eq!(receipt.degraded[0].file_name, "me.png");
    assert_eq!(
        backend.store.applications(ApplicationKind::CustomerSupport).len(),
        1
    );
}

#[test]
fn medical_documents_upload_after_create_and_failures_degrade() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let mut draft = complete_draft(ApplicationKind::Disability);
    draft.set_profile_picture(png("me.png"));
    draft.attach_document(pdf("diagnosis.pdf")).expect("attach");
    draft.attach_document(pdf("prescription.pdf")).expect("attach");

    let receipt = orchestrator.submit(&draft).expect("submitted");
    assert!(receipt.degraded.is_empty());
    assert_eq!(backend.calls()[0], "submit_application");
    assert_eq!(backend.count("upload_medical_document"), 2);

    let stored = backend
        .store
        .application(ApplicationKind::Disability, receipt.application.id)
        .expect("stored");
    assert_eq!(stored.medical_documents.len(), 2);
    assert!(stored.profile_picture_url.is_some());

    let failing = RecordingBackend::shared();
    failing.fail("upload_medical_document", 503);
    let receipt = SubmissionOrchestrator::new(failing.clone())
        .submit(&draft)
        .expect("still submitted");
    assert_eq!(receipt.degraded.len(), 2);
    assert!(receipt
        .degraded
        .iter()
        .all(|failure| failure.slot == AttachmentSlot::MedicalDocument));
}

#[test]
fn invalid_draft_makes_no_requests() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend.clone());
    let mut draft = complete_draft(ApplicationKind::Disability);
    draft.fields.contact.email.clear();

    let err = orchestrator.submit(&draft).expect_err("validation");
    assert!(matches!(err, SubmissionError::Validation(_)));
    assert!(!err.is_retryable());
    assert!(backend.calls().is_empty());
}

#[test]
fn create_failure_keeps_the_message_and_stays_on_review() {
    let backend = RecordingBackend::shared();
    backend.fail("submit_application", 400);
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let mut controller = FormController::with_draft(complete_draft(ApplicationKind::Disability));
    let err = orchestrator
        .submit_from(&mut controller)
        .expect_err("create fails");

    assert_eq!(err.action(), "submit application");
    assert!(err.to_string().contains("injected submit_application failure"));
    assert!(matches!(controller.stage(), FormStage::Editing(_)));
}

#[test]
fn submitted_fields_round_trip_through_the_store() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    for kind in ApplicationKind::ALL {
        let draft = complete_draft(kind);
        let receipt = orchestrator.submit(&draft).expect("submitted");
        let stored = backend
            .store
            .application(kind, receipt.application.id)
            .expect("stored");
        assert_eq!(stored.fields, draft.fields);

        let json = serde_json::to_value(&stored).expect("serializes");
        let parsed: crate::workflows::applications::SubmittedApplication =
            serde_json::from_value(json).expect("parses");
        assert_eq!(parsed.kind(), kind);
        assert_eq!(parsed.fields, draft.fields);
    }
}

#[test]
fn lanyard_flag_drives_the_payment_amounts() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let plain = orchestrator
        .submit(&complete_draft(ApplicationKind::Disability))
        .expect("submitted");
    let mut stage = orchestrator.payment_stage(&plain, FeeSchedule::default());
    let payment = stage.ensure_payment().expect("payment").clone();
    assert_eq!(payment.total_amount, Amount::from_units(100));
    assert_eq!(payment.lanyard_amount, Amount::ZERO);

    let mut draft = complete_draft(ApplicationKind::Disability);
    draft.set_include_lanyard(true);
    let with_lanyard = orchestrator.submit(&draft).expect("submitted");
    let mut stage = orchestrator.payment_stage(&with_lanyard, FeeSchedule::default());
    let payment = stage.ensure_payment().expect("payment").clone();
    assert_eq!(payment.total_amount, Amount::from_units(120));
    assert_eq!(payment.lanyard_amount, Amount::from_units(20));
    assert!(payment.total_is_consistent());
}

#[test]
fn submit_from_moves_the_controller_into_payment() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend);
    let mut controller = FormController::with_draft(complete_draft(ApplicationKind::Carer));

    let receipt = orchestrator.submit_from(&mut controller).expect("submitted");
    match controller.stage() {
        FormStage::Payment { application, .. } => assert_eq!(application.id, receipt.application.id),
        other => panic!("expected payment stage, got {other:?}"),
    }
}

#[test]
fn reset_while_in_flight_leaves_the_controller_alone() {
    let backend = RecordingBackend::shared();
    let orchestrator = SubmissionOrchestrator::new(backend.clone());
    let mut controller = FormController::with_draft(complete_draft(ApplicationKind::Disability));

    let ticket = controller.begin_submission().expect("valid draft");
    let draft = controller.draft().clone();
    controller.reset();
    let receipt = orchestrator.submit(&draft).expect("submitted");

    assert_eq!(
        orchestrator.apply_receipt(&mut controller, ticket, &receipt),
        ReceiptOutcome::Stale
    );
    assert_eq!(controller.current_step(), Some(FormStep::PersonalInformation));
    assert!(backend
        .store
        .application(ApplicationKind::Disability, receipt.application.id)
        .is_ok());
}

use crate::infra::parse_date;
use card_portal::client::PortalBackend;
use card_portal::config::AppConfig;
use card_portal::error::AppError;
use card_portal::sandbox::SandboxStore;
use card_portal::workflows::applications::{
    ApplicationDraft, ApplicationFields, ApplicationKind, ApplicationReview, Attachment,
    CategoryDetails, ContactDetails, DisabilityDetails, EmergencyContact, FormController,
    FormStep, IdentityDetails, SubmissionError, SubmissionOrchestrator, SupportDetails,
};
use card_portal::workflows::cards::CardIssuer;
use card_portal::workflows::payments::{
    FeeSchedule, LedgerFilter, PaymentLedger, PaymentQuery, PaymentStatus, TransferDetails,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Order the lanyard with the disability card
    #[arg(long)]
    pub(crate) lanyard: bool,
    /// Digits typed into the card issuance form
    #[arg(long, default_value = "1001")]
    pub(crate) card_number: String,
    /// Issue date for the card (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

/// What the demo produced, for printing or inspection.
#[derive(Debug, Serialize)]
pub(crate) struct DemoSummary {
    pub(crate) application_id: u64,
    pub(crate) application_status: String,
    pub(crate) amount_due: String,
    pub(crate) transfer_reference: String,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) skipped_payment_status: PaymentStatus,
    pub(crate) card_number: String,
    pub(crate) card_expiry: NaiveDate,
    pub(crate) degraded_uploads: usize,
}

pub(crate) fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = Arc::new(SandboxStore::new());
    let json = args.json;
    let summary = demo_flow(store, config.fees, &config.card_prefix, args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Card portal demo (in-process sandbox)");
    println!(
        "- disability application #{} is {}",
        summary.application_id, summary.application_status
    );
    println!(
        "- amount due {} | transfer reference {}",
        summary.amount_due, summary.transfer_reference
    );
    println!("- payment after admin confirmation: {}", summary.payment_status);
    println!(
        "- customer support payment skipped twice: {}",
        summary.skipped_payment_status
    );
    println!(
        "- card {} issued, valid until {}",
        summary.card_number, summary.card_expiry
    );
    if summary.degraded_uploads > 0 {
        println!("- {} optional uploads failed", summary.degraded_uploads);
    }
    Ok(())
}

/// Walks one application from draft to issued card, and skips payment on a second one.
pub(crate) fn demo_flow<B>(
    backend: Arc<B>,
    fees: FeeSchedule,
    card_prefix: &str,
    args: DemoArgs,
) -> Result<DemoSummary, AppError>
where
    B: PortalBackend + 'static,
{
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let orchestrator = SubmissionOrchestrator::new(backend.clone());

    let mut draft = ApplicationDraft::from_fields(sample_fields(ApplicationKind::Disability));
    draft.set_include_lanyard(args.lanyard);
    draft.set_profile_picture(Attachment::new("portrait.png", SAMPLE_PNG.to_vec()));
    draft.attach_document(Attachment::new(
        "medical-report.pdf",
        b"%PDF-1.4 sample medical report".to_vec(),
    ))?;

    let mut controller = FormController::with_draft(draft);
    while controller.current_step() != Some(FormStep::Review) {
        controller.next().map_err(SubmissionError::from)?;
    }
    let receipt = orchestrator.submit_from(&mut controller)?;

    let mut stage = orchestrator.payment_stage(&receipt, fees);
    let amount_due = stage.total();
    let transfer_reference = stage.transfer_reference();
    let submitted = stage
        .confirm_bank_transfer(TransferDetails {
            transaction_reference: Some("DEMO-TRX-0001".to_string()),
            bank_name: Some("Sandbox Bank".to_string()),
            transfer_date: Some(today),
        })?
        .clone();

    let ledger = PaymentLedger::new(backend.clone());
    let awaiting = ledger.all(
        &PaymentQuery {
            status: Some(PaymentStatus::Submitted),
            ..PaymentQuery::default()
        },
        &LedgerFilter::default(),
    )?;
    let payment_status = match awaiting.iter().find(|payment| payment.id == submitted.id) {
        Some(payment) => {
            ledger
                .confirm(payment.id, Some("Matched against bank statement".to_string()))?
                .payment_status
        }
        None => submitted.payment_status,
    };

    let review = ApplicationReview::new(backend.clone());
    let approved = review.approve(ApplicationKind::Disability, receipt.application.id)?;

    let issuer = CardIssuer::new(backend.clone(), card_prefix);
    let mut form = issuer.prepare(ApplicationKind::Disability, approved.id, today)?;
    form.set_manual_number(&args.card_number);
    let card = issuer.save(&form)?;

    let support = orchestrator.submit(&ApplicationDraft::from_fields(sample_fields(
        ApplicationKind::CustomerSupport,
    )))?;
    let mut support_stage = orchestrator.payment_stage(&support, fees);
    let skipped = support_stage.skip()?.id;
    let skipped_again = backend.skip_payment(skipped)?;

    Ok(DemoSummary {
        application_id: approved.id.0,
        application_status: approved.status.to_string(),
        amount_due: amount_due.to_string(),
        transfer_reference,
        payment_status,
        skipped_payment_status: skipped_again.payment_status,
        card_number: card.card_number,
        card_expiry: card.expiry_date,
        degraded_uploads: receipt.degraded.len() + support.degraded.len(),
    })
}

const SAMPLE_PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn sample_fields(kind: ApplicationKind) -> ApplicationFields {
    let category = match kind {
        ApplicationKind::Disability => CategoryDetails::Disability(DisabilityDetails {
            disability_type: "Mobility".to_string(),
            disability_description: "Uses a wheelchair outdoors".to_string(),
        }),
        ApplicationKind::CustomerSupport => CategoryDetails::CustomerSupport(SupportDetails {
            support_type: "Hearing".to_string(),
            support_description: "Needs a sign language interpreter".to_string(),
            special_requirements: "Appointments by text message".to_string(),
        }),
        ApplicationKind::Carer => CategoryDetails::empty(ApplicationKind::Carer),
    };
    ApplicationFields {
        identity: IdentityDetails {
            first_name: "Aisha".to_string(),
            last_name: "Al Hammadi".to_string(),
            date_of_birth: "1988-04-12".to_string(),
            gender: "female".to_string(),
            nationality: "UAE".to_string(),
            national_id: "784-1988-1234567-1".to_string(),
        },
        contact: ContactDetails {
            phone_number: "0501234567".to_string(),
            email: "aisha.hammadi@example.ae".to_string(),
            address: "Villa 12, Street 4".to_string(),
            city: "Abu Dhabi".to_string(),
            region: "Abu Dhabi".to_string(),
        },
        category,
        emergency: EmergencyContact {
            name: "Khalid Al Hammadi".to_string(),
            phone: "0507654321".to_string(),
        },
        include_lanyard: false,
    }
}

use crate::cli::RemoteArgs;
use crate::infra::{applicant_client, load_draft, parse_date};
use card_portal::config::AppConfig;
use card_portal::error::AppError;
use card_portal::workflows::applications::{
    FormController, FormStep, SubmissionError, SubmissionOrchestrator,
};
use card_portal::workflows::payments::{Payment, TransferDetails};
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    #[command(flatten)]
    pub(crate) remote: RemoteArgs,
    /// JSON file holding the application fields, keyed as the remote service expects
    #[arg(long)]
    pub(crate) draft: PathBuf,
    /// Profile picture to upload after the application is created
    #[arg(long)]
    pub(crate) profile_picture: Option<PathBuf>,
    /// Supporting or medical document; repeat the flag for several files
    #[arg(long = "document")]
    pub(crate) documents: Vec<PathBuf>,
    /// Add the lanyard to the card order
    #[arg(long)]
    pub(crate) lanyard: bool,
    /// Leave payment for later; an administrator settles it
    #[arg(long, conflicts_with = "confirm_transfer")]
    pub(crate) skip_payment: bool,
    /// Report that the bank transfer has been made
    #[arg(long)]
    pub(crate) confirm_transfer: bool,
    /// Bank transaction reference of the transfer
    #[arg(long, requires = "confirm_transfer")]
    pub(crate) transaction_reference: Option<String>,
    /// Name of the sending bank
    #[arg(long, requires = "confirm_transfer")]
    pub(crate) bank_name: Option<String>,
    /// Date of the transfer (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, requires = "confirm_transfer")]
    pub(crate) transfer_date: Option<NaiveDate>,
}

pub(crate) fn run_apply(args: ApplyArgs, config: &AppConfig) -> Result<(), AppError> {
    let draft = load_draft(
        &args.draft,
        args.profile_picture.as_deref(),
        &args.documents,
        args.lanyard,
    )?;

    let mut controller = FormController::with_draft(draft);
    println!("{} application", controller.draft().kind());
    while let Some(step) = controller.current_step() {
        if step == FormStep::Review {
            break;
        }
        controller.next().map_err(SubmissionError::from)?;
        println!("- step {} {}: complete", step.number(), step.title());
    }

    let orchestrator = SubmissionOrchestrator::new(Arc::new(applicant_client(config)));
    let receipt = orchestrator.submit_from(&mut controller)?;
    println!(
        "Application #{} submitted for {} ({})",
        receipt.application.id,
        receipt.application.full_name(),
        receipt.application.status
    );
    for failure in &receipt.degraded {
        println!(
            "  ! {} '{}' was not uploaded: {}",
            failure.slot, failure.file_name, failure.error
        );
    }

    let mut stage = orchestrator.payment_stage(&receipt, config.fees);
    let quote = stage.quote();
    println!(
        "Amount due: {} (card {} + lanyard {})",
        quote.total, quote.base, quote.lanyard
    );
    println!(
        "Bank transfer reference: {} | method: {}",
        stage.transfer_reference(),
        stage.method()
    );

    let payment: Payment = if args.skip_payment {
        stage.skip()?.clone()
    } else if args.confirm_transfer {
        stage
            .confirm_bank_transfer(TransferDetails {
                transaction_reference: args.transaction_reference,
                bank_name: args.bank_name,
                transfer_date: args.transfer_date,
            })?
            .clone()
    } else {
        stage.ensure_payment()?.clone()
    };
    println!(
        "Payment #{} recorded as {} ({})",
        payment.id, payment.payment_status, payment.total_amount
    );
    Ok(())
}

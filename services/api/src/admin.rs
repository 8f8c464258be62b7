use crate::cli::RemoteArgs;
use crate::infra::{admin_client, parse_date};
use card_portal::client::download::download_document;
use card_portal::config::AppConfig;
use card_portal::error::AppError;
use card_portal::workflows::applications::{
    ApplicationId, ApplicationKind, ApplicationReview, ApplicationStatus, ReviewFilter,
};
use card_portal::workflows::cards::{CardIssuer, CardStatus};
use card_portal::workflows::payments::{
    export_csv, LedgerFilter, Payment, PaymentId, PaymentLedger, PaymentQuery, PaymentStatus,
};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct AdminArgs {
    #[command(flatten)]
    pub(crate) remote: RemoteArgs,
    /// Admin bearer token (defaults to PORTAL_ADMIN_TOKEN)
    #[arg(long, global = true)]
    pub(crate) token: Option<String>,
    #[command(subcommand)]
    pub(crate) command: AdminCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum AdminCommand {
    /// Payment ledger operations
    Payments {
        #[command(subcommand)]
        command: PaymentsCommand,
    },
    /// Application review operations
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
    /// Issue the card for an approved application, or edit the one already issued
    IssueCard(IssueCardArgs),
    /// Download a stored document or profile picture
    Download(DownloadArgs),
}

#[derive(Subcommand, Debug)]
pub(crate) enum PaymentsCommand {
    /// List payments, newest first
    List(PaymentListArgs),
    /// Write every matching payment as CSV
    Export(PaymentExportArgs),
    /// Mark a pending or submitted payment as confirmed
    Confirm(SettleArgs),
    /// Mark a pending or submitted payment as skipped
    Skip(SettleArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct PaymentFilterArgs {
    /// Only payments with this status (pending, submitted, confirmed, skipped)
    #[arg(long)]
    pub(crate) status: Option<PaymentStatus>,
    /// Only payments for this application type
    #[arg(long = "type")]
    pub(crate) application_type: Option<ApplicationKind>,
    /// Free-text search over name, phone, id and transaction reference
    #[arg(long)]
    pub(crate) search: Option<String>,
}

impl PaymentFilterArgs {
    fn split(&self, page: u32, page_size: u32) -> (PaymentQuery, LedgerFilter) {
        (
            PaymentQuery {
                page,
                page_size,
                status: self.status,
            },
            LedgerFilter {
                search: self.search.clone(),
                application_type: self.application_type,
            },
        )
    }
}

#[derive(Args, Debug)]
pub(crate) struct PaymentListArgs {
    #[command(flatten)]
    pub(crate) filter: PaymentFilterArgs,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
    #[arg(long, default_value_t = 10)]
    pub(crate) page_size: u32,
}

#[derive(Args, Debug)]
pub(crate) struct PaymentExportArgs {
    #[command(flatten)]
    pub(crate) filter: PaymentFilterArgs,
    /// Output file; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SettleArgs {
    /// Payment id
    pub(crate) id: u64,
    /// Notes stored with the status change
    #[arg(long)]
    pub(crate) notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ReviewCommand {
    /// List applications of one type, newest first
    List(ReviewListArgs),
    /// Approve a pending application
    Approve(DecisionArgs),
    /// Reject a pending application
    Reject(DecisionArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ReviewListArgs {
    /// disability, carer or customer-support
    pub(crate) kind: ApplicationKind,
    #[arg(long)]
    pub(crate) status: Option<ApplicationStatus>,
    /// Matches full name, e-mail or phone number
    #[arg(long)]
    pub(crate) search: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DecisionArgs {
    pub(crate) kind: ApplicationKind,
    pub(crate) id: u64,
}

#[derive(Args, Debug)]
pub(crate) struct IssueCardArgs {
    pub(crate) kind: ApplicationKind,
    pub(crate) id: u64,
    /// Digits appended to the card prefix (ignored when the card already exists)
    #[arg(long)]
    pub(crate) number: Option<String>,
    #[arg(long)]
    pub(crate) status: Option<CardStatus>,
    /// Expiry date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) expiry: Option<NaiveDate>,
    #[arg(long)]
    pub(crate) notes: Option<String>,
    /// Issue date used to pre-fill the form (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct DownloadArgs {
    /// Stored URL of the document or picture
    pub(crate) url: String,
    /// Directory the file is written to
    #[arg(long, default_value = ".")]
    pub(crate) dir: PathBuf,
    /// File name to write; defaults to the last URL segment
    #[arg(long)]
    pub(crate) name: Option<String>,
}

pub(crate) fn run_admin(args: AdminArgs, config: &AppConfig) -> Result<(), AppError> {
    let client = Arc::new(admin_client(config, args.token));

    match args.command {
        AdminCommand::Payments { command } => {
            let ledger = PaymentLedger::new(client);
            match command {
                PaymentsCommand::List(list) => {
                    let (query, filter) = list.filter.split(list.page, list.page_size);
                    let page = ledger.page(&query, &filter)?;
                    for payment in &page.payments {
                        print_payment(payment);
                    }
                    println!(
                        "page {} of {} ({} payments)",
                        page.pagination.current_page,
                        page.pagination.total_pages.max(1),
                        page.pagination.total_items
                    );
                    if page.discarded > 0 {
                        println!(
                            "{} records outside the requested status were hidden",
                            page.discarded
                        );
                    }
                }
                PaymentsCommand::Export(export) => {
                    let (query, filter) = export.filter.split(1, 100);
                    let payments = ledger.all(&query, &filter)?;
                    match export.output {
                        Some(path) => {
                            export_csv(&payments, File::create(&path)?)?;
                            info!(path = %path.display(), rows = payments.len(), "payments exported");
                        }
                        None => export_csv(&payments, io::stdout().lock())?,
                    }
                }
                PaymentsCommand::Confirm(settle) => {
                    let payment = ledger.confirm(PaymentId(settle.id), settle.notes)?;
                    print_payment(&payment);
                }
                PaymentsCommand::Skip(settle) => {
                    let payment = ledger.mark_skipped(PaymentId(settle.id), settle.notes)?;
                    print_payment(&payment);
                }
            }
        }
        AdminCommand::Review { command } => {
            let review = ApplicationReview::new(client);
            match command {
                ReviewCommand::List(list) => {
                    let filter = ReviewFilter {
                        search: list.search,
                        status: list.status,
                    };
                    for application in review.list(list.kind, &filter)? {
                        println!(
                            "#{} {} | {} | {} | {}",
                            application.id,
                            application.full_name(),
                            application.fields.contact.email,
                            application.fields.contact.phone_number,
                            application.status
                        );
                    }
                }
                ReviewCommand::Approve(decision) => {
                    let application = review.approve(decision.kind, ApplicationId(decision.id))?;
                    println!("Application #{} is now {}", application.id, application.status);
                }
                ReviewCommand::Reject(decision) => {
                    let application = review.reject(decision.kind, ApplicationId(decision.id))?;
                    println!("Application #{} is now {}", application.id, application.status);
                }
            }
        }
        AdminCommand::IssueCard(issue) => {
            let issuer = CardIssuer::new(client, config.card_prefix.clone());
            let today = issue.today.unwrap_or_else(|| Local::now().date_naive());
            let mut form = issuer.prepare(issue.kind, ApplicationId(issue.id), today)?;
            if form.is_edit() {
                println!("A card already exists for this application; updating it");
            } else if let Some(number) = issue.number.as_deref() {
                form.set_manual_number(number);
            }
            if let Some(status) = issue.status {
                form.status = status;
            }
            if let Some(expiry) = issue.expiry {
                form.expiry_date = expiry;
            }
            if let Some(notes) = issue.notes {
                form.notes = notes;
            }

            let card = issuer.save(&form)?;
            println!(
                "Card {} for {} ({}) valid {} to {} [{:?}]",
                card.card_number,
                card.cardholder_name,
                card.card_type,
                card.issued_date,
                card.expiry_date,
                card.status
            );
        }
        AdminCommand::Download(download) => {
            let path = download_document(
                &client,
                &download.url,
                &config.remote.asset_origin,
                &download.dir,
                download.name.as_deref(),
            )?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

fn print_payment(payment: &Payment) {
    let name = payment
        .applicant_name
        .clone()
        .unwrap_or_else(|| format!("{} {}", payment.first_name, payment.last_name));
    println!(
        "#{} {} | {} | {} | {} | ref {}",
        payment.id,
        payment.transfer_reference(),
        name.trim(),
        payment.total_amount,
        payment.payment_status,
        payment.transaction_reference.as_deref().unwrap_or("-")
    );
}

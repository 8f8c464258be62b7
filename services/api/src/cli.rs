use crate::admin::{run_admin, AdminArgs};
use crate::applicant::{run_apply, ApplyArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use card_portal::config::AppConfig;
use card_portal::error::AppError;
use card_portal::telemetry;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "card-portal",
    about = "Apply for national support cards and run the back-office workflows",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host the sandbox portal API (default command)
    Serve(ServeArgs),
    /// Submit an application from a JSON draft and finalize its payment
    Apply(ApplyArgs),
    /// Administrator operations: payments, review, card issuance, downloads
    Admin(AdminArgs),
    /// Run the applicant and administrator flow against an in-process sandbox
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Bearer token required on admin routes (defaults to PORTAL_ADMIN_TOKEN)
    #[arg(long)]
    pub(crate) admin_token: Option<String>,
}

/// Remote endpoint overrides shared by the client-side commands.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct RemoteArgs {
    /// Base URL of the portal API (defaults to PORTAL_API_BASE_URL)
    #[arg(long, global = true)]
    pub(crate) base_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Apply(args) => {
            let config = client_config(&args.remote)?;
            run_apply(args, &config)
        }
        Command::Admin(args) => {
            let config = client_config(&args.remote)?;
            run_admin(args, &config)
        }
        Command::Demo(args) => {
            let config = AppConfig::load()?;
            telemetry::init(&config.telemetry, config.environment)?;
            run_demo(args, &config)
        }
    }
}

fn client_config(remote: &RemoteArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(base_url) = remote.base_url.as_deref() {
        config.remote.base_url = base_url.trim().trim_end_matches('/').to_string();
    }
    telemetry::init(&config.telemetry, config.environment)?;
    Ok(config)
}

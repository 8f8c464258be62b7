use card_portal_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        match err.action() {
            Some(action) => eprintln!("could not {action}: {err}"),
            None => eprintln!("application error: {err}"),
        }
        std::process::exit(1);
    }
}

use federation_auth::callback::{
    AlertLevel, AlertSink, CallbackContext, CallbackParams, IdentitySink, OutcomeStatus,
};
use federation_auth::claims::ClaimSet;
use log::*;
use service::{config::Config, logging::Logger};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

mod setup;

/// Prints the session changes the host would make.
struct ConsoleSession;

impl IdentitySink for ConsoleSession {
    fn sign_in(&mut self, claims: ClaimSet) {
        for claim in &claims {
            println!("  {:?}: {}", claim.claim_type, claim.value);
        }
    }

    fn sign_out(&mut self) {
        println!("  session cleared");
    }
}

struct ConsoleAlerts;

impl AlertSink for ConsoleAlerts {
    fn add_alert(&mut self, level: AlertLevel, message: &str) {
        println!("[{:?}] {}", level, message);
    }
}

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    let provider = match setup::build_provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Unable to configure the identity provider: {e}");
            std::process::exit(1);
        }
    };

    let callback_url = config.callback_url().unwrap_or_default();
    let request = match provider.build_authorize_url(&callback_url) {
        Ok(request) => request,
        Err(e) => {
            error!("Unable to build the authorization redirect: {e}");
            std::process::exit(1);
        }
    };

    println!("Open the following URL in a browser and sign in:\n\n{}\n", request.url);
    println!("Then paste the full URL the browser was redirected to:");

    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = stdin.read_line(&mut line).await {
        error!("Failed to read the callback URL: {e}");
        std::process::exit(1);
    }

    let params = match Url::parse(line.trim()) {
        Ok(url) => CallbackParams::from_url(&url),
        Err(e) => {
            error!("Not a valid callback URL: {e}");
            std::process::exit(1);
        }
    };

    let processor = match setup::build_processor(&config, provider) {
        Ok(processor) => processor,
        Err(e) => {
            error!("Unable to configure the callback processor: {e}");
            std::process::exit(1);
        }
    };
    let outcome = processor
        .process(&params, Some(request.state), &CallbackContext::default())
        .await;

    let status = outcome.status;
    let target = outcome.apply(&mut ConsoleSession, &mut ConsoleAlerts);
    println!("Outcome: {:?}, redirect to {}", status, target);

    if status != OutcomeStatus::Authenticated {
        std::process::exit(2);
    }
}

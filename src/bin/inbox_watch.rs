//! Watches one account's inbox and alerts on new anonymous messages.
//!
//! Environment:
//!   INBOX_URL         server base URL (default http://localhost:3000)
//!   INBOX_IDENTIFIER  email or username
//!   INBOX_PASSWORD    account password
//!   INBOX_SOUND       ring the terminal bell on alerts (default true)
//!   INBOX_POLL_SECS   poll interval in seconds (default 30)

use anony_exchange::client::{poller::DEFAULT_POLL_INTERVAL_SECS, ConsoleAlert, InboxClient, WatchSession};
use dotenv::dotenv;
use std::{env, error::Error, sync::Arc, time::Duration};

fn required(name: &str) -> Result<String, String> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{} must be set", name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let base_url = env::var("INBOX_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let identifier = required("INBOX_IDENTIFIER")?;
    let password = required("INBOX_PASSWORD")?;
    let sound = env::var("INBOX_SOUND")
        .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
        .unwrap_or(true);
    let poll_secs: u64 = env::var("INBOX_POLL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
        .max(1);

    let session = WatchSession::start(
        InboxClient::new(&base_url)?,
        &identifier,
        &password,
        Arc::new(ConsoleAlert),
        sound,
        Duration::from_secs(poll_secs),
    )
    .await?;
    log::info!("🔔 Watching {} for {}", base_url, session.username());

    tokio::signal::ctrl_c().await?;
    log::info!("👋 Shutting down");
    session.sign_out().await?;

    Ok(())
}

// ==================== VERIFICATION MAIL DELIVERY ====================
// Codes are either posted to an HTTP mail relay (MAIL_RELAY_URL) or, in
// development, written to the log.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &str, username: &str, code: &str) -> Result<(), String>;
}

#[derive(Debug, Serialize)]
struct RelayMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// Plain-text body of the verification mail
pub fn verification_text(username: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        "Hello {username},\n\n\
         Your verification code is: {code}\n\n\
         This code will expire in {ttl_minutes} minutes.\n\n\
         For security:\n\
         - Never share this code with anyone\n\
         - Our team will never ask for your code\n\
         - Enter the code on our website only\n\n\
         If you didn't request this code, please ignore this email.\n\n\
         Thank you!\n\
         AnonyExchange Team"
    )
}

/// Posts each mail as JSON to an HTTP relay
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    from: String,
    ttl_minutes: i64,
}

impl HttpMailer {
    pub fn new(relay_url: &str, from: &str, ttl_secs: i64) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build mail client: {}", e))?;

        Ok(Self {
            client,
            relay_url: relay_url.to_string(),
            from: from.to_string(),
            ttl_minutes: ttl_secs / 60,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_verification(&self, email: &str, username: &str, code: &str) -> Result<(), String> {
        let mail = RelayMail {
            from: &self.from,
            to: email,
            subject: "Verify Your Account",
            text: verification_text(username, code, self.ttl_minutes),
        };

        let response = self
            .client
            .post(&self.relay_url)
            .json(&mail)
            .send()
            .await
            .map_err(|e| format!("Mail relay request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Mail relay returned {}", response.status()));
        }

        log::info!("📧 Verification email sent to {}", email);
        Ok(())
    }
}

/// Development mailer: the code only goes to the log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, email: &str, username: &str, code: &str) -> Result<(), String> {
        log::warn!(
            "📧 MAIL_RELAY_URL not set - verification code for {} <{}>: {}",
            username,
            email,
            code
        );
        Ok(())
    }
}

// ==================== INBOX HTTP CLIENT ====================
// Thin reqwest client over the session endpoints the watcher needs.

use crate::{
    services::{
        auth_service::{SessionUser, SignInResponse},
        message_service::{MarkAllReadResponse, UnreadResponse},
        settings_service::{ProfileResponse, ToggleNotificationsResponse},
    },
};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, TLS)
    Http(reqwest::Error),
    /// Server answered with a non-success status
    Status { status: u16, message: String },
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "HTTP error: {}", e),
            ClientError::Status { status, message } => write!(f, "Server returned {}: {}", status, message),
            ClientError::Decode(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

pub struct InboxClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl InboxClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    /// Starts a session; the token is kept for later requests.
    pub async fn sign_in(&mut self, identifier: &str, password: &str) -> Result<SessionUser, ClientError> {
        let response = self
            .http
            .post(self.url("/api/sign-in"))
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await?;

        let body: SignInResponse = decode(response).await?;
        self.token = Some(body.token);
        Ok(body.user)
    }

    pub async fn sign_out(&mut self) -> Result<(), ClientError> {
        let result = self.end_session().await;
        self.token = None;
        result
    }

    /// Ends the server session (clears the cookie) without touching the held token.
    /// Used when the client is shared and can no longer be borrowed mutably.
    pub async fn end_session(&self) -> Result<(), ClientError> {
        let response = self.authorized(self.http.post(self.url("/api/sign-out"))).send().await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    pub async fn profile(&self) -> Result<ProfileResponse, ClientError> {
        let response = self.authorized(self.http.get(self.url("/api/profile"))).send().await?;
        decode(response).await
    }

    pub async fn fetch_unread(&self) -> Result<UnreadResponse, ClientError> {
        let response = self
            .authorized(self.http.get(self.url("/api/notifications/unread")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<(), ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/api/notifications/mark-read")))
            .json(&json!({ "notificationId": notification_id }))
            .send()
            .await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    pub async fn mark_all_read(&self) -> Result<u64, ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/api/notifications/mark-all-read")))
            .send()
            .await?;
        let body: MarkAllReadResponse = decode(response).await?;
        Ok(body.updated)
    }

    pub async fn set_notifications(&self, enabled: bool) -> Result<bool, ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/api/profile/toggle-notifications")))
            .json(&json!({ "enabled": enabled }))
            .send()
            .await?;
        let body: ToggleNotificationsResponse = decode(response).await?;
        Ok(body.enabled)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<T>().await.map_err(|e| ClientError::Decode(e.to_string()))
}

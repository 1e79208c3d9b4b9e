use crate::{
    models::{FlagUpdate, Message, User},
    utils::error::AppError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of the atomic reply update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Stored,
    MessageNotFound,
    /// Message already answered and overwrite was not allowed
    AlreadyAnswered,
}

/// Verification fields written together by sign-up, resend and verify.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationUpdate {
    pub password: Option<String>,
    pub verify_code: Option<String>,
    pub verify_code_expiry: Option<DateTime<Utc>>,
    pub is_verified: bool,
}

/// Persistence of user documents and their embedded messages.
///
/// Every mutation touches exactly one user document and is atomic with
/// respect to that document; there is no cross-document coordination.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is already taken.
    async fn insert_user(&self, user: User) -> Result<User, AppError>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Matches the lowercased email or the exact username.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError>;

    async fn update_verification(&self, user_id: &str, update: VerificationUpdate) -> Result<bool, AppError>;

    /// Appends to the end of the owner's message list. Returns false if the user vanished.
    async fn push_message(&self, user_id: &str, message: Message) -> Result<bool, AppError>;

    async fn set_reply(
        &self,
        user_id: &str,
        message_id: &str,
        reply: &str,
        replied_at: DateTime<Utc>,
        allow_overwrite: bool,
    ) -> Result<ReplyOutcome, AppError>;

    /// Removes the message from the owner's list. Returns false if nothing was removed.
    async fn pull_message(&self, user_id: &str, message_id: &str) -> Result<bool, AppError>;

    /// Returns false if no such message exists under the owner.
    async fn mark_read(&self, user_id: &str, message_id: &str) -> Result<bool, AppError>;

    /// Returns how many messages flipped from unread to read.
    async fn mark_all_read(&self, user_id: &str) -> Result<u64, AppError>;

    async fn update_flags(&self, user_id: &str, update: FlagUpdate) -> Result<Option<User>, AppError>;

    /// Sets `notificationsEnabled` and appends the history entry in one update.
    async fn record_notification_toggle(
        &self,
        user_id: &str,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` if another user already owns `username`.
    async fn update_username(&self, user_id: &str, username: &str) -> Result<bool, AppError>;
}

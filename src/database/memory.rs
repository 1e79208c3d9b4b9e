use crate::{
    database::store::{ReplyOutcome, UserStore, VerificationUpdate},
    models::{FlagUpdate, Message, NotificationStatusChange, User},
    utils::error::AppError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process `UserStore` used by tests and `STORAGE_BACKEND=memory`.
///
/// Each mutation holds the write lock for its whole duration, which gives
/// the same single-document atomicity the Mongo update operators provide.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<R>(&self, user_id: &str, f: impl FnOnce(&mut User) -> R) -> Option<R> {
        let mut users = self.users.write().await;
        users.get_mut(user_id).map(f)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;

        let email = user.email.to_lowercase();
        if users
            .values()
            .any(|u| u.username == user.username || u.email == email || u.user_id == user.user_id)
        {
            return Err(AppError::Conflict("Username or email is already taken".to_string()));
        }

        users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let email = identifier.to_lowercase();
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email == email || u.username == identifier)
            .cloned())
    }

    async fn update_verification(&self, user_id: &str, update: VerificationUpdate) -> Result<bool, AppError> {
        let updated = self
            .mutate(user_id, |user| {
                if let Some(password) = update.password {
                    user.password = password;
                }
                user.verify_code = update.verify_code;
                user.verify_code_expiry = update.verify_code_expiry;
                user.is_verified = update.is_verified;
            })
            .await;
        Ok(updated.is_some())
    }

    async fn push_message(&self, user_id: &str, message: Message) -> Result<bool, AppError> {
        Ok(self.mutate(user_id, |user| user.messages.push(message)).await.is_some())
    }

    async fn set_reply(
        &self,
        user_id: &str,
        message_id: &str,
        reply: &str,
        replied_at: DateTime<Utc>,
        allow_overwrite: bool,
    ) -> Result<ReplyOutcome, AppError> {
        let outcome = self
            .mutate(user_id, |user| {
                match user.messages.iter_mut().find(|m| m.id == message_id) {
                    None => ReplyOutcome::MessageNotFound,
                    Some(message) if message.reply.is_some() && !allow_overwrite => {
                        ReplyOutcome::AlreadyAnswered
                    }
                    Some(message) => {
                        message.reply = Some(reply.to_string());
                        message.replied_at = Some(replied_at);
                        ReplyOutcome::Stored
                    }
                }
            })
            .await;
        Ok(outcome.unwrap_or(ReplyOutcome::MessageNotFound))
    }

    async fn pull_message(&self, user_id: &str, message_id: &str) -> Result<bool, AppError> {
        let removed = self
            .mutate(user_id, |user| {
                let before = user.messages.len();
                user.messages.retain(|m| m.id != message_id);
                user.messages.len() < before
            })
            .await;
        Ok(removed.unwrap_or(false))
    }

    async fn mark_read(&self, user_id: &str, message_id: &str) -> Result<bool, AppError> {
        let found = self
            .mutate(user_id, |user| {
                match user.messages.iter_mut().find(|m| m.id == message_id) {
                    Some(message) => {
                        message.is_read = true;
                        true
                    }
                    None => false,
                }
            })
            .await;
        Ok(found.unwrap_or(false))
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, AppError> {
        let flipped = self
            .mutate(user_id, |user| {
                let mut count = 0;
                for message in user.messages.iter_mut().filter(|m| !m.is_read) {
                    message.is_read = true;
                    count += 1;
                }
                count
            })
            .await;
        Ok(flipped.unwrap_or(0))
    }

    async fn update_flags(&self, user_id: &str, update: FlagUpdate) -> Result<Option<User>, AppError> {
        Ok(self
            .mutate(user_id, |user| {
                update.apply(user);
                user.clone()
            })
            .await)
    }

    async fn record_notification_toggle(
        &self,
        user_id: &str,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .mutate(user_id, |user| {
                user.notifications_enabled = enabled;
                user.notification_status_changes
                    .push(NotificationStatusChange { enabled, timestamp: at });
                user.clone()
            })
            .await)
    }

    async fn update_username(&self, user_id: &str, username: &str) -> Result<bool, AppError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == username && u.user_id != user_id) {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        match users.get_mut(user_id) {
            Some(user) => {
                user.username = username.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (MemoryUserStore, User) {
        let store = MemoryUserStore::new();
        let user = store
            .insert_user(User::new("alice", "alice@example.com", "hash".to_string()))
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn rejects_duplicate_username_and_email() {
        let (store, _) = store_with_user().await;

        let same_name = User::new("alice", "other@example.com", "hash".to_string());
        assert!(matches!(store.insert_user(same_name).await, Err(AppError::Conflict(_))));

        let same_email = User::new("alice2", "alice@example.com", "hash".to_string());
        assert!(matches!(store.insert_user(same_email).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn identifier_matches_email_case_insensitively() {
        let (store, user) = store_with_user().await;
        let found = store.find_by_identifier("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(found.user_id, user.user_id);
        assert!(store.find_by_identifier("alice").await.unwrap().is_some());
        assert!(store.find_by_identifier("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reply_respects_overwrite_flag() {
        let (store, user) = store_with_user().await;
        let message = Message::new("question");
        let id = message.id.clone();
        store.push_message(&user.user_id, message).await.unwrap();

        let now = Utc::now();
        assert_eq!(
            store.set_reply(&user.user_id, &id, "first", now, false).await.unwrap(),
            ReplyOutcome::Stored
        );
        assert_eq!(
            store.set_reply(&user.user_id, &id, "second", now, false).await.unwrap(),
            ReplyOutcome::AlreadyAnswered
        );
        assert_eq!(
            store.set_reply(&user.user_id, &id, "second", now, true).await.unwrap(),
            ReplyOutcome::Stored
        );
        assert_eq!(
            store.set_reply(&user.user_id, "missing", "x", now, true).await.unwrap(),
            ReplyOutcome::MessageNotFound
        );

        let stored = store.find_by_id(&user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.messages[0].reply.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn mark_all_read_counts_flipped_messages() {
        let (store, user) = store_with_user().await;
        for text in ["a", "b", "c"] {
            store.push_message(&user.user_id, Message::new(text)).await.unwrap();
        }
        let first = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].id.clone();
        assert!(store.mark_read(&user.user_id, &first).await.unwrap());

        assert_eq!(store.mark_all_read(&user.user_id).await.unwrap(), 2);
        assert_eq!(store.mark_all_read(&user.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn username_update_detects_conflicts() {
        let (store, alice) = store_with_user().await;
        store
            .insert_user(User::new("bob", "bob@example.com", "hash".to_string()))
            .await
            .unwrap();

        assert!(matches!(
            store.update_username(&alice.user_id, "bob").await,
            Err(AppError::Conflict(_))
        ));
        assert!(store.update_username(&alice.user_id, "alice").await.unwrap());
        assert!(store.update_username(&alice.user_id, "alicia").await.unwrap());
        assert!(store.find_by_username("alicia").await.unwrap().is_some());
    }
}

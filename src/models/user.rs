use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Document of the "users" collection. Messages live embedded in their owner.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
    pub _id: Option<ObjectId>,
    pub user_id: String,  // PRIMARY IDENTIFIER - ObjectId hex
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub verify_code: Option<String>,
    #[serde(default)]
    pub verify_code_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_true")]
    pub is_accepting_messages: bool,
    #[serde(default = "default_true")]
    pub show_questions: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub notification_status_changes: Vec<NotificationStatusChange>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// New unverified account with default preferences
    pub fn new(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            _id: None,
            user_id: ObjectId::new().to_hex(),
            username: username.to_string(),
            email: email.to_string(),
            password: password_hash,
            verify_code: None,
            verify_code_expiry: None,
            is_verified: false,
            is_accepting_messages: true,
            show_questions: true,
            notifications_enabled: true,
            notification_status_changes: Vec::new(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn settings(&self) -> UserSettings {
        UserSettings {
            show_questions: self.show_questions,
            is_accepting_messages: self.is_accepting_messages,
        }
    }
}

/// Embedded message. No sender identity is ever stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub replied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    pub fn new(content: &str) -> Self {
        Self {
            id: ObjectId::new().to_hex(),
            content: content.to_string(),
            created_at: Utc::now(),
            reply: None,
            replied_at: None,
            is_read: false,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.reply.is_some()
    }

    /// Unread notification: not acknowledged and not answered yet
    pub fn is_unread(&self) -> bool {
        !self.is_read && self.reply.is_none()
    }

    /// Reply time for answered messages, creation time otherwise.
    pub fn recency(&self) -> DateTime<Utc> {
        match (&self.reply, self.replied_at) {
            (Some(_), Some(at)) => at,
            _ => self.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct NotificationStatusChange {
    pub enabled: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub show_questions: bool,
    pub is_accepting_messages: bool,
}

/// Partial update of the preference flags. `None` leaves the flag untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FlagUpdate {
    pub is_accepting_messages: Option<bool>,
    pub show_questions: Option<bool>,
}

impl FlagUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_accepting_messages.is_none() && self.show_questions.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(accept) = self.is_accepting_messages {
            user.is_accepting_messages = accept;
        }
        if let Some(show) = self.show_questions {
            user.show_questions = show;
        }
    }
}

/// Message as shown on a public profile, annotated with its owner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub username: String,
}

impl PublicMessage {
    pub fn from_message(message: &Message, username: &str) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            created_at: message.created_at,
            reply: message.reply.clone(),
            replied_at: message.replied_at,
            username: username.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_message_is_unanswered_and_unread() {
        let message = Message::new("hi");
        assert!(!message.is_answered());
        assert!(message.is_unread());
        assert!(message.replied_at.is_none());
        assert_eq!(message.recency(), message.created_at);
    }

    #[test]
    fn recency_prefers_reply_time() {
        let mut message = Message::new("hi");
        let later = message.created_at + Duration::minutes(5);
        message.reply = Some("hello".to_string());
        message.replied_at = Some(later);
        assert_eq!(message.recency(), later);
        assert!(!message.is_unread());
    }

    #[test]
    fn user_document_uses_camel_case_fields() {
        let user = User::new("alice", "alice@example.com", "hash".to_string());
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["isAcceptingMessages"], true);
        assert_eq!(value["showQuestions"], true);
        assert_eq!(value["isVerified"], false);
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn flag_update_touches_only_given_flags() {
        let mut user = User::new("alice", "alice@example.com", "hash".to_string());
        let update = FlagUpdate { show_questions: Some(false), ..Default::default() };
        update.apply(&mut user);
        assert!(!user.show_questions);
        assert!(user.is_accepting_messages);
        assert!(FlagUpdate::default().is_empty());
    }
}

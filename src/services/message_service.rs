// ==================== ANONYMOUS MESSAGES ====================
// Messages are embedded in their owner's user document. Every mutation here
// is a single atomic update on that document (see UserStore).

use crate::{
    database::{ReplyOutcome, UserStore},
    models::{ApiMessage, Message, PublicMessage},
    services::auth_service::Claims,
    utils::error::AppError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ==================== REQUEST/RESPONSE MODELS ====================

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendMessageRequest {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageFilter {
    All,
    Answered,
    Unanswered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicMessagesQuery {
    pub username: Option<String>,
    pub filter: Option<MessageFilter>,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicMessagesResponse {
    pub success: bool,
    pub messages: Vec<PublicMessage>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReplyRequest {
    pub reply: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyData {
    pub reply: String,
    pub replied_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReplyResponse {
    pub message: String,
    pub success: bool,
    pub data: ReplyData,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadResponse {
    pub success: bool,
    pub new_messages: Vec<Message>,
    pub unread_count: usize,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub updated: u64,
}

// ==================== ORDERING POLICY ====================

/// Restricts and orders a message list for display.
///
/// `All` puts answered messages before unanswered ones; inside each group
/// messages are ordered by recency (reply time when answered, creation time
/// otherwise), newest first unless `SortOrder::Oldest` is requested.
pub fn apply_view(mut messages: Vec<Message>, filter: MessageFilter, sort: SortOrder) -> Vec<Message> {
    match filter {
        MessageFilter::All => {}
        MessageFilter::Answered => messages.retain(Message::is_answered),
        MessageFilter::Unanswered => messages.retain(|m| !m.is_answered()),
    }

    messages.sort_by(|a, b| {
        let group = b.is_answered().cmp(&a.is_answered());
        let recency = match sort {
            SortOrder::Newest => b.recency().cmp(&a.recency()),
            SortOrder::Oldest => a.recency().cmp(&b.recency()),
        };
        match group {
            Ordering::Equal => recency,
            other => other,
        }
    });

    messages
}

// ==================== SERVICE FUNCTIONS ====================

/// POST /send-message - anonymous; no sender identity is read or stored
pub async fn send_message(store: &dyn UserStore, request: &SendMessageRequest) -> Result<ApiMessage, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Message content is required".to_string()));
    }

    let user = store
        .find_by_username(request.username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !user.is_accepting_messages {
        return Err(AppError::Forbidden("User is not accepting messages".to_string()));
    }

    if !store.push_message(&user.user_id, Message::new(content)).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    log::info!("📨 Message delivered to {}", user.username);
    Ok(ApiMessage::ok("Message sent successfully"))
}

/// GET /get-messages - the caller's own messages, newest first
pub async fn list_own_messages(store: &dyn UserStore, user_id: &str) -> Result<MessagesResponse, AppError> {
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut messages = user.messages;
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(MessagesResponse { success: true, messages })
}

/// GET /public-messages - a profile's questions and replies.
///
/// Without `filter`/`sort` the stored order is returned untouched.
pub async fn public_messages(
    store: &dyn UserStore,
    caller: Option<&Claims>,
    query: &PublicMessagesQuery,
) -> Result<PublicMessagesResponse, AppError> {
    let requested = query.username.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let user = match (requested, caller) {
        (Some(username), _) => store.find_by_username(username).await?,
        (None, Some(claims)) => store.find_by_id(&claims.sub).await?,
        (None, None) => {
            return Err(AppError::BadRequest("Please provide a username or login".to_string()));
        }
    }
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let is_owner = caller.map(|c| c.sub == user.user_id).unwrap_or(false);
    if !is_owner && !user.show_questions {
        return Err(AppError::Forbidden("This user's questions are private".to_string()));
    }

    let messages = if query.filter.is_some() || query.sort.is_some() {
        apply_view(
            user.messages,
            query.filter.unwrap_or(MessageFilter::All),
            query.sort.unwrap_or_default(),
        )
    } else {
        user.messages
    };

    Ok(PublicMessagesResponse {
        success: true,
        messages: messages
            .iter()
            .map(|m| PublicMessage::from_message(m, &user.username))
            .collect(),
    })
}

/// POST /reply-message/{id} - attaches the owner's reply to one message
pub async fn reply_to_message(
    store: &dyn UserStore,
    user_id: &str,
    message_id: &str,
    request: &ReplyRequest,
    allow_overwrite: bool,
) -> Result<ReplyResponse, AppError> {
    let reply = request
        .reply
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest("Reply content is required".to_string()))?;

    let replied_at = Utc::now();

    match store
        .set_reply(user_id, message_id, reply, replied_at, allow_overwrite)
        .await?
    {
        ReplyOutcome::Stored => Ok(ReplyResponse {
            message: "Reply sent successfully".to_string(),
            success: true,
            data: ReplyData {
                reply: reply.to_string(),
                replied_at,
            },
        }),
        ReplyOutcome::MessageNotFound => Err(AppError::NotFound("Message not found".to_string())),
        ReplyOutcome::AlreadyAnswered => {
            Err(AppError::Conflict("Message has already been answered".to_string()))
        }
    }
}

/// DELETE /delete-message/{id} - ownership is enforced by filtering on the caller
pub async fn delete_message(store: &dyn UserStore, user_id: &str, message_id: &str) -> Result<ApiMessage, AppError> {
    if store.pull_message(user_id, message_id).await? {
        Ok(ApiMessage::ok("Message deleted"))
    } else {
        Err(AppError::NotFound("Message not found or already deleted".to_string()))
    }
}

/// GET /notifications/unread - unread and unanswered messages
pub async fn unread_messages(store: &dyn UserStore, user_id: &str) -> Result<UnreadResponse, AppError> {
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let new_messages: Vec<Message> = user.messages.into_iter().filter(Message::is_unread).collect();

    Ok(UnreadResponse {
        success: true,
        unread_count: new_messages.len(),
        new_messages,
    })
}

/// POST /notifications/mark-read - unknown ids are acknowledged without effect
pub async fn mark_read(store: &dyn UserStore, user_id: &str, request: &MarkReadRequest) -> Result<ApiMessage, AppError> {
    let notification_id = request
        .notification_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Notification ID is required".to_string()))?;

    if !store.mark_read(user_id, notification_id).await? {
        log::debug!("Notification {} not found for user {}", notification_id, user_id);
    }

    Ok(ApiMessage::ok("Notification marked as read"))
}

pub async fn mark_all_read(store: &dyn UserStore, user_id: &str) -> Result<MarkAllReadResponse, AppError> {
    let updated = store.mark_all_read(user_id).await?;
    Ok(MarkAllReadResponse { success: true, updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryUserStore;
    use crate::models::{FlagUpdate, User};
    use chrono::Duration;

    async fn setup() -> (MemoryUserStore, User) {
        let store = MemoryUserStore::new();
        let mut user = User::new("alice", "alice@example.com", "hash".to_string());
        user.is_verified = true;
        let user = store.insert_user(user).await.unwrap();
        (store, user)
    }

    fn send(username: &str, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            username: username.to_string(),
            content: content.to_string(),
        }
    }

    fn claims_for(user: &User) -> Claims {
        Claims {
            sub: user.user_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: 0,
            exp: usize::MAX,
            jti: "test".to_string(),
            aud: "test".to_string(),
            iss: "test".to_string(),
        }
    }

    async fn message_count(store: &MemoryUserStore, user_id: &str) -> usize {
        store.find_by_id(user_id).await.unwrap().unwrap().messages.len()
    }

    fn message_at(content: &str, created: DateTime<Utc>, replied: Option<DateTime<Utc>>) -> Message {
        let mut message = Message::new(content);
        message.created_at = created;
        if let Some(at) = replied {
            message.reply = Some(format!("re: {}", content));
            message.replied_at = Some(at);
        }
        message
    }

    #[tokio::test]
    async fn send_appends_one_message() {
        let (store, user) = setup().await;
        send_message(&store, &send("alice", "hi")).await.unwrap();
        assert_eq!(message_count(&store, &user.user_id).await, 1);

        let stored = store.find_by_id(&user.user_id).await.unwrap().unwrap();
        let message = &stored.messages[0];
        assert_eq!(message.content, "hi");
        assert!(message.reply.is_none());
        assert!(message.replied_at.is_none());
        assert!(!message.is_read);
    }

    #[tokio::test]
    async fn send_to_closed_inbox_is_forbidden_and_appends_nothing() {
        let (store, user) = setup().await;
        let update = FlagUpdate { is_accepting_messages: Some(false), ..Default::default() };
        store.update_flags(&user.user_id, update).await.unwrap();

        for _ in 0..3 {
            let result = send_message(&store, &send("alice", "hi")).await;
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }
        assert_eq!(message_count(&store, &user.user_id).await, 0);
    }

    #[tokio::test]
    async fn send_to_unknown_user_or_blank_content_fails() {
        let (store, _) = setup().await;
        assert!(matches!(send_message(&store, &send("nobody", "hi")).await, Err(AppError::NotFound(_))));
        assert!(matches!(send_message(&store, &send("alice", "   ")).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn reply_sets_trimmed_text_and_timestamp_once() {
        let (store, user) = setup().await;
        send_message(&store, &send("alice", "question")).await.unwrap();
        let message = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].clone();

        let request = ReplyRequest { reply: Some("  answer  ".to_string()) };
        let response = reply_to_message(&store, &user.user_id, &message.id, &request, true)
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.data.reply, "answer");

        let stored = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].clone();
        assert_eq!(stored.reply.as_deref(), Some("answer"));
        assert_eq!(stored.replied_at, Some(response.data.replied_at));
        assert!(stored.replied_at.unwrap() >= stored.created_at);
        assert_eq!(stored.created_at, message.created_at);
    }

    #[tokio::test]
    async fn empty_reply_is_rejected_and_message_unchanged() {
        let (store, user) = setup().await;
        send_message(&store, &send("alice", "question")).await.unwrap();
        let id = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].id.clone();

        for reply in [Some(String::new()), Some("   ".to_string()), None] {
            let result = reply_to_message(&store, &user.user_id, &id, &ReplyRequest { reply }, true).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }

        let stored = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].clone();
        assert!(stored.reply.is_none());
        assert!(stored.replied_at.is_none());
    }

    #[tokio::test]
    async fn reply_to_foreign_or_missing_message_is_not_found() {
        let (store, alice) = setup().await;
        let bob = store
            .insert_user(User::new("bob", "bob@example.com", "hash".to_string()))
            .await
            .unwrap();
        send_message(&store, &send("alice", "question")).await.unwrap();
        let id = store.find_by_id(&alice.user_id).await.unwrap().unwrap().messages[0].id.clone();

        let request = ReplyRequest { reply: Some("mine now".to_string()) };
        assert!(matches!(
            reply_to_message(&store, &bob.user_id, &id, &request, true).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            reply_to_message(&store, &alice.user_id, "missing", &request, true).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn overwrite_can_be_disabled() {
        let (store, user) = setup().await;
        send_message(&store, &send("alice", "question")).await.unwrap();
        let id = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].id.clone();

        let first = ReplyRequest { reply: Some("first".to_string()) };
        let second = ReplyRequest { reply: Some("second".to_string()) };
        reply_to_message(&store, &user.user_id, &id, &first, false).await.unwrap();
        assert!(matches!(
            reply_to_message(&store, &user.user_id, &id, &second, false).await,
            Err(AppError::Conflict(_))
        ));
        reply_to_message(&store, &user.user_id, &id, &second, true).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let (store, user) = setup().await;
        send_message(&store, &send("alice", "bye")).await.unwrap();
        let id = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].id.clone();

        assert!(delete_message(&store, &user.user_id, &id).await.unwrap().success);
        assert!(matches!(
            delete_message(&store, &user.user_id, &id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn hidden_profile_is_forbidden_to_everyone_but_the_owner() {
        let (store, alice) = setup().await;
        let bob = store
            .insert_user(User::new("bob", "bob@example.com", "hash".to_string()))
            .await
            .unwrap();
        send_message(&store, &send("alice", "q")).await.unwrap();
        let update = FlagUpdate { show_questions: Some(false), ..Default::default() };
        store.update_flags(&alice.user_id, update).await.unwrap();

        let query = PublicMessagesQuery { username: Some("alice".to_string()), ..Default::default() };
        assert!(matches!(
            public_messages(&store, None, &query).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            public_messages(&store, Some(&claims_for(&bob)), &query).await,
            Err(AppError::Forbidden(_))
        ));

        let own = public_messages(&store, Some(&claims_for(&alice)), &query).await.unwrap();
        assert_eq!(own.messages.len(), 1);
        assert_eq!(own.messages[0].username, "alice");

        let by_session = public_messages(&store, Some(&claims_for(&alice)), &PublicMessagesQuery::default())
            .await
            .unwrap();
        assert_eq!(by_session.messages.len(), 1);
    }

    #[tokio::test]
    async fn public_messages_needs_a_target() {
        let (store, _) = setup().await;
        assert!(matches!(
            public_messages(&store, None, &PublicMessagesQuery::default()).await,
            Err(AppError::BadRequest(_))
        ));
        let query = PublicMessagesQuery { username: Some("ghost".to_string()), ..Default::default() };
        assert!(matches!(public_messages(&store, None, &query).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn all_filter_puts_answered_first_by_recency() {
        let t0 = Utc::now();
        let old_unanswered = message_at("old", t0, None);
        let new_unanswered = message_at("new", t0 + Duration::minutes(10), None);
        let answered_early = message_at("early", t0 + Duration::minutes(1), Some(t0 + Duration::minutes(2)));
        let answered_late = message_at("late", t0, Some(t0 + Duration::minutes(20)));

        let ordered = apply_view(
            vec![old_unanswered, answered_early, new_unanswered, answered_late],
            MessageFilter::All,
            SortOrder::Newest,
        );
        let contents: Vec<&str> = ordered.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["late", "early", "new", "old"]);

        let oldest = apply_view(ordered, MessageFilter::All, SortOrder::Oldest);
        let contents: Vec<&str> = oldest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["early", "late", "old", "new"]);
    }

    #[test]
    fn answered_and_unanswered_filters_restrict_the_set() {
        let t0 = Utc::now();
        let messages = vec![
            message_at("a", t0, None),
            message_at("b", t0, Some(t0 + Duration::minutes(1))),
            message_at("c", t0 + Duration::minutes(2), None),
        ];

        let answered = apply_view(messages.clone(), MessageFilter::Answered, SortOrder::Newest);
        assert_eq!(answered.len(), 1);
        assert_eq!(answered[0].content, "b");

        let unanswered = apply_view(messages, MessageFilter::Unanswered, SortOrder::Newest);
        let contents: Vec<&str> = unanswered.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn reading_all_unread_clears_the_count() {
        let (store, user) = setup().await;
        for text in ["one", "two", "three"] {
            send_message(&store, &send("alice", text)).await.unwrap();
        }

        let unread = unread_messages(&store, &user.user_id).await.unwrap();
        assert_eq!(unread.unread_count, 3);

        for message in &unread.new_messages {
            let request = MarkReadRequest { notification_id: Some(message.id.clone()) };
            mark_read(&store, &user.user_id, &request).await.unwrap();
        }

        assert_eq!(unread_messages(&store, &user.user_id).await.unwrap().unread_count, 0);
    }

    #[tokio::test]
    async fn answered_messages_are_not_unread() {
        let (store, user) = setup().await;
        send_message(&store, &send("alice", "one")).await.unwrap();
        send_message(&store, &send("alice", "two")).await.unwrap();
        let id = store.find_by_id(&user.user_id).await.unwrap().unwrap().messages[0].id.clone();
        let request = ReplyRequest { reply: Some("done".to_string()) };
        reply_to_message(&store, &user.user_id, &id, &request, true).await.unwrap();

        assert_eq!(unread_messages(&store, &user.user_id).await.unwrap().unread_count, 1);
        assert_eq!(mark_all_read(&store, &user.user_id).await.unwrap().updated, 2);
        assert_eq!(unread_messages(&store, &user.user_id).await.unwrap().unread_count, 0);
    }

    #[tokio::test]
    async fn mark_read_requires_an_id() {
        let (store, user) = setup().await;
        let request = MarkReadRequest { notification_id: None };
        assert!(matches!(
            mark_read(&store, &user.user_id, &request).await,
            Err(AppError::BadRequest(_))
        ));
        let unknown = MarkReadRequest { notification_id: Some("nope".to_string()) };
        assert!(mark_read(&store, &user.user_id, &unknown).await.unwrap().success);
    }

    #[tokio::test]
    async fn own_messages_are_newest_first() {
        let (store, user) = setup().await;
        let t0 = Utc::now();
        store.push_message(&user.user_id, message_at("older", t0, None)).await.unwrap();
        store
            .push_message(&user.user_id, message_at("newer", t0 + Duration::minutes(1), None))
            .await
            .unwrap();

        let response = list_own_messages(&store, &user.user_id).await.unwrap();
        assert_eq!(response.messages[0].content, "newer");
        assert_eq!(response.messages[1].content, "older");
    }
}

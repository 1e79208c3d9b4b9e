// ==================== USER PREFERENCES & PROFILE ====================

use crate::{
    database::UserStore,
    models::{ApiMessage, FlagUpdate, User, UserSettings},
    utils::error::AppError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MIN_NEW_USERNAME_LEN: usize = 3;

// ==================== REQUEST/RESPONSE MODELS ====================

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptMessagesResponse {
    pub success: bool,
    pub is_accepting_messages: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptMessagesRequest {
    pub accept_message: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: UserSettings,
}

/// Partial settings body. Non-boolean values are ignored like absent ones.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateRequest {
    #[schema(value_type = Option<bool>)]
    pub show_questions: Option<serde_json::Value>,
    #[schema(value_type = Option<bool>)]
    pub is_accepting_messages: Option<serde_json::Value>,
}

impl SettingsUpdateRequest {
    fn flag_update(&self) -> FlagUpdate {
        FlagUpdate {
            is_accepting_messages: self.is_accepting_messages.as_ref().and_then(|v| v.as_bool()),
            show_questions: self.show_questions.as_ref().and_then(|v| v.as_bool()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityResponse {
    pub show_questions: bool,
    pub username: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ToggleNotificationsRequest {
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ToggleNotificationsResponse {
    pub success: bool,
    pub enabled: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub notifications_enabled: bool,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Message,
    NotificationStatus,
    AccountCreated,
}

/// One entry of the activity feed. Message entries carry the message fields,
/// the others an action and details text.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActivitiesResponse {
    pub success: bool,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameRequest {
    pub new_username: Option<String>,
}

// ==================== HELPERS ====================

async fn load_user(store: &dyn UserStore, user_id: &str) -> Result<User, AppError> {
    store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Builds the feed: messages, notification toggles and account creation, newest first.
pub fn build_activities(user: &User) -> Vec<Activity> {
    let mut activities: Vec<Activity> = user
        .messages
        .iter()
        .map(|m| Activity {
            id: m.id.clone(),
            kind: ActivityKind::Message,
            created_at: m.created_at,
            content: Some(m.content.clone()),
            replied: Some(m.is_answered()),
            reply: m.reply.clone(),
            replied_at: m.replied_at,
            action: None,
            details: None,
        })
        .collect();

    for (index, change) in user.notification_status_changes.iter().enumerate() {
        let (action, details) = if change.enabled {
            ("Notifications enabled", "You will now receive notifications for new messages and replies")
        } else {
            ("Notifications disabled", "Notifications are now turned off")
        };
        activities.push(Activity {
            id: format!("{}-notification-{}", user.user_id, index),
            kind: ActivityKind::NotificationStatus,
            created_at: change.timestamp,
            content: None,
            replied: None,
            reply: None,
            replied_at: None,
            action: Some(action.to_string()),
            details: Some(details.to_string()),
        });
    }

    activities.push(Activity {
        id: user.user_id.clone(),
        kind: ActivityKind::AccountCreated,
        created_at: user.created_at,
        content: None,
        replied: None,
        reply: None,
        replied_at: None,
        action: Some("Account created".to_string()),
        details: Some("Account registered".to_string()),
    });

    activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    activities
}

// ==================== SERVICE FUNCTIONS ====================

pub async fn get_accept_messages(store: &dyn UserStore, user_id: &str) -> Result<AcceptMessagesResponse, AppError> {
    let user = load_user(store, user_id).await?;
    Ok(AcceptMessagesResponse {
        success: true,
        is_accepting_messages: user.is_accepting_messages,
    })
}

/// Sets exactly the accept-messages flag
pub async fn set_accept_messages(
    store: &dyn UserStore,
    user_id: &str,
    request: &AcceptMessagesRequest,
) -> Result<AcceptMessagesResponse, AppError> {
    let update = FlagUpdate {
        is_accepting_messages: Some(request.accept_message),
        ..Default::default()
    };
    let user = store
        .update_flags(user_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    log::info!(
        "📬 {} is {} accepting messages",
        user.username,
        if user.is_accepting_messages { "now" } else { "no longer" }
    );

    Ok(AcceptMessagesResponse {
        success: true,
        is_accepting_messages: user.is_accepting_messages,
    })
}

pub async fn get_settings(store: &dyn UserStore, user_id: &str) -> Result<SettingsResponse, AppError> {
    let user = load_user(store, user_id).await?;
    Ok(SettingsResponse {
        success: true,
        settings: user.settings(),
    })
}

pub async fn update_settings(
    store: &dyn UserStore,
    user_id: &str,
    request: &SettingsUpdateRequest,
) -> Result<SettingsResponse, AppError> {
    let update = request.flag_update();
    if update.is_empty() {
        return Err(AppError::BadRequest("No valid settings to update".to_string()));
    }

    let user = store
        .update_flags(user_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(SettingsResponse {
        success: true,
        settings: user.settings(),
    })
}

pub async fn visibility(store: &dyn UserStore, user_id: &str) -> Result<VisibilityResponse, AppError> {
    let user = load_user(store, user_id).await?;
    Ok(VisibilityResponse {
        show_questions: user.show_questions,
        username: user.username,
    })
}

/// Flips notifications and appends the history entry in the same update
pub async fn toggle_notifications(
    store: &dyn UserStore,
    user_id: &str,
    request: &ToggleNotificationsRequest,
) -> Result<ToggleNotificationsResponse, AppError> {
    let enabled = request
        .enabled
        .ok_or_else(|| AppError::BadRequest("Missing required field: enabled".to_string()))?;

    let user = store
        .record_notification_toggle(user_id, enabled, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ToggleNotificationsResponse {
        success: true,
        enabled: user.notifications_enabled,
        message: format!(
            "Notifications {} successfully",
            if enabled { "enabled" } else { "disabled" }
        ),
    })
}

pub async fn profile(store: &dyn UserStore, user_id: &str) -> Result<ProfileResponse, AppError> {
    let user = load_user(store, user_id).await?;
    Ok(ProfileResponse {
        message_count: user.messages.len(),
        username: user.username,
        email: user.email,
        is_verified: user.is_verified,
        is_accepting_messages: user.is_accepting_messages,
        notifications_enabled: user.notifications_enabled,
        created_at: user.created_at,
    })
}

pub async fn activities(store: &dyn UserStore, user_id: &str) -> Result<ActivitiesResponse, AppError> {
    let user = load_user(store, user_id).await?;
    Ok(ActivitiesResponse {
        success: true,
        activities: build_activities(&user),
    })
}

pub async fn update_username(
    store: &dyn UserStore,
    user_id: &str,
    request: &UpdateUsernameRequest,
) -> Result<ApiMessage, AppError> {
    let new_username = request
        .new_username
        .as_deref()
        .map(str::trim)
        .filter(|u| u.chars().count() >= MIN_NEW_USERNAME_LEN)
        .ok_or_else(|| AppError::BadRequest("Invalid username".to_string()))?;

    if !store.update_username(user_id, new_username).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    log::info!("✏️ User {} renamed to {}", user_id, new_username);
    Ok(ApiMessage::ok("Username updated successfully"))
}

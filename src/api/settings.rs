use crate::{
    database::UserStore,
    models::ApiMessage,
    services::{
        auth_service::Claims,
        settings_service::{
            self, AcceptMessagesRequest, AcceptMessagesResponse, ActivitiesResponse, ProfileResponse,
            SettingsResponse, SettingsUpdateRequest, ToggleNotificationsRequest, ToggleNotificationsResponse,
            UpdateUsernameRequest, VisibilityResponse,
        },
    },
    utils::error::ErrorBody,
};
use actix_web::{web, HttpResponse, ResponseError};

// ==================== PREFERENCE FLAGS ====================

#[utoipa::path(
    get,
    path = "/api/accept-message",
    tag = "Settings",
    responses(
        (status = 200, description = "Current accept-messages flag", body = AcceptMessagesResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_accept_message(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match settings_service::get_accept_messages(store.get_ref(), &user.sub).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/accept-message",
    tag = "Settings",
    request_body = AcceptMessagesRequest,
    responses(
        (status = 200, description = "Flag updated", body = AcceptMessagesResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_accept_message(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    request: web::Json<AcceptMessagesRequest>,
) -> HttpResponse {
    log::info!("📬 POST /accept-message - user: {} -> {}", user.sub, request.accept_message);

    match settings_service::set_accept_messages(store.get_ref(), &user.sub, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Failed to update accept flag: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Visibility and accept flags", body = SettingsResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_settings(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match settings_service::get_settings(store.get_ref(), &user.sub).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = SettingsUpdateRequest,
    responses(
        (status = 200, description = "Settings updated", body = SettingsResponse),
        (status = 400, description = "No valid settings to update", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    request: web::Json<SettingsUpdateRequest>,
) -> HttpResponse {
    log::info!("⚙️ PUT /settings - user: {}", user.sub);

    match settings_service::update_settings(store.get_ref(), &user.sub, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Settings update rejected: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/user-visibility",
    tag = "Settings",
    responses(
        (status = 200, description = "Show-questions flag and username", body = VisibilityResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_visibility(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match settings_service::visibility(store.get_ref(), &user.sub).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

// ==================== PROFILE ====================

#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Account summary", body = ProfileResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match settings_service::profile(store.get_ref(), &user.sub).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/profile/toggle-notifications",
    tag = "Profile",
    request_body = ToggleNotificationsRequest,
    responses(
        (status = 200, description = "Notifications toggled and recorded", body = ToggleNotificationsResponse),
        (status = 400, description = "Missing `enabled`", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_notifications(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    request: web::Json<ToggleNotificationsRequest>,
) -> HttpResponse {
    log::info!("🔔 POST /profile/toggle-notifications - user: {}", user.sub);

    match settings_service::toggle_notifications(store.get_ref(), &user.sub, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Notification toggle failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/profile/activities",
    tag = "Profile",
    responses(
        (status = 200, description = "Activity feed, newest first", body = ActivitiesResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_activities(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match settings_service::activities(store.get_ref(), &user.sub).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/api/profile/update-username",
    tag = "Profile",
    request_body = UpdateUsernameRequest,
    responses(
        (status = 200, description = "Username changed", body = ApiMessage),
        (status = 400, description = "Invalid username", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 409, description = "Username already taken", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_username(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    request: web::Json<UpdateUsernameRequest>,
) -> HttpResponse {
    log::info!("✏️ PATCH /profile/update-username - user: {}", user.sub);

    match settings_service::update_username(store.get_ref(), &user.sub, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Username update failed: {}", e);
            e.error_response()
        }
    }
}

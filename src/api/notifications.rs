use crate::{
    database::UserStore,
    models::ApiMessage,
    services::{
        auth_service::Claims,
        message_service::{self, MarkAllReadResponse, MarkReadRequest, UnreadResponse},
    },
    utils::error::ErrorBody,
};
use actix_web::{web, HttpResponse, ResponseError};

#[utoipa::path(
    get,
    path = "/api/notifications/unread",
    tag = "Notifications",
    responses(
        (status = 200, description = "Unread, unanswered messages", body = UnreadResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unread(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match message_service::unread_messages(store.get_ref(), &user.sub).await {
        Ok(response) => {
            log::debug!("🔔 {} unread for {}", response.unread_count, user.sub);
            HttpResponse::Ok().json(response)
        }
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/mark-read",
    tag = "Notifications",
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Acknowledged", body = ApiMessage),
        (status = 400, description = "Missing notification id", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_read(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    request: web::Json<MarkReadRequest>,
) -> HttpResponse {
    match message_service::mark_read(store.get_ref(), &user.sub, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/mark-all-read",
    tag = "Notifications",
    responses(
        (status = 200, description = "All messages marked read", body = MarkAllReadResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_all_read(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    match message_service::mark_all_read(store.get_ref(), &user.sub).await {
        Ok(response) => {
            log::info!("✅ Marked {} messages read for {}", response.updated, user.sub);
            HttpResponse::Ok().json(response)
        }
        Err(e) => e.error_response(),
    }
}

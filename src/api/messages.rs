use crate::{
    config::AppConfig,
    database::UserStore,
    middleware::auth::claims_from_request,
    models::ApiMessage,
    services::{
        auth_service::Claims,
        message_service::{
            self, MessagesResponse, PublicMessagesQuery, PublicMessagesResponse, ReplyRequest, ReplyResponse,
            SendMessageRequest,
        },
    },
    utils::error::ErrorBody,
};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

/// POST /api/send-message - public, no session is read
#[utoipa::path(
    post,
    path = "/api/send-message",
    tag = "Messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message delivered", body = ApiMessage),
        (status = 400, description = "Empty content", body = ErrorBody),
        (status = 403, description = "Recipient is not accepting messages", body = ErrorBody),
        (status = 404, description = "Unknown recipient", body = ErrorBody)
    )
)]
pub async fn send_message(
    store: web::Data<dyn UserStore>,
    request: web::Json<SendMessageRequest>,
) -> HttpResponse {
    log::info!("📨 POST /send-message - to: {}", request.username);

    match message_service::send_message(store.get_ref(), &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Message to {} rejected: {}", request.username, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/get-messages",
    tag = "Messages",
    responses(
        (status = 200, description = "Own messages, newest first", body = MessagesResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_messages(user: web::ReqData<Claims>, store: web::Data<dyn UserStore>) -> HttpResponse {
    log::info!("📋 GET /get-messages - user: {}", user.sub);

    match message_service::list_own_messages(store.get_ref(), &user.sub).await {
        Ok(response) => {
            log::info!("✅ Listed {} messages", response.messages.len());
            HttpResponse::Ok().json(response)
        }
        Err(e) => e.error_response(),
    }
}

/// GET /api/public-messages - session is optional; it makes the caller the owner
#[utoipa::path(
    get,
    path = "/api/public-messages",
    tag = "Messages",
    params(PublicMessagesQuery),
    responses(
        (status = 200, description = "Profile messages with replies", body = PublicMessagesResponse),
        (status = 400, description = "No username and no session", body = ErrorBody),
        (status = 403, description = "Profile questions are private", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn public_messages(
    req: HttpRequest,
    store: web::Data<dyn UserStore>,
    query: web::Query<PublicMessagesQuery>,
) -> HttpResponse {
    let caller = claims_from_request(&req);

    match message_service::public_messages(store.get_ref(), caller.as_ref(), &query).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Public messages unavailable: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/reply-message/{message_id}",
    tag = "Messages",
    request_body = ReplyRequest,
    params(
        ("message_id" = String, Path, description = "Message identifier")
    ),
    responses(
        (status = 200, description = "Reply stored", body = ReplyResponse),
        (status = 400, description = "Empty reply", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "No such message among the caller's", body = ErrorBody),
        (status = 409, description = "Already answered and overwrite is disabled", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reply_message(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    config: web::Data<AppConfig>,
    message_id: web::Path<String>,
    request: web::Json<ReplyRequest>,
) -> HttpResponse {
    log::info!("💬 POST /reply-message/{} - user: {}", message_id, user.sub);

    match message_service::reply_to_message(
        store.get_ref(),
        &user.sub,
        &message_id,
        &request,
        config.allow_reply_overwrite,
    )
    .await
    {
        Ok(response) => {
            log::info!("✅ Reply stored on {}", message_id);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("⚠️ Reply to {} failed: {}", message_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/delete-message/{message_id}",
    tag = "Messages",
    params(
        ("message_id" = String, Path, description = "Message identifier")
    ),
    responses(
        (status = 200, description = "Message removed", body = ApiMessage),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "Message not found or already deleted", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_message(
    user: web::ReqData<Claims>,
    store: web::Data<dyn UserStore>,
    message_id: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️ DELETE /delete-message/{} - user: {}", message_id, user.sub);

    match message_service::delete_message(store.get_ref(), &user.sub, &message_id).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("⚠️ Delete of {} failed: {}", message_id, e);
            e.error_response()
        }
    }
}

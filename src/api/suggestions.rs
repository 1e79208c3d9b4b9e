use crate::services::suggestion_service::{self, SuggestRequest, SuggestResponse};
use actix_web::{web, HttpResponse};

/// Body is optional; a missing or malformed one means "seed from the clock".
#[utoipa::path(
    post,
    path = "/api/suggest-messages",
    tag = "Messages",
    request_body = SuggestRequest,
    responses(
        (status = 200, description = "Three prompts joined with ||", body = SuggestResponse)
    )
)]
pub async fn suggest_messages(request: Option<web::Json<SuggestRequest>>) -> HttpResponse {
    let request = request.map(web::Json::into_inner).unwrap_or_default();
    let response = suggestion_service::suggest_messages(&request);

    log::debug!("💡 Suggestions generated for seed {}", response.seed);
    HttpResponse::Ok().json(response)
}

use crate::{
    config::AppConfig,
    database::UserStore,
    models::ApiMessage,
    services::{
        auth_service::{self, Claims, MeResponse, ResendCodeRequest, SignInRequest, SignInResponse, SignUpRequest, VerifyCodeRequest},
        mailer::Mailer,
    },
    utils::error::ErrorBody,
};
use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    web, HttpResponse, ResponseError,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdentifierQuery {
    pub identifier: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    pub email: Option<String>,
}

fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), token)
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(config.session_ttl_hours))
        .finish()
}

#[utoipa::path(
    post,
    path = "/api/sign-up",
    tag = "Auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, verification code sent", body = ApiMessage),
        (status = 400, description = "Invalid input or identity already taken", body = ErrorBody),
        (status = 500, description = "Verification mail could not be sent", body = ErrorBody)
    )
)]
pub async fn sign_up(
    store: web::Data<dyn UserStore>,
    mailer: web::Data<dyn Mailer>,
    config: web::Data<AppConfig>,
    request: web::Json<SignUpRequest>,
) -> HttpResponse {
    log::info!("📝 POST /sign-up - username: {}", request.username);

    match auth_service::sign_up(store.get_ref(), mailer.get_ref(), &config, &request).await {
        Ok(response) => {
            log::info!("✅ Sign-up accepted: {}", request.username);
            HttpResponse::Created().json(response)
        }
        Err(e) => {
            log::warn!("❌ Sign-up failed: {} - {}", request.username, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/verify-code",
    tag = "Auth",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Account verified", body = ApiMessage),
        (status = 400, description = "Code expired or incorrect", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn verify_code(
    store: web::Data<dyn UserStore>,
    request: web::Json<VerifyCodeRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /verify-code - username: {}", request.username);

    match auth_service::verify_code(store.get_ref(), &request).await {
        Ok(response) => {
            log::info!("✅ Account verified: {}", request.username);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Verification failed: {} - {}", request.username, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/resend-verify-code",
    tag = "Auth",
    request_body = ResendCodeRequest,
    responses(
        (status = 200, description = "New code sent", body = ApiMessage),
        (status = 400, description = "Account already verified", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 429, description = "Resend requested too soon", body = ErrorBody)
    )
)]
pub async fn resend_verify_code(
    store: web::Data<dyn UserStore>,
    mailer: web::Data<dyn Mailer>,
    config: web::Data<AppConfig>,
    request: web::Json<ResendCodeRequest>,
) -> HttpResponse {
    log::info!("🔁 POST /resend-verify-code - username: {}", request.username);

    match auth_service::resend_verify_code(store.get_ref(), mailer.get_ref(), &config, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Resend failed: {} - {}", request.username, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sign-in",
    tag = "Auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SignInResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Account not verified", body = ErrorBody)
    )
)]
pub async fn sign_in(
    store: web::Data<dyn UserStore>,
    config: web::Data<AppConfig>,
    request: web::Json<SignInRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /sign-in - identifier: {}", request.identifier);

    match auth_service::sign_in(store.get_ref(), &config, &request).await {
        Ok(response) => {
            log::info!("✅ Sign-in successful: {}", response.user.username);
            HttpResponse::Ok()
                .cookie(session_cookie(&config, response.token.clone()))
                .json(response)
        }
        Err(e) => {
            log::warn!("❌ Sign-in failed: {} - {}", request.identifier, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sign-out",
    tag = "Auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiMessage)
    )
)]
pub async fn sign_out(config: web::Data<AppConfig>) -> HttpResponse {
    let mut cookie = session_cookie(&config, String::new());
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiMessage::ok("Signed out"))
}

#[utoipa::path(
    get,
    path = "/api/check-identifier",
    tag = "Auth",
    params(IdentifierQuery),
    responses(
        (status = 200, description = "A user has this email or username", body = ApiMessage),
        (status = 400, description = "Missing identifier", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn check_identifier(store: web::Data<dyn UserStore>, query: web::Query<IdentifierQuery>) -> HttpResponse {
    match auth_service::check_identifier(store.get_ref(), query.identifier.as_deref()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/check-unique-username",
    tag = "Auth",
    params(UsernameQuery),
    responses(
        (status = 200, description = "Username is available", body = ApiMessage),
        (status = 400, description = "Invalid username format", body = ErrorBody),
        (status = 409, description = "Username is taken", body = ErrorBody)
    )
)]
pub async fn check_unique_username(store: web::Data<dyn UserStore>, query: web::Query<UsernameQuery>) -> HttpResponse {
    match auth_service::check_unique_username(store.get_ref(), query.username.as_deref()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/check-unique-email",
    tag = "Auth",
    params(EmailQuery),
    responses(
        (status = 200, description = "Email is unused", body = ApiMessage),
        (status = 400, description = "Missing or already registered email", body = ErrorBody)
    )
)]
pub async fn check_unique_email(store: web::Data<dyn UserStore>, query: web::Query<EmailQuery>) -> HttpResponse {
    match auth_service::check_unique_email(store.get_ref(), query.email.as_deref()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Claims of the current session", body = MeResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /me - user: {}", user.sub);

    HttpResponse::Ok().json(MeResponse {
        success: true,
        user: user.into_inner(),
    })
}

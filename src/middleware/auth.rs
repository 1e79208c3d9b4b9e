use crate::{
    config::AppConfig,
    services::auth_service::{self, Claims},
    utils::error::AppError,
};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

/// Session token from `Authorization: Bearer` or, failing that, the session cookie
pub fn session_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| req.cookie(cookie_name).map(|c| c.value().to_string()))
}

/// Verified claims of the request's session, if any.
///
/// Used directly by endpoints where a session is optional.
pub fn claims_from_request(req: &HttpRequest) -> Option<Claims> {
    let config = req.app_data::<web::Data<AppConfig>>()?;
    let token = session_token(req, &config.cookie_name)?;

    match auth_service::verify_token(config, &token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            log::debug!("🔒 Rejected session token: {}", e);
            None
        }
    }
}

/// Requires a valid session and exposes its `Claims` to handlers via `web::ReqData`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match claims_from_request(req.request()) {
            Some(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            None => {
                log::warn!("🔒 Unauthenticated request to {}", req.path());
                let error = AppError::Unauthorized("Authentication required".to_string());
                let res = req.into_response(error.error_response()).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

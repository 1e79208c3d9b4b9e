pub mod auth;
pub mod health;
pub mod messages;
pub mod metrics;
pub mod notifications;
pub mod settings;
pub mod suggestions;
pub mod swagger;

use crate::{middleware::AuthMiddleware, utils::error::AppError};
use actix_web::web;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid request body: {}", err)).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(format!("Invalid query: {}", err)).into())
}

/// Route table. Expects `AppConfig`, `dyn UserStore` and `dyn Mailer` as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Notifications: polled by the inbox watcher - Requires session
        .service(
            web::scope("/api/notifications")
                .wrap(AuthMiddleware)
                .route("/unread", web::get().to(notifications::unread))
                .route("/mark-read", web::post().to(notifications::mark_read))
                .route("/mark-all-read", web::post().to(notifications::mark_all_read)),
        )
        // Profile - Requires session
        .service(
            web::scope("/api/profile")
                .wrap(AuthMiddleware)
                .route("", web::get().to(settings::get_profile))
                .route("/toggle-notifications", web::post().to(settings::toggle_notifications))
                .route("/activities", web::get().to(settings::get_activities))
                .route("/update-username", web::patch().to(settings::update_username)),
        )
        .service(
            web::scope("/api")
                // ==================== PUBLIC ====================
                .route("/sign-up", web::post().to(auth::sign_up))
                .route("/verify-code", web::post().to(auth::verify_code))
                .route("/resend-verify-code", web::post().to(auth::resend_verify_code))
                .route("/sign-in", web::post().to(auth::sign_in))
                .route("/sign-out", web::post().to(auth::sign_out))
                .route("/check-identifier", web::get().to(auth::check_identifier))
                .route("/check-unique-username", web::get().to(auth::check_unique_username))
                .route("/check-unique-email", web::get().to(auth::check_unique_email))
                .route("/send-message", web::post().to(messages::send_message))
                .route("/public-messages", web::get().to(messages::public_messages))
                .route("/suggest-messages", web::post().to(suggestions::suggest_messages))
                // ==================== SESSION REQUIRED ====================
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::get_me)),
                )
                .service(
                    web::resource("/get-messages")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(messages::get_messages)),
                )
                .service(
                    web::resource("/reply-message/{message_id}")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(messages::reply_message)),
                )
                .service(
                    web::resource("/delete-message/{message_id}")
                        .wrap(AuthMiddleware)
                        .route(web::delete().to(messages::delete_message)),
                )
                .service(
                    web::resource("/accept-message")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(settings::get_accept_message))
                        .route(web::post().to(settings::set_accept_message)),
                )
                .service(
                    web::resource("/settings")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(settings::get_settings))
                        .route(web::put().to(settings::update_settings)),
                )
                .service(
                    web::resource("/user-visibility")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(settings::user_visibility)),
                ),
        );
}

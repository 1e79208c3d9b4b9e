use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AnonyExchange API",
        version = "1.0.0",
        description = "Anonymous questions and answers.\n\n**Authentication:** session endpoints accept a JWT as `Authorization: Bearer <token>` or in the `session-token` cookie set by sign-in."
    ),
    paths(
        // Auth
        crate::api::auth::sign_up,
        crate::api::auth::verify_code,
        crate::api::auth::resend_verify_code,
        crate::api::auth::sign_in,
        crate::api::auth::sign_out,
        crate::api::auth::check_identifier,
        crate::api::auth::check_unique_username,
        crate::api::auth::check_unique_email,
        crate::api::auth::get_me,

        // Messages
        crate::api::messages::send_message,
        crate::api::messages::get_messages,
        crate::api::messages::public_messages,
        crate::api::messages::reply_message,
        crate::api::messages::delete_message,
        crate::api::suggestions::suggest_messages,

        // Notifications
        crate::api::notifications::unread,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,

        // Settings & profile
        crate::api::settings::get_accept_message,
        crate::api::settings::set_accept_message,
        crate::api::settings::get_settings,
        crate::api::settings::update_settings,
        crate::api::settings::user_visibility,
        crate::api::settings::get_profile,
        crate::api::settings::toggle_notifications,
        crate::api::settings::get_activities,
        crate::api::settings::update_username,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            crate::models::ApiMessage,
            crate::models::Message,
            crate::models::PublicMessage,
            crate::models::UserSettings,
            crate::utils::error::ErrorBody,
            crate::services::auth_service::Claims,
            crate::services::auth_service::SessionUser,
            crate::services::message_service::MessageFilter,
            crate::services::message_service::SortOrder,
            crate::services::message_service::ReplyData,
            crate::services::settings_service::Activity,
            crate::services::settings_service::ActivityKind,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-up with emailed verification code, sign-in and identity checks."),
        (name = "Messages", description = "Sending, listing, replying to and deleting anonymous messages."),
        (name = "Notifications", description = "Unread message polling and read acknowledgements."),
        (name = "Settings", description = "Accept-messages and show-questions flags."),
        (name = "Profile", description = "Account summary, activity feed, notification toggle and username changes."),
        (name = "Health", description = "Liveness and Prometheus counters."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token returned by /api/sign-in"))
                        .build(),
                ),
            );
        }
    }
}

use actix_cors::Cors;
use actix_web::{http::header, middleware::{Compress, Logger}, web, App, HttpServer};
use anony_exchange::{
    api,
    config::{AppConfig, StorageBackend},
    database::{MemoryUserStore, MongoDB, MongoUserStore, UserStore},
    middleware::SecurityHeaders,
    services::mailer::{HttpMailer, LogMailer, Mailer},
};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn build_store(config: &AppConfig) -> std::io::Result<Arc<dyn UserStore>> {
    match config.storage {
        StorageBackend::Mongo => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let db = MongoDB::new(url).await.map_err(|e| {
                log::error!("❌ Failed to connect to MongoDB: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;
            log::info!("✅ MongoDB connected successfully");
            Ok(Arc::new(MongoUserStore::new(db)))
        }
        StorageBackend::Memory => {
            log::warn!("🧪 Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

fn build_mailer(config: &AppConfig) -> std::io::Result<Arc<dyn Mailer>> {
    match config.mail_relay_url.as_deref() {
        Some(relay) => {
            let mailer = HttpMailer::new(relay, &config.mail_from, config.verify_code_ttl_secs)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            log::info!("📧 Verification mail via relay {}", relay);
            Ok(Arc::new(mailer))
        }
        None => {
            log::warn!("📧 MAIL_RELAY_URL not set; verification codes are only logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting AnonyExchange...");
    log::info!("🗄️  Storage backend: {:?}", config.storage);
    if config.jwt_secret == AppConfig::default().jwt_secret {
        log::warn!("🔑 JWT_SECRET not set; using the development default");
    }

    let store = web::Data::from(build_store(&config).await?);
    let mailer = web::Data::from(build_mailer(&config)?);
    let bind_address = config.bind_address();
    let config_data = web::Data::new(config);

    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    HttpServer::new(move || {
        let cors = config_data
            .cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(config_data.clone())
            .app_data(store.clone())
            .app_data(mailer.clone())
            .wrap(cors)
            .wrap(SecurityHeaders)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(api::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}

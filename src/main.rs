use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use anyhow::Result;

use ems::database::init_database;
use ems::middleware::RequestId;
use ems::services::LogSink;
use ems::{routes, AppState, Config, Repositories};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "message": "EMS API is running" }))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("🚀 Starting EMS API server...");

    let config = Config::from_env()?;
    log::info!(
        "📋 Configuration loaded (environment: {})",
        config.environment
    );

    let repositories = if config.uses_memory_store() {
        log::warn!("Using in-memory storage; data is lost on restart");
        Repositories::in_memory()
    } else {
        let pool = init_database(&config.database_url).await?;
        log::info!("✅ Database initialized");
        Repositories::postgres(pool)
    };

    let app_state = web::Data::new(AppState::new(
        &config,
        repositories,
        Arc::new(LogSink::new(config.mail_from.clone())),
    ));

    if let Err(error) = app_state.auth_service.seed_fixed_users().await {
        log::error!("✗ Error initializing fixed users: {}", error);
    }

    let config_data = web::Data::new(config.clone());
    let server_address = config.server_address();
    log::info!("🌐 Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(app_state.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&config.client_base_url)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

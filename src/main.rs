use actix_cors::Cors;
use actix_web::{http, web, App, HttpResponse, HttpServer};
use backcolegio::config::AppConfig;
use backcolegio::models::{AppState, ErrorResponse};
use backcolegio::{configure_api, realtime};
use sqlx::postgres::PgPoolOptions;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("could not connect to the database");

    tracing::info!("✅ database pool ready");

    tokio::spawn(realtime::watch_events(pool.clone()));

    let state = AppState { pool, config };

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
                http::header::HeaderName::from_static("x-firebase-uid"),
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let details = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(ErrorResponse {
                        error: "Invalid request body".to_string(),
                        details: Some(details),
                    }),
                )
                .into()
            }))
            .configure(configure_api)
    })
    .bind(bind_addr)?
    .run()
    .await
}

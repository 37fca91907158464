use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod api;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod mail;
pub mod record;
pub mod report;
pub mod source;
pub mod summary;

pub use crate::api::AppState;
pub use crate::config::AppConfig;
pub use crate::dispatch::{Dispatcher, RunOutcome, RunStatus};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::run_report,
        crate::api::handlers::source_headers,
        crate::api::handlers::list_fields,
        crate::api::handlers::health
    ),
    components(
        schemas(
            api::handlers::ReportRunRequest,
            api::handlers::SourceHeadersRequest,
            api::handlers::SourceHeadersResponse,
            api::handlers::HealthResponse,
            catalog::FieldDescriptor,
            catalog::CanonicalField,
            catalog::Language,
            dispatch::RunReport,
            dispatch::RunStatus,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Reports", description = "Report generation endpoints.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost server")
    )
)]
pub struct ApiDoc;

/// Build the HTTP clients, renderer and mailer once and wire them into a
/// dispatcher.
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let gemini = summary::GeminiClient::new(http.clone(), config.gemini.clone());
    let enricher = summary::SummaryEnricher::new(Arc::new(gemini), config.output.language);
    let renderer = report::TypstReportRenderer::new(
        config.template_path.as_deref(),
        config.typst_bin.clone(),
    )?;
    let mailer = mail::GmailTransport::new(http.clone(), config.mail.clone());

    let dispatcher = Dispatcher::new(
        config.output.clone(),
        enricher,
        Arc::new(renderer),
        Arc::new(mailer),
    );
    let sheets = source::SheetsClient::new(http, config.sheets.clone());

    Ok(AppState::new(dispatcher, sheets))
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match build_state(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise report pipeline: {:#}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("auto_report_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let bind = (config.server.host.clone(), config.server.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(api::config)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind)?
    .run()
    .await
}

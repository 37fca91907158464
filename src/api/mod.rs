//! HTTP surface.
//!
//! - `handlers` - route handlers
//! - `multipart_parser` - multipart form decoding
//! - `validation` - request presence checks

pub mod handlers;
pub mod multipart_parser;
pub mod validation;

use actix_web::web;

use crate::dispatch::Dispatcher;
use crate::source::SheetsClient;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub sheets: SheetsClient,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, sheets: SheetsClient) -> Self {
        Self { dispatcher, sheets }
    }
}

/// Register the `/api` routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/reports").route(web::post().to(handlers::run_report)))
            .service(
                web::resource("/sources/headers").route(web::post().to(handlers::source_headers)),
            )
            .service(web::resource("/fields").route(web::get().to(handlers::list_fields)))
            .service(web::resource("/health").route(web::get().to(handlers::health))),
    );
}

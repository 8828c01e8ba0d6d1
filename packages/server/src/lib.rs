#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web front end for the photocard price predictor.
//!
//! Serves a single-page upload form (`GET /`, `POST /predict`) plus a
//! small JSON API (`GET /api/health`, `POST /api/predict`). The predictor
//! — encoder client, regression head and scaler — is loaded once before
//! the server starts and shared read-only across workers.

pub mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use photocard_predict::Predictor;

/// Shared application state.
pub struct AppState {
    /// The process-wide predictor, loaded once at startup.
    pub predictor: Arc<Predictor>,
}

/// Runs the server on the given address with an already-loaded predictor.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot be bound.
pub async fn run(bind_addr: &str, port: u16, predictor: Arc<Predictor>) -> std::io::Result<()> {
    let state = web::Data::new(AppState { predictor });

    log::info!("Starting predictor server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/", web::get().to(handlers::index))
            .route("/predict", web::post().to(handlers::predict_form))
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/predict", web::post().to(handlers::predict)),
            )
    })
    .bind((bind_addr.to_owned(), port))?
    .run()
    .await
}

/// Loads the predictor from its default artifact locations and runs the
/// server on `BIND_ADDR`/`PORT`.
///
/// # Errors
///
/// Returns an I/O error if a model artifact cannot be loaded or the
/// listener cannot be bound.
pub async fn run_from_env() -> std::io::Result<()> {
    log::info!("Loading model artifacts...");
    let predictor = Predictor::load_default().map_err(std::io::Error::other)?;

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    run(&bind_addr, port, Arc::new(predictor)).await
}

//! Route table for the clinic API.

use actix_web::web;

use super::error::ApiError;
use super::handlers;

/// Register API routes and payload configuration.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Malformed JSON bodies come back in the same error shape as every
    // other failure.
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::InvalidArgument(err.to_string()).into()
    }))
    .service(
        web::scope("/api")
            .route("/patient/new", web::post().to(handlers::create_patient))
            .route("/patients/by-phone", web::get().to(handlers::search_by_phone))
            .route("/patient/{id}/prescribe", web::post().to(handlers::prescribe))
            .route(
                "/patient/{id}/prescriptions",
                web::get().to(handlers::list_prescriptions),
            )
            .route(
                "/patient/{id}/prescription/{pid}",
                web::get().to(handlers::prescription_detail),
            )
            .route(
                "/patient/{id}/prescription/{pid}/generate-pdf",
                web::post().to(handlers::generate_pdf),
            ),
    );
}

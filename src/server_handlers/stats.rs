use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::analytics::aggregate;
use crate::server::AppState;
use crate::server_handlers::store_error_response;
use crate::store::with_store;

/// GET /api/patches/stats
pub async fn stats_handler(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state.store, state.config.store_timeout, |s| s.find_all()).await {
        Ok(patches) => HttpResponse::Ok().json(aggregate(&patches)),
        Err(e) => store_error_response("Erreur lors du calcul des statistiques", &e),
    }
}

/// GET /health
pub async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state.store, state.config.store_timeout, |s| s.count()).await {
        Ok(n) => HttpResponse::Ok().json(json!({"status": "ok", "documentCount": n})),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({"status": "error", "error": e.to_string()}))
        }
    }
}

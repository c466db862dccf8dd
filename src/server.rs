use actix_cors::Cors;
use actix_web::{error, web, App, HttpResponse, HttpServer};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::import::ImportOptions;
use crate::server_handlers::*;
use crate::store::{open_store, PatchStore};

/// Estado compartido entre workers.
pub struct AppState {
    pub store: Arc<dyn PatchStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn PatchStore>, config: Config) -> Self {
        AppState { store, config }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions { store_timeout: self.config.store_timeout }
    }
}

/// Configura el límite y el error del extractor JSON.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default().limit(limit).error_handler(|err, _req| {
        tracing::warn!("rejected json body: {}", err);
        let resp = HttpResponse::BadRequest().json(json!({"success": false, "error": "Format de données invalide"}));
        error::InternalError::from_response(err, resp).into()
    })
}

/// Rutas del servicio. `/{id}` va al final para no tapar las rutas fijas.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_handler)).service(
        web::scope("/api/patches")
            .route("", web::get().to(list_patches_handler))
            .route("/import", web::post().to(import_json_handler))
            .route("/import/file", web::post().to(import_file_handler))
            .route("/stats", web::get().to(stats_handler))
            .route("/search", web::get().to(search_patches_handler))
            .route("/export", web::get().to(export_patches_handler))
            .route("/cleanup", web::delete().to(cleanup_handler))
            .route("/all", web::delete().to(delete_all_handler))
            .route("/ref/{numero}", web::get().to(patch_by_numero_handler))
            .route("/{id}", web::get().to(patch_by_id_handler))
            .route("/{id}", web::delete().to(delete_patch_handler)),
    );
}

/// Abre el store y arranca el servidor HTTP.
pub async fn run_server(config: Config) -> std::io::Result<()> {
    let store = open_store(&config.db_url).map_err(|e| std::io::Error::other(e.to_string()))?;
    let count = store.count().map_err(|e| std::io::Error::other(e.to_string()))?;
    tracing::info!(db = %config.db_url, patches = count, "store ready");

    let bind = config.bind.clone();
    let json_limit = config.max_upload_bytes;
    let state = web::Data::new(AppState::new(store, config));

    tracing::info!("listening on http://{}", bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .app_data(json_config(json_limit))
            .configure(configure)
    })
    .bind(bind.as_str())?
    .run()
    .await
}

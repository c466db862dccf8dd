//! Handlers HTTP bajo `/api/patches`.

pub mod import;
pub mod patches;
pub mod stats;

pub use import::*;
pub use patches::*;
pub use stats::*;

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;

use crate::error::{ImportError, StoreError};

/// Semáforo global para el trabajo de CPU (lectura de libros, exportación).
fn cpu_semaphore() -> Arc<Semaphore> {
    static GLOBAL_SEM: OnceLock<Arc<Semaphore>> = OnceLock::new();
    GLOBAL_SEM
        .get_or_init(|| Arc::new(Semaphore::new(std::cmp::max(1, num_cpus::get()))))
        .clone()
}

/// Ejecuta `f` en el pool bloqueante, como mucho una tarea por CPU a la vez.
pub(crate) async fn run_cpu_bound<T, F>(f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let permit = cpu_semaphore()
        .acquire_owned()
        .await
        .map_err(|_| "failed to acquire semaphore".to_string())?;
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        f()
    })
    .await
    .map_err(|e| format!("task join error: {}", e))
}

/// Serializa `payload` y le añade `success: true` y, si hay, `message`.
pub(crate) fn success_body<T: Serialize>(payload: &T, message: Option<String>) -> serde_json::Value {
    let mut body = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
    if let Some(obj) = body.as_object_mut() {
        obj.insert("success".into(), json!(true));
        if let Some(m) = message {
            obj.insert("message".into(), json!(m));
        }
    }
    body
}

/// 400 para errores de entrada, 500 para persistencia.
pub(crate) fn import_error_response(err: &ImportError) -> HttpResponse {
    let body = json!({"success": false, "error": err.to_string()});
    if err.is_client_error() {
        tracing::warn!("import rejected: {}", err);
        HttpResponse::BadRequest().json(body)
    } else {
        tracing::error!("import failed: {}", err);
        HttpResponse::InternalServerError().json(body)
    }
}

pub(crate) fn store_error_response(message: &str, err: &StoreError) -> HttpResponse {
    tracing::error!("{}: {}", message, err);
    HttpResponse::InternalServerError().json(json!({"success": false, "message": message, "error": err.to_string()}))
}

use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::analytics::SearchQuery;
use crate::excel::{export_filename, export_xlsx};
use crate::server::AppState;
use crate::server_handlers::{run_cpu_bound, store_error_response};
use crate::store::{with_store, PatchFilter};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// GET /api/patches
/// Todos los lotes, los importados más recientemente primero.
pub async fn list_patches_handler(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state.store, state.config.store_timeout, |s| s.find_all()).await {
        Ok(patches) => HttpResponse::Ok().json(json!({"total": patches.len(), "patches": patches})),
        Err(e) => store_error_response("Erreur de récupération des patches", &e),
    }
}

/// GET /api/patches/search?term=&techno=&module=&destinataire=
pub async fn search_patches_handler(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let query = query.into_inner();
    match with_store(&state.store, state.config.store_timeout, |s| s.find_all()).await {
        Ok(all) => {
            let patches = query.filter(all);
            HttpResponse::Ok().json(json!({"total": patches.len(), "patches": patches}))
        }
        Err(e) => store_error_response("Erreur lors de la recherche", &e),
    }
}

/// GET /api/patches/export
/// Mismos filtros que la búsqueda; devuelve un .xlsx con una fila por correctif.
pub async fn export_patches_handler(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let query = query.into_inner();
    let all = match with_store(&state.store, state.config.store_timeout, |s| s.find_all()).await {
        Ok(all) => all,
        Err(e) => return store_error_response("Erreur lors de l'export", &e),
    };
    let patches = query.filter(all);
    let n = patches.len();

    let bytes = match run_cpu_bound(move || export_xlsx(&patches)).await {
        Ok(Ok(b)) => b,
        Ok(Err(e)) => {
            tracing::error!("xlsx export failed: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"success": false, "message": "Erreur lors de l'export", "error": e.to_string()}));
        }
        Err(msg) => return HttpResponse::InternalServerError().json(json!({"success": false, "error": msg})),
    };

    let filename = export_filename(chrono::Local::now().date_naive());
    tracing::info!(patches = n, file = %filename, "📤 export generated");
    HttpResponse::Ok()
        .content_type(XLSX_MIME)
        .insert_header((header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)))
        .body(bytes)
}

/// GET /api/patches/ref/{numero}
pub async fn patch_by_numero_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let numero = path.into_inner();
    match with_store(&state.store, state.config.store_timeout, move |s| s.find_by_numero(&numero)).await {
        Ok(Some(patch)) => HttpResponse::Ok().json(json!({"success": true, "patch": patch})),
        Ok(None) => HttpResponse::NotFound().json(json!({"success": false, "message": "Patch non trouvé par numéro"})),
        Err(e) => store_error_response("Erreur serveur", &e),
    }
}

/// GET /api/patches/{id}
pub async fn patch_by_id_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let raw = path.into_inner();
    let id = match raw.parse::<i64>() {
        Ok(id) => id,
        Err(_) => return HttpResponse::NotFound().json(json!({"message": format!("Patch \"{}\" introuvable", raw)})),
    };
    match with_store(&state.store, state.config.store_timeout, move |s| s.find_by_id(id)).await {
        Ok(Some(patch)) => HttpResponse::Ok().json(patch),
        Ok(None) => HttpResponse::NotFound().json(json!({"message": format!("Patch \"{}\" introuvable", raw)})),
        Err(e) => store_error_response("Erreur de récupération du patch", &e),
    }
}

/// DELETE /api/patches/{id}
pub async fn delete_patch_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = match path.into_inner().parse::<i64>() {
        Ok(id) => id,
        Err(_) => return HttpResponse::NotFound().json(json!({"message": "Patch introuvable"})),
    };
    match with_store(&state.store, state.config.store_timeout, move |s| s.delete_by_id(id)).await {
        Ok(true) => {
            tracing::info!(id, "🗑️ patch deleted");
            HttpResponse::Ok().json(json!({"message": "Patch supprimé avec succès"}))
        }
        Ok(false) => HttpResponse::NotFound().json(json!({"message": "Patch introuvable"})),
        Err(e) => store_error_response("Erreur de suppression", &e),
    }
}

/// DELETE /api/patches/all
pub async fn delete_all_handler(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state.store, state.config.store_timeout, |s| s.delete_many(PatchFilter::All)).await {
        Ok(n) => {
            tracing::warn!(deleted = n, "all patches deleted");
            HttpResponse::Ok().json(json!({"message": "Tous les correctifs ont été supprimés", "deletedCount": n}))
        }
        Err(e) => store_error_response("Erreur lors de la suppression", &e),
    }
}

/// DELETE /api/patches/cleanup
/// Borra los ecos del encabezado y los lotes con fecha guardada como número.
pub async fn cleanup_handler(state: web::Data<AppState>) -> impl Responder {
    match with_store(&state.store, state.config.store_timeout, |s| s.delete_many(PatchFilter::Garbage)).await {
        Ok(n) => {
            tracing::info!(deleted = n, "🧹 cleanup done");
            HttpResponse::Ok().json(json!({
                "success": true,
                "deleted": n,
                "message": format!("{} documents incorrects supprimés", n)
            }))
        }
        Err(e) => store_error_response("Erreur lors du nettoyage", &e),
    }
}

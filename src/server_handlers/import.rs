use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use futures_util::stream::StreamExt;
use serde_json::json;

use crate::excel::read_workbook;
use crate::import::{import_json_body, import_parsed, parse_table};
use crate::server::AppState;
use crate::server_handlers::{import_error_response, run_cpu_bound, success_body};

/// POST /api/patches/import
/// Cuerpo `{ "patches": [...] }` con lotes ya agrupados.
pub async fn import_json_handler(state: web::Data<AppState>, body: web::Json<serde_json::Value>) -> impl Responder {
    let body_value = body.into_inner();
    match import_json_body(&state.store, &body_value, &state.import_options()).await {
        Ok(report) => {
            let message = report.message();
            HttpResponse::Ok().json(success_body(&report, Some(message)))
        }
        Err(e) => import_error_response(&e),
    }
}

/// Lee el primer campo con fichero del multipart. Los demás campos se descartan.
async fn read_first_file(payload: &mut Multipart, limit: usize) -> Result<Option<(String, Vec<u8>)>, String> {
    while let Some(field_res) = payload.next().await {
        let mut field = field_res.map_err(|e| format!("multipart field error: {}", e))?;
        let filename = field.content_disposition().get_filename().map(|s| s.to_string());

        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| format!("upload stream error: {}", e))?;
            if filename.is_some() {
                if data.len() + bytes.len() > limit {
                    return Err(format!("Fichier trop volumineux (max {} octets)", limit));
                }
                data.extend_from_slice(&bytes);
            }
        }

        if let Some(name) = filename {
            return Ok(Some((name, data)));
        }
    }
    Ok(None)
}

/// POST /api/patches/import/file
/// Sube un .xlsx/.xls/.ods y ejecuta el flujo completo en el servidor.
pub async fn import_file_handler(state: web::Data<AppState>, mut payload: Multipart) -> impl Responder {
    let (filename, bytes) = match read_first_file(&mut payload, state.config.max_upload_bytes).await {
        Ok(Some(f)) => f,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"success": false, "error": "Aucun fichier reçu"})),
        Err(msg) => return HttpResponse::BadRequest().json(json!({"success": false, "error": msg})),
    };
    tracing::info!(file = %filename, size = bytes.len(), "📥 workbook received");

    let parsed = match run_cpu_bound(move || read_workbook(&bytes).and_then(|table| parse_table(&table))).await {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => return import_error_response(&e),
        Err(msg) => return HttpResponse::InternalServerError().json(json!({"success": false, "error": msg})),
    };

    match import_parsed(&state.store, parsed, &state.import_options()).await {
        Ok(outcome) => {
            let message = outcome.report.message();
            HttpResponse::Ok().json(success_body(&outcome, Some(message)))
        }
        Err(e) => import_error_response(&e),
    }
}

//! Almacenamiento de patches.
//!
//! `PatchStore` es síncrono (rusqlite lo es); desde los handlers se llama a
//! través de `with_store`, que lo ejecuta en el pool bloqueante de tokio con
//! un límite de tiempo.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{PatchBatch, StoredPatch};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Texto de encabezado que aparece como fecha cuando se importó la fila de títulos.
pub const HEADER_ECHO_DATE: &str = "Date du patch cumulatif";
/// Idem para el número de patch.
pub const HEADER_ECHO_NUMERO: &str = "Numéro de patch cumulatif";

/// Predicado de borrado masivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFilter {
    All,
    /// Documentos basura: ecos del encabezado o fecha guardada con tipo no textual.
    Garbage,
}

/// Operaciones de almacenamiento tipo "colección de documentos".
pub trait PatchStore: Send + Sync {
    /// Comprueba que el almacenamiento responde.
    fn ping(&self) -> Result<(), StoreError>;

    fn find_by_key(&self, date: &str, numero: &str) -> Result<Option<StoredPatch>, StoreError>;

    /// Inserta un lote nuevo. Si la clave natural ya existe devuelve
    /// `StoreError::Duplicate` sin tocar el existente.
    fn insert(&self, batch: &PatchBatch) -> Result<i64, StoreError>;

    /// Todos los lotes, los importados más recientemente primero.
    fn find_all(&self) -> Result<Vec<StoredPatch>, StoreError>;

    fn find_by_id(&self, id: i64) -> Result<Option<StoredPatch>, StoreError>;

    fn find_by_numero(&self, numero: &str) -> Result<Option<StoredPatch>, StoreError>;

    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError>;

    fn delete_many(&self, filter: PatchFilter) -> Result<usize, StoreError>;

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.find_all()?.len())
    }
}

/// true si el lote es un eco del encabezado de la hoja.
pub fn is_header_echo(batch: &PatchBatch) -> bool {
    batch.date_patch_cumulatif == HEADER_ECHO_DATE || batch.numero_patch_cumulatif == HEADER_ECHO_NUMERO
}

/// Ejecuta `op` sobre el store en el pool bloqueante, con límite de tiempo.
pub async fn with_store<T, F>(store: &Arc<dyn PatchStore>, limit: Duration, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn PatchStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    let handle = tokio::task::spawn_blocking(move || op(store.as_ref()));
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(res)) => res,
        Ok(Err(join_err)) => Err(StoreError::Task(join_err.to_string())),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

/// Abre el store indicado por la URL: `sqlite://ruta`, `file://ruta`,
/// `memory://` o una ruta simple a un fichero SQLite.
pub fn open_store(url: &str) -> Result<Arc<dyn PatchStore>, StoreError> {
    let url = url.trim();
    if url.starts_with("memory://") {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        PathBuf::from(rest)
    } else if let Some(rest) = url.strip_prefix("file://") {
        PathBuf::from(rest)
    } else if url.contains("://") {
        return Err(StoreError::UnsupportedUrl(url.to_string()));
    } else {
        PathBuf::from(url)
    };
    Ok(Arc::new(SqliteStore::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = open_store("postgres://localhost/ikos").err().expect("must fail");
        assert!(matches!(err, StoreError::UnsupportedUrl(_)));
    }

    #[test]
    fn memory_url_opens_empty_store() {
        let store = open_store("memory://").unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn with_store_runs_on_blocking_pool() {
        let store = open_store("memory://").unwrap();
        let n = with_store(&store, Duration::from_secs(2), |s| s.count()).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn with_store_times_out() {
        let store = open_store("memory://").unwrap();
        let res = with_store(&store, Duration::from_millis(10), |_s| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn header_echo_detection() {
        assert!(is_header_echo(&PatchBatch::new(HEADER_ECHO_DATE, "1")));
        assert!(is_header_echo(&PatchBatch::new("01/01/2024", HEADER_ECHO_NUMERO)));
        assert!(!is_header_echo(&PatchBatch::new("01/01/2024", "1")));
    }
}

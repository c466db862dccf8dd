//! Tipos de error del servicio de patches.

use std::time::Duration;
use thiserror::Error;

/// Errores del almacenamiento de patches.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// El par (date, numero) ya existe en el almacenamiento.
    #[error("duplicate natural key ({date}, {numero})")]
    Duplicate { date: String, numero: String },

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store task failed: {0}")]
    Task(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errores fatales de una importación completa.
///
/// Los problemas de un lote individual (clave vacía, error de escritura,
/// duplicado) no llegan aquí: se cuentan en el `ImportReport`.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Format de fichier non reconnu - en-tête introuvable")]
    HeaderNotFound,

    #[error("Format de données invalide")]
    InvalidFormat,

    #[error("Aucun correctif valide trouvé dans le fichier")]
    NoCorrectifs,

    #[error("Impossible de lire le classeur: {0}")]
    Workbook(String),

    #[error("Erreur de persistance: {0}")]
    Persistence(#[from] StoreError),
}

impl ImportError {
    /// true cuando el error es culpa de la entrada del cliente (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ImportError::Persistence(_))
    }
}

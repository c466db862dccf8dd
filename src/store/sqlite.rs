use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::{BatchStats, CellValue, Correctif, PatchBatch, StoredPatch};
use crate::store::{PatchFilter, PatchStore, HEADER_ECHO_DATE, HEADER_ECHO_NUMERO};

// La columna de fecha no declara tipo: así una fila heredada con fecha
// numérica conserva su tipo y la limpieza la puede detectar con typeof().
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS patches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date_patch_cumulatif NOT NULL,
        numero_patch_cumulatif TEXT NOT NULL,
        correctifs_json TEXT NOT NULL,
        stats_json TEXT,
        imported_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_patches_natural_key
        ON patches (date_patch_cumulatif, numero_patch_cumulatif);
";

const SELECT_COLUMNS: &str =
    "SELECT id, date_patch_cumulatif, numero_patch_cumulatif, correctifs_json, stats_json, imported_at FROM patches";

/// Store SQLite. Una única conexión protegida por un Mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Fila tal como sale de SQLite, antes de decodificar el JSON.
struct RawRow {
    id: i64,
    date: Value,
    numero: String,
    correctifs_json: String,
    stats_json: Option<String>,
    imported_at: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRow {
            id: row.get(0)?,
            date: row.get(1)?,
            numero: row.get(2)?,
            correctifs_json: row.get(3)?,
            stats_json: row.get(4)?,
            imported_at: row.get(5)?,
        })
    }

    fn into_stored(self) -> Result<StoredPatch, StoreError> {
        let correctifs: Vec<Correctif> = serde_json::from_str(&self.correctifs_json)?;
        let stats: Option<BatchStats> = match self.stats_json {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        };
        let imported_at = DateTime::parse_from_rfc3339(&self.imported_at)
            .ok()
            .map(|d| d.with_timezone(&Utc));
        Ok(StoredPatch {
            id: self.id,
            batch: PatchBatch {
                date_patch_cumulatif: value_to_string(&self.date),
                numero_patch_cumulatif: self.numero,
                correctifs,
                imported_at,
                stats,
            },
        })
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::Text(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => CellValue::Number(*f).as_text(),
        Value::Null => String::new(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

impl SqliteStore {
    /// Abre (o crea) la base en `path`, creando el directorio si hace falta.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_many(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<StoredPatch>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows_iter = stmt.query_map(args, RawRow::from_row)?;
        let mut out = Vec::new();
        for r in rows_iter {
            out.push(r?.into_stored()?);
        }
        Ok(out)
    }

    fn query_one(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Option<StoredPatch>, StoreError> {
        let conn = self.lock()?;
        let raw = conn.query_row(sql, args, RawRow::from_row).optional()?;
        raw.map(RawRow::into_stored).transpose()
    }
}

impl PatchStore for SqliteStore {
    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn find_by_key(&self, date: &str, numero: &str) -> Result<Option<StoredPatch>, StoreError> {
        let sql = format!("{} WHERE date_patch_cumulatif = ?1 AND numero_patch_cumulatif = ?2 LIMIT 1", SELECT_COLUMNS);
        self.query_one(&sql, &[&date, &numero])
    }

    fn insert(&self, batch: &PatchBatch) -> Result<i64, StoreError> {
        let correctifs_json = serde_json::to_string(&batch.correctifs)?;
        let stats_json = match &batch.stats {
            Some(s) => Some(serde_json::to_string(s)?),
            None => None,
        };
        let imported_at = batch.imported_at.unwrap_or_else(Utc::now).to_rfc3339();

        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO patches (date_patch_cumulatif, numero_patch_cumulatif, correctifs_json, stats_json, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                batch.date_patch_cumulatif,
                batch.numero_patch_cumulatif,
                correctifs_json,
                stats_json,
                imported_at,
            ],
        );
        match res {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Duplicate {
                    date: batch.date_patch_cumulatif.clone(),
                    numero: batch.numero_patch_cumulatif.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_all(&self) -> Result<Vec<StoredPatch>, StoreError> {
        let sql = format!("{} ORDER BY imported_at DESC, id DESC", SELECT_COLUMNS);
        self.query_many(&sql, &[])
    }

    fn find_by_id(&self, id: i64) -> Result<Option<StoredPatch>, StoreError> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        self.query_one(&sql, &[&id])
    }

    fn find_by_numero(&self, numero: &str) -> Result<Option<StoredPatch>, StoreError> {
        let sql = format!("{} WHERE numero_patch_cumulatif = ?1 ORDER BY id LIMIT 1", SELECT_COLUMNS);
        self.query_one(&sql, &[&numero])
    }

    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM patches WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    fn delete_many(&self, filter: PatchFilter) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n = match filter {
            PatchFilter::All => conn.execute("DELETE FROM patches", [])?,
            PatchFilter::Garbage => conn.execute(
                "DELETE FROM patches
                 WHERE date_patch_cumulatif = ?1
                    OR numero_patch_cumulatif = ?2
                    OR typeof(date_patch_cumulatif) <> 'text'",
                params![HEADER_ECHO_DATE, HEADER_ECHO_NUMERO],
            )?,
        };
        Ok(n)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM patches", [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{ImportError, StoreError};
use crate::models::{BatchStats, PatchBatch, PatchBatchInput};
use crate::store::{with_store, PatchStore};

/// Opciones de persistencia de una importación.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Límite por cada llamada al store (búsqueda o inserción).
    pub store_timeout: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions { store_timeout: Duration::from_secs(5) }
    }
}

/// Contadores de una importación. Un lote cae en exactamente uno de
/// `imported`, `duplicates`, `skipped` o `failed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
}

impl ImportReport {
    /// Resumen legible para el front.
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Import terminé: {} patches importés, {} doublons ignorés, {} ignorés (format invalide)",
            self.imported, self.duplicates, self.skipped
        );
        if self.failed > 0 {
            msg.push_str(&format!(", {} en erreur", self.failed));
        }
        msg
    }
}

/// Persiste los lotes uno a uno, sin duplicar claves naturales.
///
/// La primera operación es un ping al store: si falla, la importación entera
/// falla. A partir de ahí un error o timeout en un lote se registra y se pasa
/// al siguiente.
pub async fn import_batches(
    store: &Arc<dyn PatchStore>,
    batches: Vec<PatchBatch>,
    opts: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    with_store(store, opts.store_timeout, |s| s.ping()).await?;

    info!("🚀 importing {} patch batches", batches.len());
    let mut report = ImportReport::default();

    for mut batch in batches {
        if !batch.has_natural_key() {
            warn!(
                date = %batch.date_patch_cumulatif,
                numero = %batch.numero_patch_cumulatif,
                correctifs = batch.correctifs.len(),
                "batch without natural key skipped"
            );
            report.skipped += 1;
            report.warnings.push(format!(
                "Patch cumulatif ignoré: date ou numéro manquant ({} correctifs)",
                batch.correctifs.len()
            ));
            continue;
        }

        let date = batch.date_patch_cumulatif.clone();
        let numero = batch.numero_patch_cumulatif.clone();

        let lookup = {
            let (d, n) = (date.clone(), numero.clone());
            with_store(store, opts.store_timeout, move |s| s.find_by_key(&d, &n)).await
        };
        match lookup {
            Ok(Some(_)) => {
                info!(%date, %numero, "🔄 existing patch, skipped as duplicate");
                report.duplicates += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                error!(%date, %numero, "lookup failed: {}", e);
                report.failed += 1;
                report.warnings.push(format!("Patch {} du {}: erreur de lecture ({})", numero, date, e));
                continue;
            }
        }

        batch.stats = Some(BatchStats::from_correctifs(&batch.correctifs));
        batch.imported_at = Some(Utc::now());
        let n_correctifs = batch.correctifs.len();

        match with_store(store, opts.store_timeout, move |s| s.insert(&batch)).await {
            Ok(id) => {
                info!(%date, %numero, id, correctifs = n_correctifs, "💾 patch inserted");
                report.imported += 1;
            }
            // otra importación ganó la carrera: el índice único lo detecta
            Err(StoreError::Duplicate { .. }) => {
                info!(%date, %numero, "🔄 duplicate detected on insert");
                report.duplicates += 1;
            }
            // la tarea bloqueante sigue viva tras el timeout: la escritura puede llegar igual
            Err(StoreError::Timeout(limit)) => {
                let (d, n) = (date.clone(), numero.clone());
                match with_store(store, opts.store_timeout, move |s| s.find_by_key(&d, &n)).await {
                    Ok(Some(stored)) => {
                        warn!(%date, %numero, id = stored.id, "insert timed out but was committed");
                        report.imported += 1;
                    }
                    other => {
                        error!(%date, %numero, "insert timed out after {:?}, outcome unknown", limit);
                        if let Err(e) = other {
                            error!(%date, %numero, "re-check failed: {}", e);
                        }
                        report.failed += 1;
                        report.warnings.push(format!(
                            "Patch {} du {}: délai dépassé, résultat incertain (vérifier avant de réimporter)",
                            numero, date
                        ));
                    }
                }
            }
            Err(e) => {
                error!(%date, %numero, "insert failed: {}", e);
                report.failed += 1;
                report.warnings.push(format!("Patch {} du {}: erreur d'écriture ({})", numero, date, e));
            }
        }
    }

    info!(
        imported = report.imported,
        duplicates = report.duplicates,
        skipped = report.skipped,
        failed = report.failed,
        "✅ import finished"
    );
    Ok(report)
}

/// Importa el cuerpo JSON heredado `{ "patches": [...] }`.
///
/// Si `patches` no es una lista falla con `InvalidFormat` antes de tocar el
/// store. Los elementos que no se pueden leer como lote cuentan como `skipped`.
pub async fn import_json_body(
    store: &Arc<dyn PatchStore>,
    body: &serde_json::Value,
    opts: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let items = body
        .get("patches")
        .and_then(|v| v.as_array())
        .ok_or(ImportError::InvalidFormat)?;

    let mut batches = Vec::with_capacity(items.len());
    let mut rejected: Vec<String> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<PatchBatchInput>(item.clone()) {
            Ok(input) => batches.push(input.into_batch()),
            Err(e) => {
                warn!(index = i, "unreadable patch in json body: {}", e);
                rejected.push(format!("Patch #{} ignoré: {}", i + 1, e));
            }
        }
    }

    let mut report = import_batches(store, batches, opts).await?;
    report.skipped += rejected.len();
    report.warnings.extend(rejected);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Correctif;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store() -> Arc<dyn PatchStore> {
        Arc::new(MemoryStore::new())
    }

    fn batch(date: &str, numero: &str, technos: &[&str]) -> PatchBatch {
        let mut b = PatchBatch::new(date, numero);
        b.correctifs = technos
            .iter()
            .map(|t| Correctif { techno: t.to_string(), module: "GRH".into(), ..Default::default() })
            .collect();
        b
    }

    #[tokio::test]
    async fn same_key_in_two_calls_is_one_import_one_duplicate() {
        let store = store();
        let opts = ImportOptions::default();
        let first = import_batches(&store, vec![batch("01/01/2024", "5", &["Java"])], &opts).await.unwrap();
        let second = import_batches(&store, vec![batch("01/01/2024", "5", &["IBM"])], &opts).await.unwrap();
        assert_eq!(first.imported + second.imported, 1);
        assert_eq!(first.duplicates + second.duplicates, 1);
        assert_eq!(store.count().unwrap(), 1);
        let kept = store.find_by_key("01/01/2024", "5").unwrap().unwrap();
        assert_eq!(kept.batch.correctifs[0].techno, "Java");
    }

    #[tokio::test]
    async fn empty_numero_is_skipped_not_duplicate() {
        let store = store();
        let report = import_batches(&store, vec![batch("01/01/2024", "", &["Java"])], &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.imported, 0);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn stats_and_timestamp_are_set_on_insert() {
        let store = store();
        import_batches(&store, vec![batch("02/02/2024", "9", &["Java", "", "Java", "IBM"])], &ImportOptions::default())
            .await
            .unwrap();
        let stored = store.find_by_key("02/02/2024", "9").unwrap().unwrap();
        let stats = stored.batch.stats.expect("stats");
        assert_eq!(stats.total_correctifs, 4);
        assert_eq!(stats.technos, vec!["Java", "IBM"]);
        assert_eq!(stats.modules, vec!["GRH"]);
        assert!(stored.batch.imported_at.is_some());
    }

    #[tokio::test]
    async fn duplicates_within_one_call_are_counted() {
        let store = store();
        let report = import_batches(
            &store,
            vec![batch("A", "1", &[]), batch("A", "1", &[]), batch("B", "2", &[])],
            &ImportOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!((report.imported, report.duplicates), (2, 1));
        assert_eq!(report.message(), "Import terminé: 2 patches importés, 1 doublons ignorés, 0 ignorés (format invalide)");
    }

    #[tokio::test]
    async fn json_body_must_hold_a_list() {
        let store = store();
        let opts = ImportOptions::default();
        for body in [json!({}), json!({"patches": {"a": 1}}), json!({"patches": "x"}), json!([1, 2])] {
            let err = import_json_body(&store, &body, &opts).await.unwrap_err();
            assert!(matches!(err, ImportError::InvalidFormat));
        }
    }

    #[tokio::test]
    async fn json_body_counts_unreadable_items_as_skipped() {
        let store = store();
        let body = json!({
            "patches": [
                {"datePatchCumulatif": "01/03/2024", "numeroPatchCumulatif": "12", "correctifs": [{"patch": "P1", "techno": "Java"}]},
                {"datePatchCumulatif": 44197, "numeroPatchCumulatif": 13},
                "not a batch",
                {"datePatchCumulatif": "", "numeroPatchCumulatif": "14"}
            ]
        });
        let report = import_json_body(&store, &body, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 2);
        assert!(store.find_by_key("01/01/2021", "13").unwrap().is_some());
    }

    struct BrokenStore;

    impl PatchStore for BrokenStore {
        fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn find_by_key(&self, _: &str, _: &str) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn insert(&self, _: &PatchBatch) -> Result<i64, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn find_all(&self) -> Result<Vec<crate::models::StoredPatch>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn find_by_id(&self, _: i64) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn find_by_numero(&self, _: &str) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn delete_by_id(&self, _: i64) -> Result<bool, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn delete_many(&self, _: crate::store::PatchFilter) -> Result<usize, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    /// Responde al ping pero falla en la escritura del lote "bad".
    struct FlakyStore {
        inner: MemoryStore,
    }

    impl PatchStore for FlakyStore {
        fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping()
        }
        fn find_by_key(&self, d: &str, n: &str) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            self.inner.find_by_key(d, n)
        }
        fn insert(&self, batch: &PatchBatch) -> Result<i64, StoreError> {
            if batch.numero_patch_cumulatif == "bad" {
                return Err(StoreError::Task("disk full".into()));
            }
            self.inner.insert(batch)
        }
        fn find_all(&self) -> Result<Vec<crate::models::StoredPatch>, StoreError> {
            self.inner.find_all()
        }
        fn find_by_id(&self, id: i64) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            self.inner.find_by_id(id)
        }
        fn find_by_numero(&self, n: &str) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            self.inner.find_by_numero(n)
        }
        fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
            self.inner.delete_by_id(id)
        }
        fn delete_many(&self, f: crate::store::PatchFilter) -> Result<usize, StoreError> {
            self.inner.delete_many(f)
        }
    }

    /// Escritura lenta: `commit_first` decide si el lote se guarda antes o después de la espera.
    struct SlowInsertStore {
        inner: MemoryStore,
        delay: Duration,
        commit_first: bool,
    }

    impl PatchStore for SlowInsertStore {
        fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping()
        }
        fn find_by_key(&self, d: &str, n: &str) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            self.inner.find_by_key(d, n)
        }
        fn insert(&self, batch: &PatchBatch) -> Result<i64, StoreError> {
            if self.commit_first {
                let id = self.inner.insert(batch)?;
                std::thread::sleep(self.delay);
                Ok(id)
            } else {
                std::thread::sleep(self.delay);
                self.inner.insert(batch)
            }
        }
        fn find_all(&self) -> Result<Vec<crate::models::StoredPatch>, StoreError> {
            self.inner.find_all()
        }
        fn find_by_id(&self, id: i64) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            self.inner.find_by_id(id)
        }
        fn find_by_numero(&self, n: &str) -> Result<Option<crate::models::StoredPatch>, StoreError> {
            self.inner.find_by_numero(n)
        }
        fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
            self.inner.delete_by_id(id)
        }
        fn delete_many(&self, f: crate::store::PatchFilter) -> Result<usize, StoreError> {
            self.inner.delete_many(f)
        }
    }

    #[tokio::test]
    async fn timed_out_insert_that_committed_counts_as_imported() {
        let store: Arc<dyn PatchStore> = Arc::new(SlowInsertStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(300),
            commit_first: true,
        });
        let opts = ImportOptions { store_timeout: Duration::from_millis(50) };
        let report = import_batches(&store, vec![batch("A", "1", &[])], &opts).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn timed_out_insert_not_yet_visible_is_reported_as_uncertain() {
        let store: Arc<dyn PatchStore> = Arc::new(SlowInsertStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(300),
            commit_first: false,
        });
        let opts = ImportOptions { store_timeout: Duration::from_millis(50) };
        let report = import_batches(&store, vec![batch("A", "1", &[])], &opts).await.unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.failed, 1);
        assert!(report.warnings[0].contains("résultat incertain"));
    }

    #[tokio::test]
    async fn unreachable_store_fails_the_whole_import() {
        let store: Arc<dyn PatchStore> = Arc::new(BrokenStore);
        let err = import_batches(&store, vec![batch("A", "1", &[])], &ImportOptions::default()).await.unwrap_err();
        assert!(matches!(err, ImportError::Persistence(_)));
    }

    #[tokio::test]
    async fn one_failed_insert_does_not_stop_the_run() {
        let store: Arc<dyn PatchStore> = Arc::new(FlakyStore { inner: MemoryStore::new() });
        let report = import_batches(
            &store,
            vec![batch("A", "1", &[]), batch("A", "bad", &[]), batch("A", "3", &[])],
            &ImportOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 1);
        assert!(report.message().ends_with(", 1 en erreur"));
    }
}

use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::{PatchBatch, StoredPatch};
use crate::store::{is_header_echo, PatchFilter, PatchStore};

#[derive(Default)]
struct Inner {
    next_id: i64,
    patches: Vec<StoredPatch>,
}

/// Store en memoria, para tests y para `memory://`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl PatchStore for MemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    fn find_by_key(&self, date: &str, numero: &str) -> Result<Option<StoredPatch>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.patches.iter().find(|p| p.batch.key() == (date, numero)).cloned())
    }

    fn insert(&self, batch: &PatchBatch) -> Result<i64, StoreError> {
        let mut guard = self.lock()?;
        if guard.patches.iter().any(|p| p.batch.key() == batch.key()) {
            return Err(StoreError::Duplicate {
                date: batch.date_patch_cumulatif.clone(),
                numero: batch.numero_patch_cumulatif.clone(),
            });
        }
        guard.next_id += 1;
        let id = guard.next_id;
        let mut stored = batch.clone();
        if stored.imported_at.is_none() {
            stored.imported_at = Some(Utc::now());
        }
        guard.patches.push(StoredPatch { id, batch: stored });
        Ok(id)
    }

    fn find_all(&self) -> Result<Vec<StoredPatch>, StoreError> {
        let guard = self.lock()?;
        let mut all = guard.patches.clone();
        all.sort_by(|a, b| b.batch.imported_at.cmp(&a.batch.imported_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<StoredPatch>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.patches.iter().find(|p| p.id == id).cloned())
    }

    fn find_by_numero(&self, numero: &str) -> Result<Option<StoredPatch>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.patches.iter().find(|p| p.batch.numero_patch_cumulatif == numero).cloned())
    }

    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let before = guard.patches.len();
        guard.patches.retain(|p| p.id != id);
        Ok(guard.patches.len() < before)
    }

    fn delete_many(&self, filter: PatchFilter) -> Result<usize, StoreError> {
        let mut guard = self.lock()?;
        let before = guard.patches.len();
        match filter {
            PatchFilter::All => guard.patches.clear(),
            // aquí las fechas siempre son texto: sólo quedan los ecos de encabezado
            PatchFilter::Garbage => guard.patches.retain(|p| !is_header_echo(&p.batch)),
        }
        Ok(before - guard.patches.len())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.patches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HEADER_ECHO_DATE;

    #[test]
    fn duplicate_key_is_rejected_and_original_kept() {
        let store = MemoryStore::new();
        let mut first = PatchBatch::new("01/01/2024", "1");
        first.correctifs.push(Default::default());
        store.insert(&first).unwrap();
        let err = store.insert(&PatchBatch::new("01/01/2024", "1")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.find_by_key("01/01/2024", "1").unwrap().unwrap().batch.correctifs.len(), 1);
    }

    #[test]
    fn garbage_filter_drops_header_echoes() {
        let store = MemoryStore::new();
        store.insert(&PatchBatch::new(HEADER_ECHO_DATE, "x")).unwrap();
        store.insert(&PatchBatch::new("01/01/2024", "1")).unwrap();
        assert_eq!(store.delete_many(PatchFilter::Garbage).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn find_all_is_newest_first() {
        let store = MemoryStore::new();
        let a = store.insert(&PatchBatch::new("01/01/2024", "1")).unwrap();
        let b = store.insert(&PatchBatch::new("01/01/2024", "2")).unwrap();
        let ids: Vec<i64> = store.find_all().unwrap().iter().map(|p| p.id).collect();
        // mismo instante posible: el id desempata
        assert_eq!(ids[0], b.max(a));
        assert_eq!(ids.len(), 2);
    }
}

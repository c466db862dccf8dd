use std::collections::HashMap;

use crate::models::{Correctif, PatchBatch};

/// Agrupa correctifs en lotes por (fecha, número) exactos.
///
/// Estable: los lotes salen en el orden en que se vio su clave por primera
/// vez y los correctifs conservan el orden de las filas. Claves vacías
/// forman el lote ("", ""); el persistidor lo descarta después.
pub fn group_correctifs(correctifs: Vec<Correctif>) -> Vec<PatchBatch> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut batches: Vec<PatchBatch> = Vec::new();

    for c in correctifs {
        let key = (c.date_patch_cumulatif.clone(), c.numero_patch_cumulatif.clone());
        let slot = match index.get(&key) {
            Some(i) => *i,
            None => {
                batches.push(PatchBatch::new(&key.0, &key.1));
                index.insert(key, batches.len() - 1);
                batches.len() - 1
            }
        };
        batches[slot].correctifs.push(c);
    }

    batches
}

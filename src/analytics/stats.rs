use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::StoredPatch;

/// Conteos sobre todo el corpus persistido. Se recalcula en cada petición.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchStats {
    pub total: usize,
    pub total_correctifs: usize,
    pub by_techno: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub by_destinataire: BTreeMap<String, usize>,
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    let key = key.trim();
    if key.is_empty() {
        return;
    }
    *map.entry(key.to_string()).or_insert(0) += 1;
}

/// Agrega los lotes: un recorrido por correctif, valores vacíos excluidos.
pub fn aggregate(patches: &[StoredPatch]) -> PatchStats {
    let mut stats = PatchStats { total: patches.len(), ..Default::default() };
    for p in patches {
        stats.total_correctifs += p.batch.correctifs.len();
        for c in &p.batch.correctifs {
            bump(&mut stats.by_techno, &c.techno);
            bump(&mut stats.by_module, &c.module);
            bump(&mut stats.by_destinataire, &c.destinataire);
        }
    }
    stats
}

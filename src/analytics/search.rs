use serde::Deserialize;

use crate::models::{Correctif, StoredPatch};

/// Filtros de búsqueda. `"all"` o vacío equivale a no filtrar.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub techno: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub destinataire: Option<String>,
}

fn active(filter: &Option<String>) -> Option<&str> {
    match filter.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(v) => Some(v),
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl SearchQuery {
    /// Todos los filtros activos se combinan con AND.
    pub fn matches(&self, patch: &StoredPatch) -> bool {
        let batch = &patch.batch;

        if let Some(term) = active(&self.term) {
            let t = term.to_lowercase();
            let hit = contains_ci(&batch.numero_patch_cumulatif, &t)
                || contains_ci(&batch.date_patch_cumulatif, &t)
                || batch.correctifs.iter().any(|c| {
                    contains_ci(&c.description, &t)
                        || contains_ci(&c.patch, &t)
                        || contains_ci(&c.module, &t)
                        || contains_ci(&c.nom_traitement, &t)
                });
            if !hit {
                return false;
            }
        }

        let exact = |filter: &Option<String>, get: fn(&Correctif) -> &str| match active(filter) {
            None => true,
            Some(v) => batch.correctifs.iter().any(|c| get(c) == v),
        };

        exact(&self.techno, |c| c.techno.as_str())
            && exact(&self.module, |c| c.module.as_str())
            && exact(&self.destinataire, |c| c.destinataire.as_str())
    }

    /// Conserva el orden de entrada.
    pub fn filter(&self, patches: Vec<StoredPatch>) -> Vec<StoredPatch> {
        patches.into_iter().filter(|p| self.matches(p)).collect()
    }
}

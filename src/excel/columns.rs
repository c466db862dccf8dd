//! Mapeo de encabezados de la hoja de patches a campos canónicos, y detección
//! de la fila de encabezado dentro del preámbulo.

use std::collections::BTreeMap;

use crate::excel::io::{fold_accents, normalize_header};
use crate::models::CellValue;

/// Campos canónicos de un correctif.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    DatePatchCumulatif,
    NumeroPatchCumulatif,
    Patch,
    Module,
    NomTraitement,
    Description,
    Destinataire,
    ReferenceDossier,
    ReferenceDossierSopra,
    Techno,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::DatePatchCumulatif,
        Field::NumeroPatchCumulatif,
        Field::Patch,
        Field::Module,
        Field::NomTraitement,
        Field::Description,
        Field::Destinataire,
        Field::ReferenceDossier,
        Field::ReferenceDossierSopra,
        Field::Techno,
    ];

    /// Nombre JSON del campo.
    pub fn name(&self) -> &'static str {
        match self {
            Field::DatePatchCumulatif => "datePatchCumulatif",
            Field::NumeroPatchCumulatif => "numeroPatchCumulatif",
            Field::Patch => "patch",
            Field::Module => "module",
            Field::NomTraitement => "nomTraitement",
            Field::Description => "description",
            Field::Destinataire => "destinataire",
            Field::ReferenceDossier => "referenceDossier",
            Field::ReferenceDossierSopra => "referenceDossierSopra",
            Field::Techno => "techno",
        }
    }
}

/// Clasifica un texto de encabezado. La primera regla que coincide gana.
pub fn classify_header(header: &str) -> Option<Field> {
    let h = normalize_header(header);
    if h.is_empty() {
        return None;
    }
    let folded = fold_accents(&h);

    if h.contains("date du patch") || h.contains("date patch") {
        Some(Field::DatePatchCumulatif)
    } else if h.contains("numéro de patch") || h.contains("numero patch") {
        Some(Field::NumeroPatchCumulatif)
    } else if h == "patch" {
        Some(Field::Patch)
    } else if h == "module" {
        Some(Field::Module)
    } else if h.contains("traitement") {
        Some(Field::NomTraitement)
    } else if h == "description" {
        Some(Field::Description)
    } else if h.contains("destinataire") {
        Some(Field::Destinataire)
    } else if folded.contains("reference dossier client") {
        Some(Field::ReferenceDossier)
    } else if folded.contains("reference dossier sopra") {
        Some(Field::ReferenceDossierSopra)
    } else if h == "techno" {
        Some(Field::Techno)
    } else {
        None
    }
}

/// Campo canónico -> índice de columna (0-based). Se construye una vez por
/// importación a partir de la fila de encabezado.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    columns: BTreeMap<Field, usize>,
}

impl ColumnMapping {
    /// Construye el mapeo; si dos columnas dan el mismo campo gana la última.
    pub fn from_header(cells: &[CellValue]) -> Self {
        let mut columns = BTreeMap::new();
        for (idx, cell) in cells.iter().enumerate() {
            if let Some(field) = classify_header(&cell.as_text()) {
                columns.insert(field, idx);
            }
        }
        ColumnMapping { columns }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn fields(&self) -> Vec<Field> {
        self.columns.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columnas que no cuentan para decidir si una fila está vacía.
    pub fn is_key_column(&self, idx: usize) -> bool {
        self.get(Field::DatePatchCumulatif) == Some(idx) || self.get(Field::NumeroPatchCumulatif) == Some(idx)
    }
}

/// Una fila es encabezado si su texto unido contiene "date du patch",
/// "numéro de patch", o a la vez "patch" y "module".
pub fn is_header_row(row: &[CellValue]) -> bool {
    let joined = row.iter().map(|c| c.as_text()).collect::<Vec<_>>().join("|").to_lowercase();
    joined.contains("date du patch")
        || (joined.contains("patch") && joined.contains("module"))
        || joined.contains("numéro de patch")
}

/// Índice de la primera fila de encabezado, recorriendo de arriba abajo.
pub fn find_header_row(rows: &[Vec<CellValue>]) -> Option<usize> {
    rows.iter().position(|r| is_header_row(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn maps_full_resultat_header() {
        let row = header(&[
            "Date du patch cumulatif",
            "Numéro de patch cumulatif",
            "Patch",
            "Module",
            "Nom du traitement",
            "Description",
            "Destinataire",
            "Référence dossier client",
            "Reference dossier Sopra",
            "Techno",
        ]);
        let mapping = ColumnMapping::from_header(&row);
        assert_eq!(mapping.len(), 10);
        for (idx, field) in Field::ALL.iter().enumerate() {
            assert_eq!(mapping.get(*field), Some(idx), "field {}", field.name());
        }
    }

    #[test]
    fn only_present_synonyms_are_mapped() {
        let row = header(&["  MODULE ", "Commentaire", "description", "Date patch"]);
        let mapping = ColumnMapping::from_header(&row);
        assert_eq!(mapping.fields(), vec![Field::DatePatchCumulatif, Field::Module, Field::Description]);
        assert_eq!(mapping.get(Field::Module), Some(0));
        assert_eq!(mapping.get(Field::Description), Some(2));
        assert_eq!(mapping.get(Field::DatePatchCumulatif), Some(3));
        assert!(!mapping.contains(Field::Techno));
    }

    #[test]
    fn exact_headers_do_not_match_substrings() {
        assert_eq!(classify_header("Patch correctif"), None);
        assert_eq!(classify_header("Modules"), None);
        assert_eq!(classify_header("Technologie"), None);
        assert_eq!(classify_header("patch"), Some(Field::Patch));
    }

    #[test]
    fn numero_rule_needs_the_listed_spellings() {
        assert_eq!(classify_header("Numéro de patch"), Some(Field::NumeroPatchCumulatif));
        assert_eq!(classify_header("numero patch"), Some(Field::NumeroPatchCumulatif));
        assert_eq!(classify_header("N° patch"), None);
    }

    #[test]
    fn last_duplicate_column_wins() {
        let row = header(&["Module", "Module"]);
        assert_eq!(ColumnMapping::from_header(&row).get(Field::Module), Some(1));
    }

    #[test]
    fn header_detection_skips_preamble() {
        let rows = vec![
            header(&["Liste des correctifs"]),
            header(&["", ""]),
            header(&["Patch", "Module", "Description"]),
            header(&["P1", "GRH", "fix"]),
        ];
        assert_eq!(find_header_row(&rows), Some(2));
        assert!(is_header_row(&header(&["x", "Date du patch"])));
        assert!(is_header_row(&header(&["Numéro de patch"])));
        assert_eq!(find_header_row(&[header(&["a", "b"])]), None);
    }
}

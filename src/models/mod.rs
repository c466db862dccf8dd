// Estructuras de datos principales

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Valor de una celda de la hoja: texto o número (serial de fecha incluido).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    /// Texto recortado de la celda. Los números enteros se muestran sin decimales.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(f) => {
                // fuera de ±2^53 el cast a i64 perdería o saturaría el valor
                if f.is_finite() && f.abs() < 9.0e15 && (f.floor() - f).abs() < f64::EPSILON {
                    format!("{}", *f as i64)
                } else {
                    format!("{}", f)
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Number(f)
    }
}

/// Un correctif individual dentro de un patch cumulativo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Correctif {
    pub date_patch_cumulatif: String,
    pub numero_patch_cumulatif: String,
    pub patch: String,
    pub module: String,
    pub nom_traitement: String,
    pub description: String,
    pub destinataire: String,
    pub reference_dossier: String,
    pub reference_dossier_sopra: String,
    pub techno: String,
}

impl Correctif {
    /// Un correctif sólo se conserva si tiene patch, module o description.
    pub fn has_content(&self) -> bool {
        !self.patch.trim().is_empty()
            || !self.module.trim().is_empty()
            || !self.description.trim().is_empty()
    }
}

/// Resumen derivado de los correctifs de un lote, calculado al persistir.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_correctifs: usize,
    pub technos: Vec<String>,
    pub modules: Vec<String>,
}

impl BatchStats {
    /// Valores distintos y no vacíos, en orden de primera aparición.
    pub fn from_correctifs(correctifs: &[Correctif]) -> Self {
        let mut technos: Vec<String> = Vec::new();
        let mut modules: Vec<String> = Vec::new();
        for c in correctifs {
            if !c.techno.is_empty() && !technos.contains(&c.techno) {
                technos.push(c.techno.clone());
            }
            if !c.module.is_empty() && !modules.contains(&c.module) {
                modules.push(c.module.clone());
            }
        }
        BatchStats { total_correctifs: correctifs.len(), technos, modules }
    }
}

/// Patch cumulativo: agrupa los correctifs de una misma entrega.
/// Clave natural: (`date_patch_cumulatif`, `numero_patch_cumulatif`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBatch {
    #[serde(default)]
    pub date_patch_cumulatif: String,
    #[serde(default)]
    pub numero_patch_cumulatif: String,
    #[serde(default)]
    pub correctifs: Vec<Correctif>,
    #[serde(default, alias = "dateImport", skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BatchStats>,
}

impl PatchBatch {
    pub fn new(date: &str, numero: &str) -> Self {
        PatchBatch {
            date_patch_cumulatif: date.to_string(),
            numero_patch_cumulatif: numero.to_string(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.date_patch_cumulatif, &self.numero_patch_cumulatif)
    }

    /// Ambos campos de la clave natural presentes tras recortar.
    pub fn has_natural_key(&self) -> bool {
        !self.date_patch_cumulatif.trim().is_empty() && !self.numero_patch_cumulatif.trim().is_empty()
    }
}

/// Lote tal como llega por el endpoint JSON heredado: el front antiguo podía
/// enviar la fecha como serial numérico.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBatchInput {
    #[serde(default)]
    pub date_patch_cumulatif: Option<CellValue>,
    #[serde(default)]
    pub numero_patch_cumulatif: Option<CellValue>,
    #[serde(default)]
    pub correctifs: Option<Vec<Correctif>>,
}

impl PatchBatchInput {
    pub fn into_batch(self) -> PatchBatch {
        let date = crate::excel::normalize_date(self.date_patch_cumulatif.as_ref());
        let numero = self.numero_patch_cumulatif.map(|v| v.as_text()).unwrap_or_default();
        PatchBatch {
            date_patch_cumulatif: date,
            numero_patch_cumulatif: numero,
            correctifs: self.correctifs.unwrap_or_default(),
            imported_at: None,
            stats: None,
        }
    }
}

/// Lote persistido junto con su id de almacenamiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPatch {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(flatten)]
    pub batch: PatchBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_drops_integral_decimals() {
        assert_eq!(CellValue::Number(1234.0).as_text(), "1234");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::from("  PC-12 ").as_text(), "PC-12");
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert_eq!(CellValue::Number(-1e20).as_text(), "-100000000000000000000");
    }

    #[test]
    fn batch_stats_keep_first_seen_order() {
        let mk = |techno: &str, module: &str| Correctif {
            techno: techno.to_string(),
            module: module.to_string(),
            ..Default::default()
        };
        let stats = BatchStats::from_correctifs(&[mk("Java", "GRH"), mk("", "CPT"), mk("IBM", "GRH"), mk("Java", "")]);
        assert_eq!(stats.total_correctifs, 4);
        assert_eq!(stats.technos, vec!["Java", "IBM"]);
        assert_eq!(stats.modules, vec!["GRH", "CPT"]);
    }

    #[test]
    fn legacy_date_import_alias_is_accepted() {
        let json = r#"{"datePatchCumulatif":"01/02/2024","numeroPatchCumulatif":"12","correctifs":[],"dateImport":"2024-02-03T10:00:00Z"}"#;
        let batch: PatchBatch = serde_json::from_str(json).expect("batch json");
        assert!(batch.imported_at.is_some());
        assert_eq!(batch.key(), ("01/02/2024", "12"));
    }

    #[test]
    fn stored_patch_serializes_mongo_style_id() {
        let stored = StoredPatch { id: 7, batch: PatchBatch::new("01/01/2021", "3") };
        let v = serde_json::to_value(&stored).unwrap();
        assert_eq!(v["_id"], 7);
        assert_eq!(v["numeroPatchCumulatif"], "3");
    }

    #[test]
    fn input_with_numeric_date_is_normalized() {
        let json = r#"{"datePatchCumulatif":44197,"numeroPatchCumulatif":17}"#;
        let input: PatchBatchInput = serde_json::from_str(json).unwrap();
        let batch = input.into_batch();
        assert_eq!(batch.date_patch_cumulatif, "01/01/2021");
        assert_eq!(batch.numero_patch_cumulatif, "17");
        assert!(batch.correctifs.is_empty());
    }
}

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::error::ImportError;
use crate::models::CellValue;

/// Tabla leída de una hoja: filas de celdas, más el número (1-based) de la
/// primera fila en la hoja original. calamine recorta las filas vacías del
/// principio, así que sin este desplazamiento los avisos apuntarían mal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub first_row: usize,
    pub rows: Vec<Vec<CellValue>>,
}

/// Convierte un `Data` de calamine a `CellValue`.
/// Las fechas nativas de Excel se devuelven como su serial numérico.
pub fn cell_to_value(c: &Data) -> CellValue {
    match c {
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Empty => CellValue::empty(),
        Data::Error(_) => CellValue::empty(),
    }
}

/// Normaliza encabezados: minúsculas y sin espacios en los extremos.
pub fn normalize_header(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Quita los acentos franceses habituales (é -> e, ç -> c, ...).
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' | 'á' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' => 'i',
            'ô' | 'ö' | 'ó' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ç' => 'c',
            'À' | 'Â' | 'Ä' | 'Á' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Î' | 'Ï' | 'Í' => 'I',
            'Ô' | 'Ö' | 'Ó' => 'O',
            'Ù' | 'Û' | 'Ü' | 'Ú' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Elige la hoja a importar: la que se llame "Resultat"/"Result" si existe,
/// si no la primera.
pub fn pick_sheet(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|n| {
            let lower = n.to_lowercase();
            lower.contains("resultat") || lower.contains("result")
        })
        .or_else(|| names.first())
        .cloned()
}

/// Lee un libro (xlsx, xls, ods) desde memoria y devuelve la hoja elegida.
pub fn read_workbook(bytes: &[u8]) -> Result<SheetTable, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let names = workbook.sheet_names().to_owned();
    let sheet = match pick_sheet(&names) {
        Some(s) => s,
        None => return Ok(SheetTable::default()),
    };
    tracing::debug!(sheet = %sheet, "reading worksheet");

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let first_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|r| r.iter().map(cell_to_value).collect())
        .collect();

    Ok(SheetTable { sheet_name: sheet, first_row, rows })
}

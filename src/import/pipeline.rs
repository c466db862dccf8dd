use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ImportError;
use crate::excel::{extract_correctifs, find_header_row, read_workbook, ColumnMapping, SheetTable};
use crate::import::grouper::group_correctifs;
use crate::import::persist::{import_batches, ImportOptions, ImportReport};
use crate::models::{CellValue, PatchBatch};
use crate::store::PatchStore;

/// Resultado de leer una hoja: los lotes listos para persistir.
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub sheet_name: String,
    /// Filas de datos leídas después del encabezado.
    pub rows: usize,
    pub correctifs: usize,
    pub batches: Vec<PatchBatch>,
    pub warnings: Vec<String>,
}

/// Respuesta de `POST /import/file`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileImportOutcome {
    pub sheet: String,
    pub rows: usize,
    pub correctifs: usize,
    pub batches: usize,
    #[serde(flatten)]
    pub report: ImportReport,
}

/// Encabezado, mapeo de columnas, extracción y agrupación sobre una tabla ya leída.
pub fn parse_table(table: &SheetTable) -> Result<ParsedSheet, ImportError> {
    let header_idx = find_header_row(&table.rows).ok_or(ImportError::HeaderNotFound)?;
    let mapping = ColumnMapping::from_header(&table.rows[header_idx]);
    debug!(
        sheet = %table.sheet_name,
        header_row = table.first_row + header_idx,
        "columns mapped: {:?}",
        mapping.fields().iter().map(|f| f.name()).collect::<Vec<_>>()
    );

    let data = &table.rows[header_idx + 1..];
    let extraction = extract_correctifs(data, &mapping, table.first_row + header_idx + 1);
    if extraction.correctifs.is_empty() {
        return Err(ImportError::NoCorrectifs);
    }

    let correctifs = extraction.correctifs.len();
    let batches = group_correctifs(extraction.correctifs);
    info!(
        sheet = %table.sheet_name,
        rows = data.len(),
        correctifs,
        batches = batches.len(),
        "📄 sheet parsed"
    );

    Ok(ParsedSheet {
        sheet_name: table.sheet_name.clone(),
        rows: data.len(),
        correctifs,
        batches,
        warnings: extraction.warnings,
    })
}

/// Igual que `parse_table` para filas sueltas; la primera fila es la 1.
pub fn parse_rows(rows: Vec<Vec<CellValue>>) -> Result<ParsedSheet, ImportError> {
    parse_table(&SheetTable { sheet_name: String::new(), first_row: 1, rows })
}

/// Lee un .xlsx/.xls/.ods en memoria y lo convierte en lotes.
pub fn parse_workbook(bytes: &[u8]) -> Result<ParsedSheet, ImportError> {
    let table = read_workbook(bytes)?;
    parse_table(&table)
}

/// Persiste una hoja ya leída. Los avisos de lectura van antes que los de persistencia.
pub async fn import_parsed(
    store: &Arc<dyn PatchStore>,
    parsed: ParsedSheet,
    opts: &ImportOptions,
) -> Result<FileImportOutcome, ImportError> {
    let ParsedSheet { sheet_name, rows, correctifs, batches, mut warnings } = parsed;
    let n_batches = batches.len();
    let mut report = import_batches(store, batches, opts).await?;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok(FileImportOutcome { sheet: sheet_name, rows, correctifs, batches: n_batches, report })
}

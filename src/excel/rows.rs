use crate::excel::columns::{classify_header, ColumnMapping, Field};
use crate::excel::dates::normalize_date;
use crate::models::{CellValue, Correctif};
use crate::store::{HEADER_ECHO_DATE, HEADER_ECHO_NUMERO};

/// Resultado de extraer correctifs de las filas de datos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub correctifs: Vec<Correctif>,
    /// Una entrada por fila descartada, con su número de fila en la hoja.
    pub warnings: Vec<String>,
}

/// Texto recortado de la columna mapeada para `field`, o "" si no hay columna.
fn read_text(row: &[CellValue], mapping: &ColumnMapping, field: Field) -> String {
    mapping
        .get(field)
        .and_then(|idx| row.get(idx))
        .map(|c| c.as_text())
        .unwrap_or_default()
}

/// true si alguna celda fuera de las columnas de fecha/número tiene contenido.
fn has_data(row: &[CellValue], mapping: &ColumnMapping) -> bool {
    row.iter()
        .enumerate()
        .any(|(idx, cell)| !mapping.is_key_column(idx) && !cell.is_blank())
}

/// true si la fila repite el encabezado: la fecha o el número traen el
/// título de su columna, o cada celda mapeada con texto es su propio título.
fn is_header_echo(row: &[CellValue], mapping: &ColumnMapping) -> bool {
    let date = read_text(row, mapping, Field::DatePatchCumulatif);
    let numero = read_text(row, mapping, Field::NumeroPatchCumulatif);
    if date.eq_ignore_ascii_case(HEADER_ECHO_DATE) || numero.to_lowercase() == HEADER_ECHO_NUMERO.to_lowercase() {
        return true;
    }

    let mut titled = 0;
    for field in mapping.fields() {
        let text = read_text(row, mapping, field);
        if text.is_empty() {
            continue;
        }
        if classify_header(&text) != Some(field) {
            return false;
        }
        titled += 1;
    }
    titled > 0
}

/// Construye el correctif de una fila. La fecha pasa por el normalizador.
pub fn extract_correctif(row: &[CellValue], mapping: &ColumnMapping) -> Correctif {
    let date_cell = mapping.get(Field::DatePatchCumulatif).and_then(|idx| row.get(idx));
    Correctif {
        date_patch_cumulatif: normalize_date(date_cell),
        numero_patch_cumulatif: read_text(row, mapping, Field::NumeroPatchCumulatif),
        patch: read_text(row, mapping, Field::Patch),
        module: read_text(row, mapping, Field::Module),
        nom_traitement: read_text(row, mapping, Field::NomTraitement),
        description: read_text(row, mapping, Field::Description),
        destinataire: read_text(row, mapping, Field::Destinataire),
        reference_dossier: read_text(row, mapping, Field::ReferenceDossier),
        reference_dossier_sopra: read_text(row, mapping, Field::ReferenceDossierSopra),
        techno: read_text(row, mapping, Field::Techno),
    }
}

/// Extrae los correctifs de las filas que siguen al encabezado.
///
/// `first_row_number` es el número de fila en la hoja de `rows[0]`, sólo
/// para los avisos. Nunca falla: las filas vacías, las que repiten el
/// encabezado y las que no tienen patch/module/description se descartan y se
/// anotan en `warnings`.
pub fn extract_correctifs(rows: &[Vec<CellValue>], mapping: &ColumnMapping, first_row_number: usize) -> Extraction {
    let mut out = Extraction::default();

    for (offset, row) in rows.iter().enumerate() {
        let row_number = first_row_number + offset;

        if !has_data(row, mapping) {
            tracing::trace!(row = row_number, "blank row skipped");
            out.warnings.push(format!("Ligne {} ignorée (vide)", row_number));
            continue;
        }

        if is_header_echo(row, mapping) {
            tracing::debug!(row = row_number, "repeated header row skipped");
            out.warnings.push(format!("Ligne {} ignorée (en-tête répété)", row_number));
            continue;
        }

        let correctif = extract_correctif(row, mapping);
        if !correctif.has_content() {
            tracing::debug!(row = row_number, "row without patch/module/description");
            out.warnings.push(format!("Ligne {} ignorée (pas de patch, module ni description)", row_number));
            continue;
        }
        out.correctifs.push(correctif);
    }

    out
}

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::models::StoredPatch;

/// Encabezados del fichero exportado. Todos los reconoce el mapeo de columnas,
/// así que un export se puede volver a importar.
pub const EXPORT_HEADERS: [&str; 10] = [
    "Date du patch",
    "Numéro de patch",
    "Patch",
    "Module",
    "Nom du traitement",
    "Description",
    "Destinataire",
    "Référence dossier client",
    "Référence dossier Sopra",
    "Techno",
];

/// Exporta los patches a XLSX: hoja "Patches", una fila por correctif.
pub fn export_xlsx(patches: &[StoredPatch]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Patches")?;

    let bold = Format::new().set_bold();
    for (col, title) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }

    let mut r: u32 = 1;
    for stored in patches {
        let batch = &stored.batch;
        for c in &batch.correctifs {
            let values: [&str; 10] = [
                &batch.date_patch_cumulatif,
                &batch.numero_patch_cumulatif,
                &c.patch,
                &c.module,
                &c.nom_traitement,
                &c.description,
                &c.destinataire,
                &c.reference_dossier,
                &c.reference_dossier_sopra,
                &c.techno,
            ];
            for (col, v) in values.iter().enumerate() {
                if !v.is_empty() {
                    worksheet.write_string(r, col as u16, *v)?;
                }
            }
            r += 1;
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

/// Nombre del fichero de export para una fecha dada.
pub fn export_filename(today: chrono::NaiveDate) -> String {
    format!("patches_export_{}.xlsx", today.format("%Y-%m-%d"))
}

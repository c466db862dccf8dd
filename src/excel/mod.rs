//! Módulo `excel`: lectura y escritura de los libros de patches.
//!
//! Submódulos:
//! - `io`: lectura del libro con calamine y helpers de celdas/encabezados
//! - `columns`: mapeo de encabezados a campos y detección de la fila de encabezado
//! - `dates`: normalización de fechas (`DD/MM/YYYY`)
//! - `rows`: extracción de correctifs fila a fila
//! - `export`: escritura del export XLSX

/// Helpers de IO y lectura de la hoja
pub mod io;

/// Mapeo de columnas: `ColumnMapping`, `find_header_row`
pub mod columns;

/// Normalizador de fechas
pub mod dates;

/// Extracción de correctifs
pub mod rows;

/// Export XLSX
pub mod export;

pub use columns::{classify_header, find_header_row, is_header_row, ColumnMapping, Field};
pub use dates::{normalize_date, normalize_date_str, serial_to_date};
pub use export::{export_filename, export_xlsx, EXPORT_HEADERS};
pub use io::{read_workbook, SheetTable};
pub use rows::{extract_correctif, extract_correctifs, Extraction};

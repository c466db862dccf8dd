//! Importación de patches: agrupación de correctifs en lotes y persistencia
//! sin duplicados.

pub mod grouper;
pub mod persist;
pub mod pipeline;

pub use grouper::group_correctifs;
pub use persist::{import_batches, import_json_body, ImportOptions, ImportReport};
pub use pipeline::{import_parsed, parse_rows, parse_table, parse_workbook, FileImportOutcome, ParsedSheet};

//! Lado de lectura: estadísticas y búsqueda sobre los lotes persistidos.

pub mod search;
pub mod stats;

pub use search::SearchQuery;
pub use stats::{aggregate, PatchStats};

// Biblioteca raíz del crate `patchdesk`.
// Lectura de exportaciones IKOS, agrupación en patches cumulativos y
// persistencia sin duplicados, expuesto por HTTP.
pub mod analytics;
pub mod config;
pub mod error;
pub mod excel;
pub mod import;
pub mod models;
pub mod server;
pub mod server_handlers;
pub mod store;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
pub use config::Config;

//! Configuración del servicio desde `.env` y variables de entorno.

use std::env;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
pub const DEFAULT_DB_URL: &str = "data/patches.db";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_UPLOAD_MB: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub db_url: String,
    /// Límite de cada llamada al store.
    pub store_timeout: Duration,
    /// Tamaño máximo de un fichero subido o de un cuerpo JSON, en bytes.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: DEFAULT_BIND.to_string(),
            db_url: DEFAULT_DB_URL.to_string(),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

// carga .env si existe; las variables ya definidas tienen prioridad
fn load_dotenv() {
    let _ = dotenv::dotenv();
}

impl Config {
    /// Lee `PATCHDESK_*`. Un valor numérico ilegible se ignora con un aviso.
    pub fn from_env() -> Self {
        load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(bind) = non_empty("PATCHDESK_BIND") {
            cfg.bind = bind;
        }
        if let Some(url) = non_empty("PATCHDESK_DB_URL") {
            cfg.db_url = url;
        }
        if let Some(raw) = non_empty("PATCHDESK_STORE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.store_timeout = Duration::from_millis(ms),
                _ => tracing::warn!(value = %raw, "invalid PATCHDESK_STORE_TIMEOUT_MS, using default"),
            }
        }
        if let Some(raw) = non_empty("PATCHDESK_MAX_UPLOAD_MB") {
            match raw.parse::<usize>().ok().filter(|mb| *mb > 0).and_then(|mb| mb.checked_mul(1024 * 1024)) {
                Some(bytes) => cfg.max_upload_bytes = bytes,
                None => tracing::warn!(value = %raw, "invalid PATCHDESK_MAX_UPLOAD_MB, using default"),
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let c = cfg(&[]);
        assert_eq!(c, Config::default());
        assert_eq!(c.bind, "127.0.0.1:3001");
        assert_eq!(c.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_read() {
        let c = cfg(&[
            ("PATCHDESK_BIND", "0.0.0.0:8080"),
            ("PATCHDESK_DB_URL", "memory://"),
            ("PATCHDESK_STORE_TIMEOUT_MS", "250"),
            ("PATCHDESK_MAX_UPLOAD_MB", "2"),
        ]);
        assert_eq!(c.bind, "0.0.0.0:8080");
        assert_eq!(c.db_url, "memory://");
        assert_eq!(c.store_timeout, Duration::from_millis(250));
        assert_eq!(c.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn garbage_numbers_fall_back() {
        let c = cfg(&[("PATCHDESK_STORE_TIMEOUT_MS", "soon"), ("PATCHDESK_MAX_UPLOAD_MB", "0"), ("PATCHDESK_BIND", "  ")]);
        assert_eq!(c, Config::default());
    }

    #[test]
    fn oversized_upload_limit_falls_back() {
        let huge = usize::MAX.to_string();
        let c = cfg(&[("PATCHDESK_MAX_UPLOAD_MB", huge.as_str())]);
        assert_eq!(c.max_upload_bytes, Config::default().max_upload_bytes);
    }
}

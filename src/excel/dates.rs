//! Normalización de fechas de patch a `DD/MM/YYYY`.
//!
//! Una celda de fecha puede llegar como serial de Excel (días desde
//! 1899-12-30) o como texto `D/M/Y`. Cualquier otra forma se deja tal cual.

use chrono::{Duration, NaiveDate};

use crate::models::CellValue;

/// Serial de Excel correspondiente a 1970-01-01.
const UNIX_EPOCH_SERIAL: i64 = 25569;
/// Mayor serial (en valor absoluto) que se intenta convertir a fecha.
const MAX_SERIAL: f64 = 100_000_000.0;

/// Normaliza una celda de fecha. Celda ausente o vacía -> "".
pub fn normalize_date(value: Option<&CellValue>) -> String {
    match value {
        None => String::new(),
        Some(CellValue::Number(serial)) => serial_to_date(*serial),
        Some(CellValue::Text(s)) => normalize_date_str(s),
    }
}

/// Serial de Excel -> `DD/MM/YYYY`. La parte horaria se descarta.
/// Un serial fuera del calendario representable se devuelve como número.
pub fn serial_to_date(serial: f64) -> String {
    if !serial.is_finite() || serial.abs() > MAX_SERIAL {
        return CellValue::Number(serial).as_text();
    }
    let days = serial.floor() as i64 - UNIX_EPOCH_SERIAL;
    let date = NaiveDate::from_ymd_opt(1970, 1, 1).and_then(|epoch| epoch.checked_add_signed(Duration::days(days)));
    match date {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => CellValue::Number(serial).as_text(),
    }
}

/// `D/M/Y` -> `DD/MM/Y`. El año pasa sin inferir siglo.
pub fn normalize_date_str(raw: &str) -> String {
    let s = raw.trim();
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 3 {
        return s.to_string();
    }
    match (parts[0].trim().parse::<u32>(), parts[1].trim().parse::<u32>()) {
        (Ok(day), Ok(month)) => format!("{:02}/{:02}/{}", day, month, parts[2].trim()),
        _ => s.to_string(),
    }
}

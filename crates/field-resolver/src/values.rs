//! Structural value adaptation
//!
//! Only reshapes values (stringify scalars, split composite dates). No
//! interpretation of free text happens here.

use chrono::NaiveDate;
use serde_json::Value;
use wizard_core_types::DatePart;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Text to type or select for a scalar value.
///
/// Integral numbers print without a fractional part, so `4.0` types as `4`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => {
            if number.is_i64() || number.is_u64() {
                return Some(number.to_string());
            }
            let float = number.as_f64()?;
            if float.is_finite() && float.fract() == 0.0 && float.abs() < 1e15 {
                Some(format!("{float:.0}"))
            } else {
                Some(number.to_string())
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Component of a composite date string, zero padded (`05`, `09`, `2007`).
pub fn date_component(raw: &str, part: DatePart) -> Option<String> {
    let raw = raw.trim();
    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())?;
    let format = match part {
        DatePart::Month => "%m",
        DatePart::Day => "%d",
        DatePart::Year => "%Y",
    };
    Some(date.format(format).to_string())
}

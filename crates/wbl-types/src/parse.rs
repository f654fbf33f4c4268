//! Parsing of string invocation arguments into typed record values.

use crate::error::TypeError;

/// Parse a decimal quantity such as a weight or a fee.
///
/// Non-finite values are rejected because they have no JSON encoding.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, TypeError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TypeError::InvalidDecimal {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Parse a boolean flag.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts `0`, `f`, `F`, `FALSE`, `false`, `False`.
pub fn parse_flag(field: &'static str, raw: &str) -> Result<bool, TypeError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(TypeError::InvalidFlag {
            field,
            value: raw.to_string(),
        }),
    }
}

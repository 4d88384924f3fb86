//! Normalization of sensor descriptions for comparison.

use crate::error::HarnessError;
use crate::expect::ValueType;

/// Significant digits used by [`format_general`].
const GENERAL_PRECISION: i32 = 6;

/// Format `value` in the shortest general form with six significant digits.
///
/// Plain notation is used for exponents in `-4..6`, scientific notation
/// (`1e-05`, `1.23457e+06`) otherwise; trailing zeros are dropped. `5.0` and
/// `5` both render as `5`.
#[must_use]
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", (GENERAL_PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= GENERAL_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            strip_trailing_zeros(mantissa),
            exponent.abs()
        )
    } else {
        let decimals = (GENERAL_PRECISION - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_trailing_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Canonical form of one `sensor-list` entry:
/// `name description units type params...`.
///
/// Float parameters are reformatted with [`format_general`]; the description
/// is dropped when `ignore_description` is set.
pub fn sensor_list_entry<S: AsRef<str>>(
    fields: &[S],
    ignore_description: bool,
) -> Result<Vec<String>, HarnessError> {
    let mut entry: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();

    if entry.len() > 4 && entry[3] == "float" {
        let name = entry[0].clone();
        for param in &mut entry[4..] {
            let parsed: f64 = param.parse().map_err(|e| HarnessError::ValueParse {
                sensor: name.clone(),
                value: param.clone(),
                value_type: ValueType::Float,
                source: Box::new(e),
            })?;
            *param = format_general(parsed);
        }
    }

    if ignore_description && entry.len() > 1 {
        entry.remove(1);
    }
    Ok(entry)
}

pub mod charts;
pub mod csv;
pub mod json;
pub mod pdf;
pub mod table;

/// Formats an amount with comma thousands separators and two decimals,
/// e.g. `1234.5` as `1,234.50`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, digit) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // "-0.00" would read as a loss.
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

pub fn format_money(currency_symbol: &str, value: f64) -> String {
    format!("{currency_symbol} {}", format_amount(value))
}

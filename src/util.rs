/// Compact dollar amount: `$950`, `$12.3K`, `$450.5K`, `$1.25M`, `$3.10B`, `$1.00T`.
pub fn format_usd(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let value = value.abs();

    if value < 1_000.0 {
        format!("{sign}${}", value.round())
    } else if value < 100_000.0 {
        format!("{sign}${:.1}K", (value / 100.0).round() / 10.0)
    } else if value < 1_000_000.0 {
        // Half-thousand steps above 100K.
        format!("{sign}${:.1}K", (value / 500.0).round() / 2.0)
    } else if value < 1_000_000_000.0 {
        format!("{sign}${:.2}M", value / 1_000_000.0)
    } else if value < 1_000_000_000_000.0 {
        format!("{sign}${:.2}B", value / 1_000_000_000.0)
    } else {
        format!("{sign}${:.2}T", value / 1_000_000_000_000.0)
    }
}

pub fn format_amount(value: f64) -> String {
    const UNITS: [&str; 5] = ["", "K", "M", "B", "T"];

    let mut scaled = value.abs();
    let mut unit = 0usize;
    while scaled >= 1000.0 && unit < UNITS.len() - 1 {
        scaled /= 1000.0;
        unit += 1;
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if unit == 0 {
        format!("{sign}{scaled:.2}")
    } else {
        format!("{sign}{scaled:.2}{}", UNITS[unit])
    }
}

/// Signed token delta, e.g. `+1.20K` or `-350.00`.
pub fn format_change(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", format_amount(value))
    } else {
        format_amount(value)
    }
}

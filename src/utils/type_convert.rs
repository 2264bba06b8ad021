/// Strip surrounding double quotes left behind by quoted exports
///
/// Only quote characters at the edges are removed; inner quotes are kept.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim_matches('"')
}

/// Treat blank cells as missing
pub fn non_empty(raw: &str) -> Option<&str> {
    let value = strip_quotes(raw);
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Coerce a raw cell into a score
///
/// # Returns
/// * `Some(value)` for finite numbers
/// * `None` for blank, unparseable or non-finite input (never an error)
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let value: f64 = non_empty(raw)?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

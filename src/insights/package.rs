/// Numeric value of a free-text package such as `"35 LPA"` or `"12.5"`.
///
/// The `LPA` unit suffix is dropped (any case) and the leading decimal number is parsed.
/// Text without a leading number yields `None`.
pub fn parse_package(raw: &str) -> Option<f64> {
    let mut text = raw.trim();
    let unit_at = text.len().saturating_sub(3);
    if text
        .get(unit_at..)
        .is_some_and(|unit| unit.eq_ignore_ascii_case("lpa"))
    {
        text = text[..unit_at].trim_end();
    }

    let mut seen_dot = false;
    let end = text
        .char_indices()
        .find(|&(_, c)| match c {
            '0'..='9' => false,
            '.' if !seen_dot => {
                seen_dot = true;
                false
            }
            _ => true,
        })
        .map_or(text.len(), |(idx, _)| idx);

    let number = text[..end].trim_end_matches('.');
    if number.is_empty() {
        return None;
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

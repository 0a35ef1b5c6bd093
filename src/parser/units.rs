//! Numeric tokens with engineering suffixes.

/// Parse a numeric token such as `10n`, `3.3V` or `-1.2e-3mA`.
///
/// The number may be followed by one scale letter (`T G M k m u n p f`,
/// case-sensitive) and then any unit text, which is ignored. Returns `None`
/// for empty tokens, `NA` and anything that does not start with a number.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("na") {
        return None;
    }

    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mantissa_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if !bytes[mantissa_start..end].iter().any(u8::is_ascii_digit) {
        return None;
    }

    // Exponent only counts when digits follow, so "5e" is 5 with unit "e"
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    let number: f64 = text[..end].parse().ok()?;
    let multiplier = match text[end..].chars().next() {
        Some('T') => 1e12,
        Some('G') => 1e9,
        Some('M') => 1e6,
        Some('k') => 1e3,
        Some('m') => 1e-3,
        Some('u') | Some('µ') => 1e-6,
        Some('n') => 1e-9,
        Some('p') => 1e-12,
        Some('f') => 1e-15,
        _ => 1.0,
    };

    Some(number * multiplier)
}

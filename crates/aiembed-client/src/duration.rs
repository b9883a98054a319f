use std::time::Duration;

use crate::error::ProviderError;

/// Parses `"5s"`, `"10m"`, `"1h"`, a bare number of seconds (`"30"`), or an
/// ISO-8601 time such as `"1h30m"` / `"PT1H30M"` / `"PT0.5S"`.
pub fn parse_duration(raw: &str) -> Result<Duration, ProviderError> {
    let input = raw.trim();
    let invalid = || ProviderError::Config(format!("failed to parse duration [{raw}]"));
    if input.is_empty() {
        return Err(invalid());
    }

    for (suffix, unit_secs) in [('s', 1_u64), ('m', 60), ('h', 3600)] {
        if let Some(digits) = input.strip_suffix(suffix) {
            if let Ok(n) = digits.parse::<u64>() {
                return n
                    .checked_mul(unit_secs)
                    .map(Duration::from_secs)
                    .ok_or_else(invalid);
            }
        }
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    parse_iso_time(input).ok_or_else(invalid)
}

fn parse_iso_time(input: &str) -> Option<Duration> {
    let upper = input.to_ascii_uppercase();
    let body = upper
        .strip_prefix("PT")
        .or_else(|| upper.strip_prefix('T'))
        .unwrap_or(&upper);
    if body.is_empty() {
        return None;
    }

    let mut total = 0.0_f64;
    let mut number = String::new();
    let mut last_unit = 0_u8;
    for ch in body.chars() {
        let (rank, unit_secs) = match ch {
            '0'..='9' | '.' => {
                number.push(ch);
                continue;
            }
            'H' => (1, 3600.0),
            'M' => (2, 60.0),
            'S' => (3, 1.0),
            _ => return None,
        };
        if rank <= last_unit || number.is_empty() {
            return None;
        }
        let value: f64 = number.parse().ok()?;
        if rank < 3 && number.contains('.') {
            return None;
        }
        total += value * unit_secs;
        number.clear();
        last_unit = rank;
    }
    if !number.is_empty() {
        return None;
    }
    Duration::try_from_secs_f64(total).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixed_and_bare_values() {
        assert_eq!(parse_duration("5s").expect("5s"), Duration::from_secs(5));
        assert_eq!(parse_duration("10m").expect("10m"), Duration::from_secs(600));
        assert_eq!(parse_duration("1h").expect("1h"), Duration::from_secs(3600));
        assert_eq!(parse_duration("30").expect("30"), Duration::from_secs(30));
        assert_eq!(parse_duration(" 7s ").expect("7s"), Duration::from_secs(7));
    }

    #[test]
    fn iso_fallback() {
        assert_eq!(
            parse_duration("1h30m").expect("1h30m"),
            Duration::from_secs(5400)
        );
        assert_eq!(
            parse_duration("PT2M5S").expect("PT2M5S"),
            Duration::from_secs(125)
        );
        assert_eq!(
            parse_duration("0.5s").expect("0.5s"),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn garbage_is_a_config_error() {
        for raw in ["", "fast", "5x", "m", "PT", "1m1h", "1.5h", "-3s"] {
            let err = parse_duration(raw).expect_err(raw);
            assert!(matches!(err, ProviderError::Config(_)), "{raw}");
        }
    }
}

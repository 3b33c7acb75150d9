//! Human time string parsing and rendering.
//!
//! Accepts a bare number of seconds, `MM:SS[.mmm]`, or `HH:MM:SS[.mmm]`.
//! `format_time` is the exact inverse rendering and is also used to build
//! deterministic clip filenames from a time range.

use crate::error::{MakerError, MakerResult};

/// Parse a time string to seconds.
///
/// A plain float is tried first, then the colon-delimited forms by counting
/// parts. Anything else (including malformed numeric sub-parts or negative
/// components) is `InvalidTimeFormat`.
pub fn parse_time(text: &str) -> MakerResult<f64> {
    let text = text.trim();

    if let Ok(seconds) = text.parse::<f64>() {
        if seconds.is_finite() && seconds >= 0.0 {
            return Ok(seconds);
        }
        return Err(MakerError::InvalidTimeFormat(text.to_string()));
    }

    let parts: Vec<&str> = text.split(':').collect();
    match parts.len() {
        2 => {
            let minutes = parse_part(parts[0], text)?;
            let seconds = parse_part(parts[1], text)?;
            Ok(minutes * 60.0 + seconds)
        }
        3 => {
            let hours = parse_part(parts[0], text)?;
            let minutes = parse_part(parts[1], text)?;
            let seconds = parse_part(parts[2], text)?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => Err(MakerError::InvalidTimeFormat(text.to_string())),
    }
}

fn parse_part(part: &str, whole: &str) -> MakerResult<f64> {
    let value: f64 = part
        .parse()
        .map_err(|_| MakerError::InvalidTimeFormat(whole.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(MakerError::InvalidTimeFormat(whole.to_string()));
    }
    Ok(value)
}

/// Parse a start/end pair. A zero-length range is invalid.
pub fn parse_range(start_text: &str, end_text: &str) -> MakerResult<(f64, f64)> {
    let start = parse_time(start_text)?;
    let end = parse_time(end_text)?;

    if start >= end {
        return Err(MakerError::TimeRange { start, end });
    }

    Ok((start, end))
}

/// Render seconds as `HH:MM:SS.mmm` with zero padding and 3 decimals.
pub fn format_time(seconds: f64) -> String {
    // Round to millisecond first so 59.9996 carries into the next minute
    // instead of rendering as "60.000".
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) as f64 / 1000.0;

    format!("{:02}:{:02}:{:06.3}", hours, minutes, secs)
}

/// `format_time` with `:` replaced for filesystem use.
pub fn format_time_for_filename(seconds: f64) -> String {
    format_time(seconds).replace(':', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_seconds() {
        assert_eq!(parse_time("83.5").unwrap(), 83.5);
        assert_eq!(parse_time("0").unwrap(), 0.0);
        assert_eq!(parse_time("  90  ").unwrap(), 90.0);
    }

    #[test]
    fn test_parse_mm_ss() {
        assert_eq!(parse_time("1:23.5").unwrap(), 83.5);
        assert_eq!(parse_time("05:30").unwrap(), 330.0);
    }

    #[test]
    fn test_parse_hh_mm_ss() {
        assert_eq!(parse_time("00:01:23.500").unwrap(), 83.5);
        assert_eq!(parse_time("01:30:45").unwrap(), 5445.0);
        assert_eq!(parse_time("01:00:00").unwrap(), 3600.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_time("abc"),
            Err(MakerError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            parse_time("1:2:3:4"),
            Err(MakerError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            parse_time("1:xx"),
            Err(MakerError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            parse_time("-5"),
            Err(MakerError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            parse_time(""),
            Err(MakerError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("5", "10").unwrap(), (5.0, 10.0));

        assert!(matches!(
            parse_range("10", "5"),
            Err(MakerError::TimeRange { .. })
        ));
        // Zero-length range is rejected too.
        assert!(matches!(
            parse_range("10", "10"),
            Err(MakerError::TimeRange { .. })
        ));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(83.5), "00:01:23.500");
        assert_eq!(format_time(0.0), "00:00:00.000");
        assert_eq!(format_time(3661.25), "01:01:01.250");
    }

    #[test]
    fn test_format_time_carries_millisecond_rounding() {
        assert_eq!(format_time(59.9996), "00:01:00.000");
    }

    #[test]
    fn test_round_trip() {
        for x in [0.0, 0.001, 83.5, 3599.999, 86400.0, 12345.678] {
            let rendered = format_time(x);
            let parsed = parse_time(&rendered).unwrap();
            assert!(
                (parsed - x).abs() < 0.0005,
                "round trip of {} via {} gave {}",
                x,
                rendered,
                parsed
            );
        }
    }

    #[test]
    fn test_all_forms_agree() {
        for t in ["83.5", "1:23.5", "00:01:23.500"] {
            assert_eq!(parse_time(t).unwrap(), 83.5, "form {}", t);
        }
    }

    #[test]
    fn test_filename_form_has_no_colons() {
        assert_eq!(format_time_for_filename(83.5), "00-01-23.500");
    }
}

use crate::error::{PipelineError, Result};

/// Canonicalizes a raw zip cell into its digit-string key form.
///
/// Spreadsheet exports leave two kinds of noise in the zip column: numeric
/// cells come through as "10001.0", and long-form entries carry a ZIP+4
/// suffix ("10001-1234"). Truncate at the first decimal point, keep only
/// what precedes the first hyphen, then cast through an integer to strip
/// surrounding whitespace and formatting.
///
/// The integer cast also drops leading zeros ("07001" becomes "7001"). That
/// matches the behavior existing cleaned snapshots were produced with, and
/// no zip in the supported NYC universe starts with a zero.
pub fn normalize(raw: &str) -> Result<String> {
    let cleaned = raw
        .split('.')
        .next()
        .unwrap_or("")
        .split('-')
        .next()
        .unwrap_or("")
        .trim();

    cleaned
        .parse::<u32>()
        .map(|n| n.to_string())
        .map_err(|_| PipelineError::InvalidZip(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_forms() {
        for raw in ["10001", "10001.0", "10001-1234", "10001.0-5555"] {
            assert_eq!(normalize(raw).unwrap(), "10001", "raw form: {raw}");
        }
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize(" 11215 ").unwrap(), "11215");
    }

    #[test]
    fn test_normalize_drops_leading_zero() {
        // Known quirk of the integer cast, kept for snapshot compatibility.
        assert_eq!(normalize("07001").unwrap(), "7001");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("11370.0-2201").unwrap();
        assert_eq!(normalize(&once).unwrap(), once);
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        for raw in ["", "   ", "n/a", "-1234", ".5"] {
            assert!(
                matches!(normalize(raw), Err(PipelineError::InvalidZip(_))),
                "raw form: {raw:?}"
            );
        }
    }
}

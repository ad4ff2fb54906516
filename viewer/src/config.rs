use pfxview_pkcs12::DEFAULT_MAX_ITERATIONS;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_EXPIRING_SOON_DAYS: i64 = 30;
const DEFAULT_FINGERPRINT_SEPARATOR: &str = ":";

/// Knobs for a parse. Every field has a default, so a host can pass `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Upper bound, in days, of the `ExpiringSoon` band.
    pub expiring_soon_days: i64,
    /// Ceiling on PBKDF2, PKCS#12 KDF and MAC iteration counts.
    pub max_kdf_iterations: u32,
    /// Separator for the colon-formatted thumbprint and serial number.
    pub fingerprint_separator: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
            max_kdf_iterations: DEFAULT_MAX_ITERATIONS,
            fingerprint_separator: DEFAULT_FINGERPRINT_SEPARATOR.to_string(),
        }
    }
}

impl ParseOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::Error;

    #[rstest(input, expected,
        case("{}", ParseOptions::default()),
        case(
            r#"{"expiring_soon_days": 14}"#,
            ParseOptions { expiring_soon_days: 14, ..Default::default() }
        ),
        case(
            r#"{"max_kdf_iterations": 4096, "fingerprint_separator": " "}"#,
            ParseOptions {
                max_kdf_iterations: 4096,
                fingerprint_separator: " ".to_string(),
                ..Default::default()
            }
        ),
    )]
    fn test_from_json(input: &str, expected: ParseOptions) {
        assert_eq!(expected, ParseOptions::from_json(input).unwrap());
    }

    #[rstest]
    #[case::not_json("expiring_soon_days = 14")]
    #[case::wrong_type(r#"{"expiring_soon_days": "soon"}"#)]
    #[case::negative_iterations(r#"{"max_kdf_iterations": -1}"#)]
    fn test_from_json_invalid(#[case] input: &str) {
        assert!(matches!(
            ParseOptions::from_json(input),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(30, options.expiring_soon_days);
        assert_eq!(10_000_000, options.max_kdf_iterations);
        assert_eq!(":", options.fingerprint_separator);
    }
}

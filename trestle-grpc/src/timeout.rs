//! Codec for the compact `grpc-timeout` token.
//!
//! A token is `<decimal digits><unit>` with unit one of `H`, `M`, `S`, `m`,
//! `u`, `n` (hour, minute, second, milli, micro, nano), e.g. `"100m"` for
//! 100 milliseconds.

use std::{num::ParseIntError, time::Duration};

use faststr::FastStr;
use thiserror::Error;

const SECONDS_HOUR: u64 = 60 * 60;
const SECONDS_MINUTE: u64 = 60;

const NANOS_MICRO: u128 = 1_000;
const NANOS_MILLI: u128 = 1_000_000;
const NANOS_SECOND: u128 = 1_000_000_000;
const NANOS_MINUTE: u128 = 60 * NANOS_SECOND;
const NANOS_HOUR: u128 = 60 * NANOS_MINUTE;

/// Error returned by [`decode`], carrying the offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTimeout {
    #[error("timeout token {0:?} is too short")]
    TooShort(FastStr),
    #[error("unrecognized timeout unit in {0:?}")]
    UnrecognizedUnit(FastStr),
    #[error("invalid timeout value in {0:?}: {1}")]
    Value(FastStr, #[source] ParseIntError),
}

/// Decodes a timeout token into a duration.
///
/// Fails if the token is shorter than two characters, if the digit prefix
/// does not parse as an unsigned 64-bit integer, or if the final character
/// is not one of the six units. Hour and minute values large enough to
/// overflow saturate instead of wrapping.
pub fn decode(token: &str) -> Result<Duration, InvalidTimeout> {
    if token.len() < 2 {
        return Err(InvalidTimeout::TooShort(FastStr::new(token)));
    }
    if !token.is_char_boundary(token.len() - 1) {
        // a multi-byte final character cannot be one of the six units
        return Err(InvalidTimeout::UnrecognizedUnit(FastStr::new(token)));
    }

    let (value, unit) = token.split_at(token.len() - 1);
    let value = value
        .parse::<u64>()
        .map_err(|e| InvalidTimeout::Value(FastStr::new(token), e))?;

    let duration = match unit {
        "H" => Duration::from_secs(value.saturating_mul(SECONDS_HOUR)),
        "M" => Duration::from_secs(value.saturating_mul(SECONDS_MINUTE)),
        "S" => Duration::from_secs(value),
        "m" => Duration::from_millis(value),
        "u" => Duration::from_micros(value),
        "n" => Duration::from_nanos(value),
        _ => return Err(InvalidTimeout::UnrecognizedUnit(FastStr::new(token))),
    };
    Ok(duration)
}

/// Encodes a duration as a timeout token, choosing the coarsest unit that
/// represents it exactly, so `decode(encode(d)) == d` whenever the value
/// fits 64 bits in that unit.
pub fn encode(duration: Duration) -> FastStr {
    const UNITS: &[(u128, char)] = &[
        (NANOS_HOUR, 'H'),
        (NANOS_MINUTE, 'M'),
        (NANOS_SECOND, 'S'),
        (NANOS_MILLI, 'm'),
        (NANOS_MICRO, 'u'),
    ];

    let nanos = duration.as_nanos();
    for &(scale, unit) in UNITS {
        if nanos % scale == 0 {
            return FastStr::from(format!("{}{}", nanos / scale, unit));
        }
    }
    FastStr::from(format!("{nanos}n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours() {
        assert_eq!(decode("3H").unwrap(), Duration::from_secs(3 * 60 * 60));
    }

    #[test]
    fn test_minutes() {
        assert_eq!(decode("1M").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_seconds() {
        assert_eq!(decode("42S").unwrap(), Duration::from_secs(42));
    }

    #[test]
    fn test_milliseconds() {
        assert_eq!(decode("13m").unwrap(), Duration::from_millis(13));
    }

    #[test]
    fn test_microseconds() {
        assert_eq!(decode("2u").unwrap(), Duration::from_micros(2));
    }

    #[test]
    fn test_nanoseconds() {
        assert_eq!(decode("82n").unwrap(), Duration::from_nanos(82));
    }

    #[test]
    fn test_zero_is_valid() {
        assert_eq!(decode("0S").unwrap(), Duration::ZERO);
        assert_eq!(decode("0n").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_corner_cases() {
        assert!(matches!(decode(""), Err(InvalidTimeout::TooShort(_))));
        assert!(matches!(decode("5"), Err(InvalidTimeout::TooShort(_))));
        assert!(matches!(decode("H"), Err(InvalidTimeout::TooShort(_))));

        // error postfix
        assert!(matches!(
            decode("82f"),
            Err(InvalidTimeout::UnrecognizedUnit(_))
        ));
        assert!(matches!(
            decode("5X"),
            Err(InvalidTimeout::UnrecognizedUnit(_))
        ));
        // error digit
        assert!(matches!(decode("abcH"), Err(InvalidTimeout::Value(..))));
        assert!(matches!(decode("abcS"), Err(InvalidTimeout::Value(..))));
        // sign and whitespace are not digits
        assert!(matches!(decode("-5S"), Err(InvalidTimeout::Value(..))));
        assert!(matches!(decode(" 5S"), Err(InvalidTimeout::Value(..))));
        // multi-byte trailing character
        assert!(matches!(
            decode("5é"),
            Err(InvalidTimeout::UnrecognizedUnit(_))
        ));
    }

    #[test]
    fn test_large_values_saturate() {
        let max = u64::MAX.to_string();
        assert_eq!(
            decode(&format!("{max}H")).unwrap(),
            Duration::from_secs(u64::MAX)
        );
        assert_eq!(
            decode(&format!("{max}M")).unwrap(),
            Duration::from_secs(u64::MAX)
        );
        // one digit too many for u64
        assert!(matches!(
            decode(&format!("{max}0S")),
            Err(InvalidTimeout::Value(..))
        ));
    }

    #[test]
    fn test_encode_picks_coarsest_unit() {
        assert_eq!(encode(Duration::from_secs(2 * 60 * 60)).as_str(), "2H");
        assert_eq!(encode(Duration::from_secs(90)).as_str(), "90S");
        assert_eq!(encode(Duration::from_secs(120)).as_str(), "2M");
        assert_eq!(encode(Duration::from_millis(500)).as_str(), "500m");
        assert_eq!(encode(Duration::from_micros(1500)).as_str(), "1500u");
        assert_eq!(encode(Duration::from_nanos(10)).as_str(), "10n");
        assert_eq!(encode(Duration::ZERO).as_str(), "0H");
    }

    #[test]
    fn test_round_trip() {
        for d in [
            Duration::from_nanos(1),
            Duration::from_micros(7),
            Duration::from_millis(100),
            Duration::from_secs(42),
            Duration::from_secs(61),
            Duration::from_secs(3 * 60 * 60),
        ] {
            assert_eq!(decode(&encode(d)).unwrap(), d);
        }
    }
}

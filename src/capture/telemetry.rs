//! Numeric extraction from the source's free-form telemetry strings.

use once_cell::sync::Lazy;
use regex::Regex;

static SPEED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static ALTITUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[.,]?\d*").unwrap());

/// First run of digits, e.g. `"SPEED: 1234 KM/H"` -> `"1234"`.
pub fn parse_speed(raw: &str) -> String {
    first_match(&SPEED_RE, raw)
}

/// First run of digits with an optional `.` or `,` fraction,
/// e.g. `"ALTITUDE: 12.5 KM"` -> `"12.5"`.
pub fn parse_altitude(raw: &str) -> String {
    first_match(&ALTITUDE_RE, raw)
}

fn first_match(re: &Regex, raw: &str) -> String {
    re.find(raw).map(|m| m.as_str().to_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_takes_first_integer_run() {
        assert_eq!(parse_speed("SPEED: 1234 KM/H"), "1234");
        assert_eq!(parse_speed("SPEED: 12.9 KM/H"), "12");
        assert_eq!(parse_speed("v=7, then 99"), "7");
    }

    #[test]
    fn altitude_keeps_fraction() {
        assert_eq!(parse_altitude("ALTITUDE: 12.5 KM"), "12.5");
        assert_eq!(parse_altitude("ALTITUDE: 3,75 KM"), "3,75");
        assert_eq!(parse_altitude("ALTITUDE: 70 KM"), "70");
        assert_eq!(parse_altitude("ALTITUDE: 70. KM"), "70.");
    }

    #[test]
    fn no_digits_is_empty() {
        assert_eq!(parse_speed(""), "");
        assert_eq!(parse_speed("SPEED: -- KM/H"), "");
        assert_eq!(parse_altitude("ALTITUDE: n/a"), "");
    }
}

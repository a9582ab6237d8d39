use std::{
    num::ParseFloatError,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::models::readout::Readout;

/// Number of whitespace separated tokens in a well formed line.
pub const TOKENS_PER_LINE: usize = 8;

/// Field names in the order they appear on a line.
const NUMERIC_FIELDS: [&str; 6] = [
    "humidity_one",
    "temperature_one",
    "humidity_two",
    "temperature_two",
    "humidity_three",
    "temperature_three",
];

/// Sticky vibration flag shared between the line parser and whoever
/// observes its readouts. Once latched it stays set until released.
#[derive(Debug, Clone, Default)]
pub struct VibrationLatch {
    latched: Arc<AtomicBool>,
}

impl VibrationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latch(&self) {
        self.latched.store(true, Ordering::SeqCst);
    }

    pub fn is_latched(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }

    /// Clear the latch, returning whether it was set.
    pub fn release(&self) -> bool {
        self.latched.swap(false, Ordering::SeqCst)
    }
}

#[derive(Error, Debug)]
pub enum LineParseError {
    /// A numeric position held something that isn't a float.
    #[error("Failed to parse {field} from token '{token}'.")]
    InvalidNumber {
        field: &'static str,
        token: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Decodes lines of the form
/// `h1 t1 h2 t2 h3 t3 vibration relay`
/// into readouts, latching any vibration it sees.
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    latch: VibrationLatch,
}

impl LineParser {
    pub fn new(latch: VibrationLatch) -> Self {
        Self { latch }
    }

    pub fn latch(&self) -> &VibrationLatch {
        &self.latch
    }

    /// Parse one raw line.
    /// Returns `Ok(None)` for empty lines and lines without exactly
    /// `TOKENS_PER_LINE` tokens; the caller keeps its previous state.
    /// Returns an error if a numeric token fails to parse.
    pub fn parse_line(&self, line: &[u8]) -> Result<Option<Readout>, LineParseError> {
        // The board intermittently emits blank lines.
        if line.is_empty() {
            trace!("Empty line.");
            return Ok(None);
        }

        let text = String::from_utf8_lossy(line);
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() != TOKENS_PER_LINE {
            debug!(
                "Discarding line with {} tokens, expected {}.",
                tokens.len(),
                TOKENS_PER_LINE
            );
            return Ok(None);
        }

        let mut numbers = [0f64; NUMERIC_FIELDS.len()];
        for (i, (field, token)) in NUMERIC_FIELDS.iter().zip(&tokens).enumerate() {
            numbers[i] = token
                .parse::<f64>()
                .map_err(|source| LineParseError::InvalidNumber {
                    field: *field,
                    token: token.to_string(),
                    source,
                })?;
        }

        let raw_vibration = tokens[6] == "1";
        if raw_vibration {
            self.latch.latch();
        }

        Ok(Some(Readout {
            humidity_one: numbers[0],
            temperature_one: numbers[1],
            humidity_two: numbers[2],
            temperature_two: numbers[3],
            humidity_three: numbers[4],
            temperature_three: numbers[5],
            has_vibration: self.latch.is_latched() || raw_vibration,
            is_relay_activated: tokens[7] == "1",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fields_in_position_order() {
        let parser = LineParser::default();
        let readout = parser
            .parse_line(b"50.1 25.0 52.3 25.4 53.0 27.1 1 0\r\n")
            .unwrap()
            .unwrap();

        assert_eq!(
            readout,
            Readout {
                humidity_one: 50.1,
                temperature_one: 25.0,
                humidity_two: 52.3,
                temperature_two: 25.4,
                humidity_three: 53.0,
                temperature_three: 27.1,
                has_vibration: true,
                is_relay_activated: false,
            }
        );
    }

    #[test]
    fn test_keeps_full_float_precision() {
        let parser = LineParser::default();
        let readout = parser
            .parse_line(b"50.1 1e300 0.1 -4e-300 53.0 27.1 0 0")
            .unwrap()
            .unwrap();
        assert_eq!(readout.humidity_one, 50.1f64);
        assert_eq!(readout.temperature_one, 1e300);
        assert!(readout.temperature_one.is_finite());
        assert_eq!(readout.humidity_two, 0.1f64);
        assert_eq!(readout.temperature_two, -4e-300);
    }

    #[test]
    fn test_only_exact_one_is_true() {
        let parser = LineParser::default();
        let readout = parser
            .parse_line(b"1 2 3 4 5 6 true 1")
            .unwrap()
            .unwrap();
        assert!(!readout.has_vibration);
        assert!(readout.is_relay_activated);
    }

    #[test]
    fn test_empty_line_is_no_readout() {
        let parser = LineParser::default();
        assert!(parser.parse_line(b"").unwrap().is_none());
        assert!(parser.parse_line(b"\n").unwrap().is_none());
    }

    #[test]
    fn test_wrong_token_count_is_no_readout() {
        let parser = LineParser::default();
        assert!(parser
            .parse_line(b"50.1 25.0 52.3 25.4 53.0 27.1 1")
            .unwrap()
            .is_none());
        assert!(parser
            .parse_line(b"50.1 25.0 52.3 25.4 53.0 27.1 1 0 9")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_rejected_line_does_not_latch() {
        let parser = LineParser::default();
        assert!(parser.parse_line(b"1 1 1 1 1 1 1").unwrap().is_none());
        assert!(!parser.latch().is_latched());
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let parser = LineParser::default();
        let err = parser
            .parse_line(b"50.1 hot 52.3 25.4 53.0 27.1 0 0")
            .unwrap_err();
        match err {
            LineParseError::InvalidNumber { field, token, .. } => {
                assert_eq!(field, "temperature_one");
                assert_eq!(token, "hot");
            }
        }
    }

    #[test]
    fn test_vibration_stays_latched_until_released() {
        let parser = LineParser::default();

        let first = parser.parse_line(b"1 1 1 1 1 1 1 0").unwrap().unwrap();
        assert!(first.has_vibration);

        for _ in 0..3 {
            let quiet = parser.parse_line(b"1 1 1 1 1 1 0 0").unwrap().unwrap();
            assert!(quiet.has_vibration);
        }

        assert!(parser.latch().release());

        let after = parser.parse_line(b"1 1 1 1 1 1 0 0").unwrap().unwrap();
        assert!(!after.has_vibration);
        assert!(!parser.latch().release());
    }
}

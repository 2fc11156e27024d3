use std::str::FromStr;

use crate::Error;

/// Frequency of A4, the reference every other pitch is measured against.
pub const REFERENCE_FREQ: f64 = 440.0;
const REFERENCE_OCTAVE: i32 = 4;
const REFERENCE_SEMITONE: i32 = 9;

/// A parsed pitch such as `C#5` or `Bb3`.
///
/// `semitone` is the offset from C within the octave after the accidental is
/// applied, so `Cb4` has a semitone of -1 and `B#4` one of 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    pub semitone: i32,
    pub octave: u8,
}

impl Pitch {
    /// Semitones above (or below) A4.
    pub fn distance_from_reference(&self) -> i32 {
        (self.octave as i32 - REFERENCE_OCTAVE) * 12 + (self.semitone - REFERENCE_SEMITONE)
    }

    pub fn frequency(&self) -> f64 {
        REFERENCE_FREQ * 2.0_f64.powf(self.distance_from_reference() as f64 / 12.0)
    }
}

impl FromStr for Pitch {
    type Err = Error;

    /// Accepts exactly `[A-G][#b]?[0-9]{1,2}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPitch(s.to_string());
        let bytes = s.as_bytes();

        let base = match bytes.first() {
            Some(b'C') => 0,
            Some(b'D') => 2,
            Some(b'E') => 4,
            Some(b'F') => 5,
            Some(b'G') => 7,
            Some(b'A') => 9,
            Some(b'B') => 11,
            _ => return Err(invalid()),
        };

        let (semitone, digits) = match bytes.get(1) {
            Some(b'#') => (base + 1, &bytes[2..]),
            Some(b'b') => (base - 1, &bytes[2..]),
            _ => (base, &bytes[1..]),
        };

        if digits.is_empty() || digits.len() > 2 || !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let octave = digits.iter().fold(0u8, |acc, d| acc * 10 + (d - b'0'));

        Ok(Pitch { semitone, octave })
    }
}

/// Resolve pitch notation to a frequency in Hz.
///
/// Returns `None` for anything outside the notation grammar. Callers treat
/// that as "no sound for this event".
pub fn resolve(notation: &str) -> Option<f64> {
    notation.parse::<Pitch>().ok().map(|pitch| pitch.frequency())
}

//! Note names: converts "C4", "Eb4", "F#3" to equal-tempered frequencies.

use thiserror::Error;

/// Errors raised when a string is not a playable note name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("invalid note '{0}': expected a name like C4, F#5 or Bb3")]
    Malformed(String),
    #[error("invalid note '{0}': unknown pitch class")]
    UnknownPitchClass(String),
    #[error("invalid note '{0}': octave out of range")]
    OctaveOutOfRange(String),
}

/// Highest octave accepted; keeps frequencies finite and audible-ish.
const MAX_OCTAVE: i32 = 10;

/// Semitone offset from C for each supported spelling.
///
/// Enharmonic spellings (C#/Db, ...) resolve to the same semitone. Spellings
/// outside this table (E#, Fb, B#, Cb) are rejected.
fn pitch_class_offset(pitch: &str) -> Option<i32> {
    let offset = match pitch {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    Some(offset)
}

/// Split a note name into pitch class and octave.
///
/// Format: `<letter A-G><optional # or b><octave digits>`.
fn split_note(name: &str) -> Result<(&str, &str), NoteError> {
    let malformed = || NoteError::Malformed(name.to_string());

    let mut chars = name.char_indices();
    match chars.next() {
        Some((_, 'A'..='G')) => {}
        _ => return Err(malformed()),
    }

    let mut split = 1;
    if let Some((_, '#' | 'b')) = chars.next() {
        split = 2;
    }

    let (pitch, octave) = name.split_at(split);
    if octave.is_empty() || !octave.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    Ok((pitch, octave))
}

/// Absolute semitone index of a note name (C4 = 60, A4 = 69).
pub fn semitone_index(name: &str) -> Result<i32, NoteError> {
    let (pitch, octave) = split_note(name)?;
    let offset =
        pitch_class_offset(pitch).ok_or_else(|| NoteError::UnknownPitchClass(name.to_string()))?;
    let octave: i32 = octave
        .parse()
        .ok()
        .filter(|o| *o <= MAX_OCTAVE)
        .ok_or_else(|| NoteError::OctaveOutOfRange(name.to_string()))?;

    Ok((octave + 1) * 12 + offset)
}

/// Frequency in Hz of a note name, rounded to two decimals.
///
/// Standard tuning: A4 = 440 Hz, 12-tone equal temperament.
pub fn frequency(name: &str) -> Result<f64, NoteError> {
    let semitone = semitone_index(name)?;
    let hz = 440.0 * 2.0f64.powf((semitone - 69) as f64 / 12.0);
    Ok((hz * 100.0).round() / 100.0)
}

/// Whether `name` has the lexical shape of a note (`[A-G](#|b)?[0-9]+`).
///
/// Shape alone does not make a note playable: `E#4` has the shape but no
/// pitch class, which [`frequency`] reports at playback time.
pub fn has_note_shape(name: &str) -> bool {
    split_note(name).is_ok()
}

/// Whether `name` is a note the frequency table can play.
pub fn is_valid_note(name: &str) -> bool {
    semitone_index(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn a4_is_440() {
        assert_eq!(frequency("A4").unwrap(), 440.0);
    }

    #[test]
    fn middle_c() {
        assert_eq!(semitone_index("C4").unwrap(), 60);
        assert_approx_eq!(frequency("C4").unwrap(), 261.63, 1e-9);
    }

    #[test]
    fn enharmonics_match() {
        assert_eq!(frequency("C#4").unwrap(), frequency("Db4").unwrap());
        assert_eq!(frequency("A#2").unwrap(), frequency("Bb2").unwrap());
        assert_eq!(frequency("F#5").unwrap(), frequency("Gb5").unwrap());
    }

    #[test]
    fn rounded_to_two_decimals() {
        let f = frequency("C2").unwrap();
        assert_approx_eq!(f, 65.41, 1e-9);
        assert_eq!((f * 100.0).round() / 100.0, f);
    }

    #[test]
    fn octave_doubles_frequency() {
        assert_eq!(frequency("A5").unwrap(), 880.0);
        assert_eq!(frequency("A3").unwrap(), 220.0);
    }

    #[test]
    fn monotonic_across_all_spellings() {
        let names = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        let mut last = 0.0;
        for octave in 0..=8 {
            for pitch in names {
                let f = frequency(&format!("{pitch}{octave}")).unwrap();
                assert!(f > last, "{pitch}{octave} = {f} not above {last}");
                last = f;
            }
        }
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "H4", "c4", "C", "C#", "4C", "C4.5", "Cx4", "C-1"] {
            assert!(
                matches!(frequency(bad), Err(NoteError::Malformed(_))),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn rejects_unknown_pitch_class() {
        for bad in ["E#4", "Fb3", "B#2", "Cb5"] {
            assert_eq!(
                frequency(bad),
                Err(NoteError::UnknownPitchClass(bad.to_string()))
            );
            assert!(!is_valid_note(bad));
            assert!(has_note_shape(bad));
        }
    }

    #[test]
    fn rejects_absurd_octave() {
        assert!(matches!(
            frequency("C99"),
            Err(NoteError::OctaveOutOfRange(_))
        ));
    }

    #[test]
    fn error_message_names_the_note() {
        let err = frequency("H2").unwrap_err();
        assert!(err.to_string().contains("H2"));
    }
}

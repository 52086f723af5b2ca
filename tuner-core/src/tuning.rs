//! # Musical Tuning Module
//!
//! Note name conversions for display. A detected frequency is snapped to the
//! nearest note of twelve-tone equal temperament anchored at a configurable
//! concert pitch (A4 = 440 Hz by default).
//!
//! Nothing here influences tuning decisions; the policy works on raw
//! frequencies against the string table.

/// Chromatic scale starting from A, the anchor of the concert pitch.
pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// A musical note with its exact equal-tempered frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Note name with octave (e.g., "A4", "C#3")
    pub name: String,
    /// Signed distance from the concert pitch in semitones
    pub semitone_offset: i32,
    /// Frequency in Hz
    pub frequency: f32,
}

/// Finds the closest note to `freq`.
///
/// The octave number changes at C, hence the `+ 9` shift before the floor
/// division.
///
/// # Returns
/// * `Some(note)` - Closest note and its reference pitch
/// * `None` - `freq` or `concert_pitch` is not a positive finite number
pub fn find_nearest_note(freq: f32, concert_pitch: f32) -> Option<Note> {
    if !(freq.is_finite() && freq > 0.0 && concert_pitch.is_finite() && concert_pitch > 0.0) {
        return None;
    }

    let offset = (12.0 * (freq as f64 / concert_pitch as f64).log2()).round() as i32;
    let name = NOTE_NAMES[offset.rem_euclid(12) as usize];
    let octave = 4 + (offset + 9).div_euclid(12);

    Some(Note {
        name: format!("{name}{octave}"),
        semitone_offset: offset,
        frequency: reference_pitch(offset, concert_pitch),
    })
}

/// Equal-tempered frequency `offset` semitones away from the concert pitch.
pub fn reference_pitch(offset: i32, concert_pitch: f32) -> f32 {
    (concert_pitch as f64 * 2.0_f64.powf(offset as f64 / 12.0)) as f32
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat; 100 cents make a
/// semitone.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_pitch_maps_to_a4() {
        let note = find_nearest_note(440.0, 440.0).unwrap();
        assert_eq!(note.name, "A4");
        assert_eq!(note.semitone_offset, 0);
        assert_eq!(note.frequency, 440.0);
    }

    #[test]
    fn guitar_strings_map_to_expected_notes() {
        let cases = [
            (82.0, "E2"),
            (110.0, "A2"),
            (147.0, "D3"),
            (196.0, "G3"),
            (247.0, "B3"),
            (330.0, "E4"),
            (262.0, "C4"),
            (247.5, "B3"),
        ];
        for (freq, expected) in cases {
            let note = find_nearest_note(freq, 440.0).unwrap();
            assert_eq!(note.name, expected, "frequency {freq}");
        }
    }

    #[test]
    fn octave_boundary_at_c() {
        // B3 is offset -10, C4 is offset -9.
        assert_eq!(find_nearest_note(246.94, 440.0).unwrap().name, "B3");
        assert_eq!(find_nearest_note(261.63, 440.0).unwrap().name, "C4");
    }

    #[test]
    fn reference_pitch_follows_equal_temperament() {
        for freq in [63.0_f32, 82.0, 100.0, 165.0, 333.0, 659.0, 1000.0, 4000.0] {
            let note = find_nearest_note(freq, 440.0).unwrap();
            let expected = 440.0 * 2.0_f32.powf(note.semitone_offset as f32 / 12.0);
            assert!((note.frequency - expected).abs() < 1e-2, "frequency {freq}");
            assert!(calculate_cents_deviation(freq, note.frequency).abs() <= 50.01);
        }
    }

    #[test]
    fn custom_concert_pitch() {
        let note = find_nearest_note(432.0, 432.0).unwrap();
        assert_eq!(note.name, "A4");
        assert_eq!(note.frequency, 432.0);
    }

    #[test]
    fn rejects_non_positive_frequency() {
        assert!(find_nearest_note(0.0, 440.0).is_none());
        assert!(find_nearest_note(-5.0, 440.0).is_none());
        assert!(find_nearest_note(f32::NAN, 440.0).is_none());
    }

    #[test]
    fn cents_are_signed() {
        assert!(calculate_cents_deviation(445.0, 440.0) > 0.0);
        assert!(calculate_cents_deviation(435.0, 440.0) < 0.0);
        assert!((calculate_cents_deviation(880.0, 440.0) - 1200.0).abs() < 1e-3);
    }
}

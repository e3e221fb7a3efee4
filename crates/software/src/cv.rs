//! Pure conversions from MIDI values to 12-bit <abbr name="digital-to-analog converter">DAC</abbr> codes.
//!
//! The pitch output spans five octaves (61 semitones, [`PLAYABLE_NOTES`]) across the full 12-bit range, i.e.
//! 4095 / 60 = 68.25 codes per semitone. That ratio is realized exactly as `273 / 4`, rounding half up, which keeps
//! quantization error within half an LSB per semitone so the analog pitch tracking stays in tune.

use crate::configuration::Attenuation;
use core::ops::RangeInclusive;
use wmidi::{Note, U7};

/// The notes the pitch output can represent directly; anything outside is transposed by octaves until it fits.
pub const PLAYABLE_NOTES: RangeInclusive<Note> = Note::C1..=Note::C6;

/// Largest code a 12-bit DAC accepts.
pub const DAC_MAX: u16 = 0x0FFF;

const SEMITONES_PER_OCTAVE: u8 = 12;

/// Numerator of the per-semitone step; the denominator is 4.
const CODES_PER_SEMITONE_X4: u16 = 273;

/// Number of bits a 7-bit control value is shifted to span the 12-bit DAC range.
const CONTROL_TO_DAC_SHIFT: u32 = 5;

/// Transposes `note` by whole octaves until it lies within [`PLAYABLE_NOTES`]. Pitch class is preserved.
pub fn fold_into_range(note: Note) -> Note {
    let lowest = *PLAYABLE_NOTES.start() as u8;
    let highest = *PLAYABLE_NOTES.end() as u8;

    let mut n = u8::from(note);
    while n > highest {
        n -= SEMITONES_PER_OCTAVE;
    }
    while n < lowest {
        n += SEMITONES_PER_OCTAVE;
    }
    Note::from(U7::from_u8_lossy(n))
}

/// Returns the pitch code for `note`: 0 for C1 through 4095 for C6.
pub fn pitch_to_code(note: Note) -> u16 {
    let nth_key = u16::from(u8::from(fold_into_range(note)) - *PLAYABLE_NOTES.start() as u8);
    let x = nth_key * CODES_PER_SEMITONE_X4;
    // divide by four, then add back the half bit to round half up
    (x >> 2) + ((x >> 1) & 1)
}

/// Returns the modulation code for a 7-bit control `value` after `attenuation`.
///
/// Attenuation is applied to the 7-bit value (rounding toward zero); the result is then shifted onto the 12-bit
/// DAC range, so full scale is 127 << 5 = 4064.
pub fn control_to_code(value: U7, attenuation: Attenuation) -> u16 {
    attenuation.apply(u16::from(u8::from(value))) << CONTROL_TO_DAC_SHIFT
}

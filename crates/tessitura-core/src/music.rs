//! Twelve-tone equal temperament helpers.
//!
//! Pitch is handled on the MIDI semitone axis: A4 = 440 Hz = semitone 69,
//! twelve semitones per octave. Fractional semitones are allowed everywhere.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Reference frequency of A4.
pub const A4_HZ: f32 = 440.0;

/// MIDI note number of A4.
pub const MIDI_A4: i32 = 69;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::Cs,
        NoteName::D,
        NoteName::Ds,
        NoteName::E,
        NoteName::F,
        NoteName::Fs,
        NoteName::G,
        NoteName::Gs,
        NoteName::A,
        NoteName::As,
        NoteName::B,
    ];

    /// Distance in semitones from C of the same octave.
    pub fn index_from_c(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Sharp spelling, e.g. `"C#"`.
    pub fn sharp_name(self) -> &'static str {
        SHARP_NAMES[self as usize]
    }

    /// Flat spelling, e.g. `"Db"`.
    pub fn flat_name(self) -> &'static str {
        FLAT_NAMES[self as usize]
    }
}

/// A pitch class in a specific octave (scientific pitch notation, C4 = middle C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub name: NoteName,
    pub octave: i32,
}

impl Note {
    pub const fn new(name: NoteName, octave: i32) -> Self {
        Self { name, octave }
    }

    /// MIDI semitone number (C4 = 60).
    pub fn semitone(self) -> i32 {
        (self.octave + 1) * 12 + self.name.index_from_c()
    }

    /// Nearest note to a (possibly fractional) semitone.
    pub fn from_semitone(semitone: f32) -> Self {
        let n = semitone.round() as i32;
        Self {
            name: NoteName::from_index(n),
            octave: n.div_euclid(12) - 1,
        }
    }

    /// Frequency in Hz with A4 = 440 Hz.
    pub fn frequency(self) -> f32 {
        frequency(self.name, self.octave, A4_HZ)
    }

    /// C4 D4 E4 F4 G4 A4 B4 C5.
    pub fn c_major_scale() -> Vec<Note> {
        use NoteName::*;
        [C, D, E, F, G, A, B]
            .into_iter()
            .map(|name| Note::new(name, 4))
            .chain(core::iter::once(Note::new(C, 5)))
            .collect()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name.sharp_name(), self.octave)
    }
}

/// Error returned when a note label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid note label: {0:?}")]
pub struct ParseNoteError(pub String);

impl FromStr for Note {
    type Err = ParseNoteError;

    /// Accepts `C4`, `C#4`, `Db4`, `Bb-1`, case-insensitive letter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseNoteError(s.to_string());
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(err)?.to_ascii_uppercase();
        let base = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(err()),
        };
        let rest = chars.as_str();
        let (accidental, octave) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };
        let octave: i32 = octave.parse().map_err(|_| err())?;
        // Cb4 is B3, B#3 is C4
        let semitone = (octave + 1) * 12 + base + accidental;
        Ok(Note::from_semitone(semitone as f32))
    }
}

/// Frequency of `note` in `octave`, tuned so that A4 = `a4` Hz.
pub fn frequency(note: NoteName, octave: i32, a4: f32) -> f32 {
    let n = (octave - 4) * 12 + (note.index_from_c() - NoteName::A.index_from_c());
    a4 * 2.0f32.powf(n as f32 / 12.0)
}

/// `12 * log2(hz / 440) + 69`. Non-positive input maps to negative infinity.
#[inline]
pub fn hz_to_semitone(hz: f32) -> f32 {
    12.0 * (hz / A4_HZ).log2() + MIDI_A4 as f32
}

/// Inverse of [`hz_to_semitone`].
#[inline]
pub fn semitone_to_hz(semitone: f32) -> f32 {
    A4_HZ * 2.0f32.powf((semitone - MIDI_A4 as f32) / 12.0)
}

/// Label of the nearest note, e.g. `"A4"`.
pub fn note_label(semitone: f32) -> String {
    Note::from_semitone(semitone).to_string()
}

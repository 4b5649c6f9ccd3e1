//! Key estimation result types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AccidentalStyle;

/// Number of key classes the model distinguishes (12 major + 12 minor)
pub const NUM_KEYS: usize = 24;

const NOTE_NAMES_UNICODE: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];
const NOTE_NAMES_ASCII: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Map a key distribution index (0-23) to a key
    ///
    /// Indices 0-11 are major keys and use MIDI value `index + 12`; indices
    /// 12-23 are minor keys and use MIDI value `index` directly. The tonic is
    /// the MIDI value's pitch class.
    ///
    /// # Example
    ///
    /// ```
    /// use keyscribe::analysis::result::Key;
    ///
    /// assert_eq!(Key::from_distribution_index(0), Some(Key::Major(0)));   // C
    /// assert_eq!(Key::from_distribution_index(9), Some(Key::Major(9)));   // A
    /// assert_eq!(Key::from_distribution_index(21), Some(Key::Minor(9)));  // Am
    /// assert_eq!(Key::from_distribution_index(24), None);
    /// ```
    pub fn from_distribution_index(index: usize) -> Option<Self> {
        if index >= NUM_KEYS {
            return None;
        }

        let is_minor = index >= 12;
        let midi = if is_minor { index } else { index + 12 };
        let tonic = (midi % 12) as u32;

        Some(if is_minor {
            Key::Minor(tonic)
        } else {
            Key::Major(tonic)
        })
    }

    /// Inverse of [`Key::from_distribution_index`]
    pub fn distribution_index(&self) -> usize {
        match self {
            Key::Major(i) => *i as usize % 12,
            Key::Minor(i) => *i as usize % 12 + 12,
        }
    }

    /// Tonic pitch class (0 = C, ..., 11 = B)
    pub fn tonic(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// Tonic note name without octave (e.g. "C", "F♯")
    pub fn tonic_name(&self, style: AccidentalStyle) -> &'static str {
        let names = match style {
            AccidentalStyle::Unicode => &NOTE_NAMES_UNICODE,
            AccidentalStyle::Ascii => &NOTE_NAMES_ASCII,
        };
        names[self.tonic() as usize]
    }

    /// "Major" or "Minor"
    pub fn mode_name(&self) -> &'static str {
        match self {
            Key::Major(_) => "Major",
            Key::Minor(_) => "Minor",
        }
    }

    /// Human-readable label (e.g. "C Major", "A♯ Minor")
    ///
    /// # Example
    ///
    /// ```
    /// use keyscribe::analysis::result::Key;
    /// use keyscribe::AccidentalStyle;
    ///
    /// assert_eq!(Key::Major(0).label(AccidentalStyle::Unicode), "C Major");
    /// assert_eq!(Key::Minor(1).label(AccidentalStyle::Unicode), "C♯ Minor");
    /// assert_eq!(Key::Minor(1).label(AccidentalStyle::Ascii), "C# Minor");
    /// ```
    pub fn label(&self, style: AccidentalStyle) -> String {
        format!("{} {}", self.tonic_name(style), self.mode_name())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label(AccidentalStyle::Unicode))
    }
}

/// Keys ranked by descending probability
///
/// `keys`, `probabilities` and `indices` are parallel: entry `i` of each
/// describes the `i`-th most likely key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedKeyList {
    /// Key labels (e.g. "C Major")
    pub keys: Vec<String>,

    /// Probabilities, rounded after ranking
    pub probabilities: Vec<f64>,

    /// Key distribution index (0-23) of each entry
    pub indices: Vec<usize>,
}

impl RankedKeyList {
    /// Number of ranked keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no keys were ranked
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Most likely key and its probability
    pub fn top(&self) -> Option<(&str, f64)> {
        self.iter().next()
    }

    /// Iterate over `(label, probability)` pairs in rank order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().copied())
    }
}

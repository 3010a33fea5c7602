/// One of the twelve pitch classes, with its sharp spelling and optional flat spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromaticNote {
    pub sharp: &'static str,
    pub flat: Option<&'static str>,
}

/// The chromatic scale starting at C. Index 11 is the dual B/H pitch class;
/// its stored sharp name is only the fallback, see [`preferred_name`].
pub const CHROMATIC: [ChromaticNote; 12] = [
    ChromaticNote { sharp: "C", flat: None },
    ChromaticNote { sharp: "C#", flat: Some("Db") },
    ChromaticNote { sharp: "D", flat: None },
    ChromaticNote { sharp: "D#", flat: Some("Eb") },
    ChromaticNote { sharp: "E", flat: None },
    ChromaticNote { sharp: "F", flat: None },
    ChromaticNote { sharp: "F#", flat: Some("Gb") },
    ChromaticNote { sharp: "G", flat: None },
    ChromaticNote { sharp: "G#", flat: Some("Ab") },
    ChromaticNote { sharp: "A", flat: None },
    ChromaticNote { sharp: "A#", flat: Some("Bb") },
    ChromaticNote { sharp: "B", flat: None },
];

/// Index of the pitch class spelled "B" (standard) or "H" (German/Slavic).
pub const B_H_INDEX: usize = 11;

/// Spellings outside the main table that still resolve to a pitch class.
const RARE_SPELLINGS: &[(&str, usize)] = &[
    ("H", 11),
    ("Cb", 11),
    ("Fb", 4),
    ("E#", 5),
    ("B#", 0),
    ("H#", 0),
    ("Hb", 10),
];

const FLAT_KEYS: &[&str] = &[
    "F", "Bb", "Eb", "Ab", "Db", "Gb", "Cb",
    "Dm", "Gm", "Cm", "Fm", "Bbm", "Ebm", "Abm",
];

const SHARP_KEYS: &[&str] = &[
    "G", "D", "A", "E", "B", "H", "F#", "C#",
    "Em", "Bm", "Hm", "F#m", "C#m", "G#m", "D#m", "A#m",
];

/// Naming convention for pitch class 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteNaming {
    /// "B" is the natural note a semitone below C.
    Standard,
    /// "H" is the natural note; "B" would mean B-flat.
    German,
}

impl NoteNaming {
    /// Convention signalled by a key name's first letter, if any.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().chars().next() {
            Some('H') => Some(Self::German),
            Some('B') => Some(Self::Standard),
            _ => None,
        }
    }

    pub fn b_h_name(self) -> &'static str {
        match self {
            Self::Standard => "B",
            Self::German => "H",
        }
    }
}

/// Accidental preference of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPreference {
    Flats,
    Sharps,
    /// No accidental signal (C, Am, unknown keys). Spelled with sharps.
    Natural,
}

impl KeyPreference {
    pub fn of(key: &str) -> Self {
        let key = normalize_accidentals(key.trim());
        if key.is_empty() {
            return Self::Natural;
        }
        if FLAT_KEYS.contains(&key.as_str()) {
            return Self::Flats;
        }
        if SHARP_KEYS.contains(&key.as_str()) {
            return Self::Sharps;
        }
        // Past the root letter a "b" is a flat marker and "#" a sharp marker
        let tail: String = key.chars().skip(1).collect();
        if tail.starts_with('b') {
            Self::Flats
        } else if tail.starts_with('#') {
            Self::Sharps
        } else {
            Self::Natural
        }
    }

    pub fn use_flats(self) -> bool {
        self == Self::Flats
    }
}

/// Replace Unicode sharp/flat signs with their ASCII forms.
pub fn normalize_accidentals(name: &str) -> String {
    name.replace('♯', "#").replace('♭', "b")
}

/// Pitch class index of a note name ("C#", "Db", "H", ...).
pub fn index_of(name: &str) -> Option<usize> {
    let name = normalize_accidentals(name.trim());
    if let Some(idx) = CHROMATIC
        .iter()
        .position(|n| n.sharp == name || n.flat == Some(name.as_str()))
    {
        return Some(idx);
    }
    RARE_SPELLINGS
        .iter()
        .find(|(spelling, _)| *spelling == name)
        .map(|(_, idx)| *idx)
}

/// Resolve the root pitch class of a key name. The key may carry a quality
/// suffix ("Am", "F#m", "Hmoll", "Ebmaj").
pub fn parse_key(key: &str) -> Option<usize> {
    let key = normalize_accidentals(key.trim());
    let mut chars = key.chars();
    let letter = chars.next()?;
    if !('A'..='H').contains(&letter) {
        return None;
    }
    let root = match chars.next() {
        Some(acc @ ('#' | 'b')) => format!("{letter}{acc}"),
        _ => letter.to_string(),
    };
    index_of(&root)
}

/// Spell pitch class `index` for output.
///
/// Pitch class 11 follows a strict priority: the target key's naming
/// convention, then the chord's original spelling ("H..." stays "H"),
/// then "B". All other classes use the flat name when `use_flats` is set
/// and one exists.
pub fn preferred_name(
    index: usize,
    use_flats: bool,
    original_spelling: Option<&str>,
    naming: Option<NoteNaming>,
) -> &'static str {
    let index = index % 12;
    if index == B_H_INDEX {
        if let Some(naming) = naming {
            return naming.b_h_name();
        }
        return match original_spelling {
            Some(s) if s.starts_with('H') => "H",
            _ => "B",
        };
    }
    let note = &CHROMATIC[index];
    match note.flat {
        Some(flat) if use_flats => flat,
        _ => note.sharp,
    }
}

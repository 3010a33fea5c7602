pub mod chord;
pub mod notes;

pub use chord::{find_chords, is_chord_line, Chord, ChordError};
pub use notes::{KeyPreference, NoteNaming};

/// Semitone offset from `original_key` to `target_key`, in [-11, 11].
///
/// Keys may carry a quality ("Am", "F#m"). Returns 0 when either key is
/// empty or unresolvable.
pub fn semitone_offset(original_key: &str, target_key: &str) -> i32 {
    if original_key.trim().is_empty() || target_key.trim().is_empty() {
        return 0;
    }
    match (notes::parse_key(original_key), notes::parse_key(target_key)) {
        (Some(from), Some(to)) => to as i32 - from as i32,
        _ => {
            log::warn!(
                "Invalid key(s) for transposition: {} -> {}. Using 0 shift.",
                original_key,
                target_key
            );
            0
        }
    }
}

/// Transposition settings derived from an offset and a target key name.
#[derive(Debug, Clone, Copy)]
pub struct Transposer {
    /// Offset normalized into [0, 11].
    offset: usize,
    preference: KeyPreference,
    naming: Option<NoteNaming>,
}

impl Transposer {
    pub fn new(offset: i32, target_key: &str) -> Self {
        Self {
            offset: offset.rem_euclid(12) as usize,
            preference: KeyPreference::of(target_key),
            naming: NoteNaming::from_key(target_key),
        }
    }

    /// Transpose a single chord symbol. Malformed chords and unknown roots
    /// come back unchanged.
    pub fn chord(&self, chord: &str) -> String {
        match Chord::parse(chord) {
            Ok(parsed) => {
                parsed.transposed(self.offset, self.preference.use_flats(), self.naming)
            }
            Err(e) => {
                log::debug!("Leaving chord as written: {}", e);
                chord.to_string()
            }
        }
    }

    /// Whether chords in `text` are spelled against the target key's
    /// convention, so a zero offset still has to rewrite them.
    pub fn needs_respelling(&self, text: &str) -> bool {
        let mut spellings = Vec::new();
        for m in find_chords(text) {
            // Unicode accidentals are always rewritten to ASCII
            if m.as_str().contains(['♯', '♭']) {
                return true;
            }
            if let Ok(chord) = Chord::parse(m.as_str()) {
                spellings.push(chord.root);
                spellings.extend(chord.bass);
            }
        }

        spellings.iter().any(|s| {
            let has_sharp = s.contains('#');
            let has_flat = s.len() > 1 && s[1..].starts_with('b');
            match (self.preference, self.naming) {
                (KeyPreference::Flats, _) if has_sharp => true,
                (KeyPreference::Sharps, _) if has_flat => true,
                (_, Some(NoteNaming::German)) => s == "B",
                (_, Some(NoteNaming::Standard)) => s.starts_with('H'),
                _ => false,
            }
        })
    }

    /// Transpose every chord in `lyrics`, keeping the line structure.
    pub fn text(&self, lyrics: &str) -> String {
        if lyrics.is_empty() {
            return String::new();
        }
        if self.offset == 0 && !self.needs_respelling(lyrics) {
            return lyrics.to_string();
        }

        let mut out = String::with_capacity(lyrics.len());
        let mut last = 0;
        for m in find_chords(lyrics) {
            out.push_str(&lyrics[last..m.start()]);
            out.push_str(&self.chord(m.as_str()));
            last = m.end();
        }
        out.push_str(&lyrics[last..]);
        out
    }
}

/// Transpose one chord by `offset` semitones, spelled for `target_key`.
pub fn transpose_chord(chord: &str, offset: i32, target_key: &str) -> String {
    Transposer::new(offset, target_key).chord(chord)
}

/// Transpose all chords in a chord sheet by `offset` semitones, spelled for
/// `target_key`.
///
/// A zero offset is a no-op unless the sheet's accidentals or B/H naming
/// disagree with the target key, in which case chords are re-spelled.
pub fn transpose_text(lyrics: &str, offset: i32, target_key: &str) -> String {
    Transposer::new(offset, target_key).text(lyrics)
}

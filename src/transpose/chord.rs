use regex::{Match, Regex};
use std::sync::LazyLock;
use thiserror::Error;

use super::notes::{self, NoteNaming};

/// Chord quality suffixes, longest first. Several are suffixes of each other
/// ("m7"/"7", "sus4"/"7sus4"), so the tokenizer alternation depends on this
/// order.
pub const SUFFIXES: &[&str] = &[
    "7sus4", "maj7", "maj9", "dim7", "aug7", "add9", "sus4", "sus2", "m11",
    "dim", "aug", "sus", "m7", "m9", "11", "13", "m", "7", "6", "9",
];

#[derive(Error, Debug, PartialEq)]
pub enum ChordError {
    #[error("malformed chord (more than one '/'): {0}")]
    Malformed(String),
    #[error("unknown chord root: {0}")]
    UnknownRoot(String),
    #[error("unknown chord quality: {0}")]
    UnknownQuality(String),
}

/// Accidentals accepted after a root letter.
const ACCIDENTALS: &str = "#b♯♭";

// Extension tail after the quality: "2", "b5", "#9", "add2", "sus".
const TAIL: &str = r"(?:\d+|[#b♯♭+\-]\d+|add\d+|sus\d?)*";

// Chord-shaped substring: root, accidental, optional quality and extension
// tail, optional bass. The end of a match is checked separately in
// `find_chords` (no lookahead).
static CHORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let suffixes = SUFFIXES.join("|");
    Regex::new(&format!(
        r"\b[A-H][{ACCIDENTALS}]?(?:{suffixes})?{TAIL}(?:[ \t]*/[ \t]*[A-H][{ACCIDENTALS}]?)?"
    ))
    .unwrap()
});

// Everything after the root must be a known quality plus an extension tail.
static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let suffixes = SUFFIXES.join("|");
    Regex::new(&format!(r"^(?:{suffixes})?{TAIL}$")).unwrap()
});

// A single whitespace-separated token of a chord line. Looser than CHORD_RE
// on qualities ("maj", "min", arbitrary extensions).
static LINE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^[A-H][{ACCIDENTALS}]?(?:maj|min|m|dim|aug|sus[24]?|add)?\d{{0,2}}(?:sus[24]?|add\d{{1,2}})?(?:[#b♯♭+\-]\d{{1,2}})*(?:/[A-H][{ACCIDENTALS}]?)?$"
    ))
    .unwrap()
});

static SLASH_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*/\s*").unwrap());

/// Most whitespace-separated tokens a chord line may have.
pub const MAX_CHORD_LINE_TOKENS: usize = 6;

/// Find chord-shaped substrings in `text`.
///
/// A candidate must start at a word boundary and must not run straight into
/// a letter, digit, `_` or accidental, so "Amazing" does not yield "Am".
/// Extension tails ("G2", "Bm7b5", "E7#9") belong to the chord.
pub fn find_chords(text: &str) -> Vec<Match<'_>> {
    CHORD_RE
        .find_iter(text)
        .filter(|m| {
            text[m.end()..]
                .chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || ACCIDENTALS.contains(c)))
        })
        .collect()
}

/// True when every token on the line is a chord (at most six tokens).
pub fn is_chord_line(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    !tokens.is_empty()
        && tokens.len() <= MAX_CHORD_LINE_TOKENS
        && tokens.iter().all(|t| LINE_TOKEN_RE.is_match(t))
}

/// A parsed chord symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    /// Root with ASCII accidentals ("C#", "Bb", "H").
    pub root: String,
    pub root_index: usize,
    /// Quality and extension tail, carried through unchanged ("m7b5").
    pub suffix: String,
    /// Bass note as written; may not resolve to a pitch class.
    pub bass: Option<String>,
}

impl Chord {
    pub fn parse(text: &str) -> Result<Self, ChordError> {
        let cleaned = SLASH_SPACING_RE.replace_all(text.trim(), "/");
        let mut parts = cleaned.split('/');
        let base = parts.next().unwrap_or_default();
        let bass = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(ChordError::Malformed(text.to_string()));
        }

        let base = notes::normalize_accidentals(base);
        let root_len = match base.as_bytes() {
            [b'A'..=b'H', b'#' | b'b', ..] => 2,
            [b'A'..=b'H', ..] => 1,
            _ => return Err(ChordError::UnknownRoot(text.to_string())),
        };
        let (root, suffix) = base.split_at(root_len);
        let root_index =
            notes::index_of(root).ok_or_else(|| ChordError::UnknownRoot(text.to_string()))?;
        if !QUALITY_RE.is_match(suffix) {
            return Err(ChordError::UnknownQuality(text.to_string()));
        }

        Ok(Chord {
            root: root.to_string(),
            root_index,
            suffix: suffix.to_string(),
            bass: bass.map(|b| notes::normalize_accidentals(&b)),
        })
    }

    /// Spell this chord `offset` semitones higher. An unresolvable bass note
    /// is kept as written while the root still moves.
    pub fn transposed(&self, offset: usize, use_flats: bool, naming: Option<NoteNaming>) -> String {
        let index = (self.root_index + offset) % 12;
        let mut out = String::from(notes::preferred_name(
            index,
            use_flats,
            Some(&self.root),
            naming,
        ));
        out.push_str(&self.suffix);

        if let Some(bass) = &self.bass {
            out.push('/');
            match notes::index_of(bass) {
                Some(bass_index) => out.push_str(notes::preferred_name(
                    (bass_index + offset) % 12,
                    use_flats,
                    Some(bass),
                    naming,
                )),
                None => out.push_str(bass),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(text: &str) -> Vec<&str> {
        find_chords(text).iter().map(|m| m.as_str()).collect()
    }

    #[test]
    fn finds_simple_chords() {
        assert_eq!(found("C G Am F"), vec!["C", "G", "Am", "F"]);
        assert_eq!(found("  Cmaj7   Dm7  G7sus4"), vec!["Cmaj7", "Dm7", "G7sus4"]);
    }

    #[test]
    fn finds_slash_chords_with_spacing() {
        assert_eq!(found("G/B  C / E"), vec!["G/B", "C / E"]);
    }

    #[test]
    fn longest_quality_wins() {
        assert_eq!(found("Cdim7 Cm11 C13 Csus4"), vec!["Cdim7", "Cm11", "C13", "Csus4"]);
    }

    #[test]
    fn extension_tails_stay_with_the_chord() {
        assert_eq!(found("G2  C5  Cm6"), vec!["G2", "C5", "Cm6"]);
        assert_eq!(found("Bm7b5 E7#9 Cadd2"), vec!["Bm7b5", "E7#9", "Cadd2"]);
        assert_eq!(found("Csus G6/B"), vec!["Csus", "G6/B"]);
    }

    #[test]
    fn unicode_accidentals() {
        assert_eq!(found("F♯m  B♭  C/E♭"), vec!["F♯m", "B♭", "C/E♭"]);
        let c = Chord::parse("F♯m/C♯").unwrap();
        assert_eq!(c.root, "F#");
        assert_eq!(c.root_index, 6);
        assert_eq!(c.bass.as_deref(), Some("C#"));
        assert!(is_chord_line("F♯m  B♭"));
    }

    #[test]
    fn prose_is_not_chords() {
        assert!(found("Amazing grace how sweet").is_empty());
        assert!(found("Bless the Lord").is_empty());
        assert!(found("Славлю Бога я всегда").is_empty());
        assert!(found("Ebony").is_empty());
    }

    #[test]
    fn chords_next_to_punctuation() {
        assert_eq!(found("(Am) F, G."), vec!["Am", "F", "G"]);
    }

    #[test]
    fn chord_line_detection() {
        assert!(is_chord_line("C Am F G"));
        assert!(is_chord_line("  Am7   Dm/F  G7sus4 "));
        assert!(is_chord_line("Hm"));
        assert!(!is_chord_line(""));
        assert!(!is_chord_line("Chorus"));
        assert!(!is_chord_line("C G Am F C G Am"));
        assert!(!is_chord_line("C and G"));
        assert!(is_chord_line("G2 Bm7b5 E7#9"));
    }

    #[test]
    fn parse_splits_root_suffix_bass() {
        let c = Chord::parse("F#m7/C#").unwrap();
        assert_eq!(c.root, "F#");
        assert_eq!(c.root_index, 6);
        assert_eq!(c.suffix, "m7");
        assert_eq!(c.bass.as_deref(), Some("C#"));
    }

    #[test]
    fn parse_prefers_longest_suffix() {
        assert_eq!(Chord::parse("Cdim7").unwrap().suffix, "dim7");
        assert_eq!(Chord::parse("G7sus4").unwrap().suffix, "7sus4");
        assert_eq!(Chord::parse("Amaj7").unwrap().suffix, "maj7");
        assert_eq!(Chord::parse("Bbm").unwrap().root, "Bb");
    }

    #[test]
    fn parse_rejects_double_slash() {
        assert_eq!(
            Chord::parse("C/G/E"),
            Err(ChordError::Malformed("C/G/E".to_string()))
        );
    }

    #[test]
    fn parse_rejects_unknown_root() {
        assert!(matches!(Chord::parse("Xm"), Err(ChordError::UnknownRoot(_))));
    }

    #[test]
    fn parse_rejects_unknown_quality() {
        assert!(matches!(Chord::parse("Cfoo"), Err(ChordError::UnknownQuality(_))));
    }

    #[test]
    fn transposed_carries_extension_tail() {
        assert_eq!(Chord::parse("Bm7b5").unwrap().transposed(2, false, None), "C#m7b5");
        assert_eq!(Chord::parse("E7#9").unwrap().transposed(2, false, None), "F#7#9");
        assert_eq!(Chord::parse("G2").unwrap().transposed(2, false, None), "A2");
    }

    #[test]
    fn transposed_keeps_unknown_bass() {
        let c = Chord::parse("C/X").unwrap();
        assert_eq!(c.transposed(2, false, None), "D/X");
    }
}

use regex::Regex;
use std::sync::LazyLock;

use crate::transpose::find_chords;

/// Opening marker wrapped around each highlighted chord.
pub const CHORD_OPEN: &str = r#"<span class="chord">"#;
/// Closing marker for a highlighted chord.
pub const CHORD_CLOSE: &str = "</span>";

// Already-highlighted chords first, then any other markup tag. A tag must
// open with a name, so a stray "<" in lyrics is plain text.
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="chord">[^<]*</span>|</?[A-Za-z][^<>]*>"#).unwrap()
});

static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

static CYRILLIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Cyrillic}").unwrap());

/// Wrap every chord in `lyrics` in the chord marker.
///
/// Markup tags and chords that are already wrapped are copied through, so
/// highlighting twice gives the same result as highlighting once.
pub fn highlight_chords(lyrics: &str) -> String {
    if lyrics.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(lyrics.len() + lyrics.len() / 2);
    let mut last = 0;
    for tag in MARKUP_RE.find_iter(lyrics) {
        wrap_chords(&lyrics[last..tag.start()], &mut out);
        out.push_str(tag.as_str());
        last = tag.end();
    }
    wrap_chords(&lyrics[last..], &mut out);
    out
}

fn wrap_chords(text: &str, out: &mut String) {
    let mut last = 0;
    for m in find_chords(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str(CHORD_OPEN);
        out.push_str(m.as_str());
        out.push_str(CHORD_CLOSE);
        last = m.end();
    }
    out.push_str(&text[last..]);
}

/// Halve (rounding up) every run of two or more spaces on chord lines.
///
/// A line qualifies when it has a run of 2+ spaces, at least one chord and no
/// Cyrillic letters. Lyric lines pass through untouched.
pub fn compact_chord_spacing(lyrics: &str) -> String {
    lyrics
        .split('\n')
        .map(|line| {
            if line.contains("  ")
                && !find_chords(line).is_empty()
                && !CYRILLIC_RE.is_match(line)
            {
                SPACE_RUN_RE
                    .replace_all(line, |caps: &regex::Captures| {
                        " ".repeat(caps[0].len().div_ceil(2).max(1))
                    })
                    .into_owned()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_wraps_each_chord() {
        assert_eq!(
            highlight_chords("Am  F"),
            r#"<span class="chord">Am</span>  <span class="chord">F</span>"#
        );
    }

    #[test]
    fn highlight_leaves_prose() {
        let text = "Amazing grace how sweet the sound";
        assert_eq!(highlight_chords(text), text);
    }

    #[test]
    fn highlight_is_idempotent() {
        let text = "C   G/B\nAmazing grace\nAm  F  C";
        let once = highlight_chords(text);
        assert!(once.contains(CHORD_OPEN));
        assert_eq!(highlight_chords(&once), once);
    }

    #[test]
    fn highlight_skips_markup() {
        let markup = r#"<fieldset class="song-block" data-type="verse">
<legend class="song-block-legend" title="Confidence: 95% (explicit)">Verse 1</legend>
<div class="song-block-content">G  D</div>
</fieldset>"#;
        let out = highlight_chords(markup);
        assert!(out.contains(r#"title="Confidence: 95% (explicit)""#));
        assert!(out.contains(r#"<span class="chord">G</span>  <span class="chord">D</span>"#));
        assert_eq!(out.matches(CHORD_OPEN).count(), 2);
    }

    #[test]
    fn highlight_extended_chords() {
        assert_eq!(
            highlight_chords("G2 D"),
            r#"<span class="chord">G2</span> <span class="chord">D</span>"#
        );
        assert_eq!(highlight_chords("Bm7b5").matches(CHORD_OPEN).count(), 1);
    }

    #[test]
    fn stray_angle_brackets_are_not_markup() {
        assert_eq!(
            highlight_chords("C < G > Am"),
            r#"<span class="chord">C</span> < <span class="chord">G</span> > <span class="chord">Am</span>"#
        );
        let text = "C <\nG\nAm > F";
        assert_eq!(highlight_chords(text).matches(CHORD_OPEN).count(), 4);
    }

    #[test]
    fn highlight_empty() {
        assert_eq!(highlight_chords(""), "");
    }

    #[test]
    fn compact_halves_space_runs_on_chord_lines() {
        assert_eq!(compact_chord_spacing("C    G     Am  F"), "C  G   Am F");
    }

    #[test]
    fn compact_leaves_lyric_lines() {
        let text = "Am      F\nСлавлю  Бога\nsing  along";
        assert_eq!(compact_chord_spacing(text), "Am   F\nСлавлю  Бога\nsing  along");
    }

    #[test]
    fn compact_skips_lines_with_cyrillic_and_chords() {
        let text = "Am    F   припев";
        assert_eq!(compact_chord_spacing(text), text);
    }

    #[test]
    fn compact_keeps_single_spaces() {
        assert_eq!(compact_chord_spacing("C G Am F"), "C G Am F");
    }
}

//! Header-line classification.
//!
//! Each [`Rule`] inspects a line and may propose a block type with a
//! confidence. Rules run in a fixed order and the highest confidence wins;
//! on a tie the earlier rule keeps its result.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::BlockType;
use crate::learning::LearningStore;
use crate::transpose::is_chord_line;

/// Results above this confidence are recorded in the learning store.
pub const LEARN_THRESHOLD: f64 = 0.7;

const EXPLICIT_CONFIDENCE: f64 = 0.95;
const VARIATION_CONFIDENCE: f64 = 0.9;
const BRACKET_CONFIDENCE: f64 = 0.7;
const CORRECTION_CONFIDENCE: f64 = 1.0;

/// Longest line (in characters) that can still be a header.
const MAX_HEADER_CHARS: usize = 40;
const MAX_HEADER_WORDS: usize = 6;
const MAX_BRACKET_CHARS: usize = 20;
/// Variations shorter than this are matched as abbreviations.
const MAX_VARIATION_CHARS: usize = 4;

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Explicit,
    Variation,
    ExtendedPattern,
    StructuralBracketed,
    UserCorrection,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Variation => "variation",
            Self::ExtendedPattern => "extended_pattern",
            Self::StructuralBracketed => "structural_bracketed",
            Self::UserCorrection => "user_correction",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub block_type: BlockType,
    pub confidence: f64,
    pub method: Method,
    /// The dictionary term, pattern match or corrected label behind the result.
    pub term: String,
}

/// A line together with its neighbours.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub line: &'a str,
    pub index: usize,
    pub prev: &'a [&'a str],
    pub next: &'a [&'a str],
    /// Number of blocks closed before this line.
    pub block_index: usize,
}

/// Classification strategies, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// A label the user assigned to this exact line.
    UserCorrection,
    /// Dictionary terms, abbreviations and repeat/variant templates.
    ExplicitTerms,
    /// Short lines wrapped in brackets or quotes.
    StructuralBracket,
    /// Reserved; disabled because it produced false headers.
    Semantic,
    /// Reserved; disabled because it produced false headers.
    MusicalPattern,
}

pub const RULES: &[Rule] = &[
    Rule::UserCorrection,
    Rule::ExplicitTerms,
    Rule::StructuralBracket,
    Rule::Semantic,
    Rule::MusicalPattern,
];

impl Rule {
    pub fn apply(&self, ctx: &LineContext<'_>, store: &LearningStore) -> Option<ClassificationResult> {
        let trimmed = ctx.line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match self {
            Self::UserCorrection => detect_correction(trimmed, store),
            Self::ExplicitTerms => detect_explicit(trimmed),
            Self::StructuralBracket => detect_bracketed(trimmed),
            Self::Semantic | Self::MusicalPattern => None,
        }
    }
}

/// Run every rule on the line and keep the most confident result.
///
/// Results above [`LEARN_THRESHOLD`] are recorded in `store`.
pub fn detect(ctx: &LineContext<'_>, store: &mut LearningStore) -> Option<ClassificationResult> {
    let mut best: Option<ClassificationResult> = None;
    for rule in RULES {
        if let Some(result) = rule.apply(ctx, store) {
            keep_best(&mut best, result);
        }
    }

    if let Some(result) = &best {
        log::trace!(
            "line {} (block {}, {} before / {} after): {:?}",
            ctx.index,
            ctx.block_index,
            ctx.prev.len(),
            ctx.next.len(),
            result
        );
        if result.confidence > LEARN_THRESHOLD {
            store.observe(ctx.line, result);
        }
    }
    best
}

/// Replace `best` only on a strictly higher confidence.
fn keep_best(best: &mut Option<ClassificationResult>, candidate: ClassificationResult) {
    if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
        *best = Some(candidate);
    }
}

fn detect_correction(trimmed: &str, store: &LearningStore) -> Option<ClassificationResult> {
    if is_chord_line(trimmed) {
        return None;
    }
    store.correction_for(trimmed).map(|c| ClassificationResult {
        block_type: c.block_type,
        confidence: CORRECTION_CONFIDENCE,
        method: Method::UserCorrection,
        term: c.label.clone(),
    })
}

// --- Explicit terms ---

struct TermSet {
    block_type: BlockType,
    primary: &'static [&'static str],
    variations: &'static [&'static str],
}

/// Header vocabulary (Russian, English, abbreviations). Declaration order
/// decides ties.
const DICTIONARY: &[TermSet] = &[
    TermSet {
        block_type: BlockType::Verse,
        primary: &["куплет", "verse", "строфа", "запев", "строка"],
        variations: &["к", "v", "стих", "куп"],
    },
    TermSet {
        block_type: BlockType::Chorus,
        primary: &["припев", "chorus", "рефрен", "хор", "хорус"],
        variations: &["пр", "п", "c", "ch"],
    },
    TermSet {
        block_type: BlockType::Bridge,
        primary: &["бридж", "bridge", "мостик", "мост", "переход", "связка"],
        variations: &["бр", "b", "br"],
    },
    TermSet {
        block_type: BlockType::Intro,
        primary: &["интро", "intro", "вступление", "начало", "открытие", "вставка"],
        variations: &["ин", "i", "вст"],
    },
    TermSet {
        block_type: BlockType::Outro,
        primary: &["аутро", "outro", "окончание", "финал", "концовка", "завершение"],
        variations: &["ау", "o", "out"],
    },
    TermSet {
        block_type: BlockType::Solo,
        primary: &["соло", "solo", "инструментал", "проигрыш", "инстр"],
        variations: &["с", "s"],
    },
    TermSet {
        block_type: BlockType::PreChorus,
        primary: &["предприпев", "pre-chorus", "прехорус", "подготовка", "пред припев", "пред-припев"],
        variations: &["пред", "pre"],
    },
    TermSet {
        block_type: BlockType::Tag,
        primary: &["тег", "tag", "кода", "повтор", "эхо"],
        variations: &["т", "повт"],
    },
    TermSet {
        block_type: BlockType::Interlude,
        primary: &["интерлюдия", "interlude", "пауза", "промежуток"],
        variations: &["инт", "inter"],
    },
];

struct CompiledTerms {
    block_type: BlockType,
    primary: Vec<(&'static str, Regex)>,
    variations: Vec<(&'static str, Regex)>,
}

/// Whole-line match: optional leading number, the term, optional number,
/// optional trailing colon or period.
fn term_regex(term: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)^(\d+\s*)?({})(\s*\d*)?\s*[:.]?\s*$",
        regex::escape(term)
    ))
    .unwrap()
}

static COMPILED_DICTIONARY: LazyLock<Vec<CompiledTerms>> = LazyLock::new(|| {
    DICTIONARY
        .iter()
        .map(|set| CompiledTerms {
            block_type: set.block_type,
            primary: set.primary.iter().map(|t| (*t, term_regex(t))).collect(),
            variations: set
                .variations
                .iter()
                .filter(|v| v.chars().count() < MAX_VARIATION_CHARS)
                .map(|v| (*v, term_regex(v)))
                .collect(),
        })
        .collect()
});

const MARKERS: &str = r"припев|chorus|мост|bridge|куплет|verse|бридж|соло|solo|интро|intro|аутро|outro|вставка|предприпев|pre-chorus|пред\s*припев|пред-припев";

const MARKERS_GENITIVE: &str = r"моста|bridge|припева|chorus|куплета|verse|бриджа|соло|solo|интро|intro|аутро|outro|вставки|предприпева|pre-chorus";

// Repeat/variant templates, tried in this order. Each names its marker group.
static EXTENDED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Припев x2:", "Куплет2: x2"
        format!(r"(?i)^(?P<marker>{MARKERS})(\d+)?\s*[:.]?\s*[xх×]\s*(\d+)\s*[:.]?\s*$"),
        // "Припев (повтор)", "Chorus (repeat)"
        format!(r"(?i)^(?P<marker>{MARKERS})(\d+)?\s*\(\s*(повтор|repeat|снова|again)\s*\)\s*[:.]?\s*$"),
        // "1 Мост: x2", "2 Verse"
        format!(r"(?i)^(\d+)\s+(?P<marker>{MARKERS})\s*[:.]?\s*[xх×]?\s*(\d+)?\s*[:.]?\s*$"),
        // "Припев 2 вариант"
        format!(r"(?i)^(\d+\s*)?(?P<marker>{MARKERS})\s+(\d+\s*)?(вариант|variant)\s*[:.]?\s*$"),
        // "2 вариант моста:"
        format!(r"(?i)^(\d+\s*)?(вариант|variant)\s+(?P<marker>{MARKERS_GENITIVE})\s*[:.]?\s*$"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// Punctuation followed by another word: an ordinary sentence.
static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;!?]\s+\w").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[\[\("].*[\]\)"]$"#).unwrap());

/// Block type named by a marker word from the extended templates.
fn marker_type(marker: &str) -> Option<BlockType> {
    let base = WHITESPACE_RE.replace_all(&marker.to_lowercase(), " ").into_owned();
    match base.as_str() {
        "припев" | "припева" | "chorus" => Some(BlockType::Chorus),
        "мост" | "моста" | "bridge" | "бридж" | "бриджа" => Some(BlockType::Bridge),
        "куплет" | "куплета" | "verse" => Some(BlockType::Verse),
        "соло" | "solo" => Some(BlockType::Solo),
        "интро" | "intro" | "вставка" | "вставки" => Some(BlockType::Intro),
        "аутро" | "outro" => Some(BlockType::Outro),
        "предприпев" | "предприпева" | "pre-chorus" | "пред припев" | "пред-припев" => {
            Some(BlockType::PreChorus)
        }
        _ => None,
    }
}

/// Could this line be a header at all? Rejects chord lines, long lines and
/// sentences.
fn header_shaped(trimmed: &str) -> bool {
    !is_chord_line(trimmed)
        && trimmed.chars().count() <= MAX_HEADER_CHARS
        && trimmed.split_whitespace().count() <= MAX_HEADER_WORDS
        && !SENTENCE_RE.is_match(trimmed)
}

fn detect_explicit(trimmed: &str) -> Option<ClassificationResult> {
    if !header_shaped(trimmed) {
        return None;
    }

    let mut best: Option<ClassificationResult> = None;

    for re in EXTENDED_PATTERNS.iter() {
        let Some(caps) = re.captures(trimmed) else {
            continue;
        };
        if let Some(block_type) = caps.name("marker").and_then(|m| marker_type(m.as_str())) {
            keep_best(&mut best, ClassificationResult {
                block_type,
                confidence: EXPLICIT_CONFIDENCE,
                method: Method::ExtendedPattern,
                term: caps[0].to_string(),
            });
        }
    }

    // Plain dictionary only when no template matched
    if best.is_none() {
        for set in COMPILED_DICTIONARY.iter() {
            for (term, re) in &set.primary {
                if re.is_match(trimmed) {
                    keep_best(&mut best, ClassificationResult {
                        block_type: set.block_type,
                        confidence: EXPLICIT_CONFIDENCE,
                        method: Method::Explicit,
                        term: term.to_string(),
                    });
                }
            }
            for (variation, re) in &set.variations {
                if re.is_match(trimmed) {
                    keep_best(&mut best, ClassificationResult {
                        block_type: set.block_type,
                        confidence: VARIATION_CONFIDENCE,
                        method: Method::Variation,
                        term: variation.to_string(),
                    });
                }
            }
        }
    }

    best
}

fn detect_bracketed(trimmed: &str) -> Option<ClassificationResult> {
    if is_chord_line(trimmed)
        || trimmed.chars().count() >= MAX_BRACKET_CHARS
        || !BRACKETED_RE.is_match(trimmed)
    {
        return None;
    }
    Some(ClassificationResult {
        block_type: BlockType::Unknown,
        confidence: BRACKET_CONFIDENCE,
        method: Method::StructuralBracketed,
        term: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Option<ClassificationResult> {
        let mut store = LearningStore::default();
        classify_with(line, &mut store)
    }

    fn classify_with(line: &str, store: &mut LearningStore) -> Option<ClassificationResult> {
        let lines = [line];
        let ctx = LineContext {
            line,
            index: 0,
            prev: &[],
            next: &lines[1..],
            block_index: 0,
        };
        detect(&ctx, store)
    }

    #[test]
    fn primary_terms() {
        let r = classify("Припев").unwrap();
        assert_eq!(r.block_type, BlockType::Chorus);
        assert_eq!(r.confidence, EXPLICIT_CONFIDENCE);
        assert_eq!(r.method, Method::Explicit);

        assert_eq!(classify("Verse 2:").unwrap().block_type, BlockType::Verse);
        assert_eq!(classify("2 куплет").unwrap().block_type, BlockType::Verse);
        assert_eq!(classify("PRE-CHORUS").unwrap().block_type, BlockType::PreChorus);
        assert_eq!(classify("Интерлюдия").unwrap().block_type, BlockType::Interlude);
        assert_eq!(classify("Кода.").unwrap().block_type, BlockType::Tag);
    }

    #[test]
    fn abbreviations_score_below_header_threshold() {
        let r = classify("Пр").unwrap();
        assert_eq!(r.block_type, BlockType::Chorus);
        assert_eq!(r.confidence, VARIATION_CONFIDENCE);
        assert_eq!(r.method, Method::Variation);
        assert_eq!(classify("V1").unwrap().confidence, VARIATION_CONFIDENCE);
    }

    #[test]
    fn long_variations_are_ignored() {
        assert!(classify("стих").is_none());
        assert!(classify("inter").is_none());
    }

    #[test]
    fn extended_templates() {
        let cases = [
            ("Припев x2:", BlockType::Chorus),
            ("Вставка х2", BlockType::Intro),
            ("Куплет2: x3", BlockType::Verse),
            ("Бридж (повтор)", BlockType::Bridge),
            ("1 Мост: x2", BlockType::Bridge),
            ("Chorus 2 variant", BlockType::Chorus),
            ("2 вариант припева:", BlockType::Chorus),
            ("пред припев ×2", BlockType::PreChorus),
        ];
        for (line, expected) in cases {
            let r = classify(line).unwrap_or_else(|| panic!("no match for {line}"));
            assert_eq!(r.block_type, expected, "{line}");
            assert_eq!(r.method, Method::ExtendedPattern, "{line}");
            assert_eq!(r.confidence, EXPLICIT_CONFIDENCE);
        }
    }

    #[test]
    fn chord_lines_are_never_headers() {
        assert!(classify("C Am F G").is_none());
        assert!(classify("C").is_none());
        assert!(classify("B").is_none());
        assert!(classify("H7").is_none());
    }

    #[test]
    fn sentences_are_not_headers() {
        assert!(classify("Holy, holy, holy").is_none());
        assert!(classify("Припев, который мы поём").is_none());
        assert!(classify("Verse of a very long line that keeps going on and on").is_none());
    }

    #[test]
    fn bracketed_lines_are_weak_boundaries() {
        let r = classify("[ПРИПЕВ]").unwrap();
        assert_eq!(r.block_type, BlockType::Unknown);
        assert_eq!(r.confidence, BRACKET_CONFIDENCE);
        assert_eq!(r.method, Method::StructuralBracketed);
        assert!(classify("(a much longer bracketed aside)").is_none());
    }

    #[test]
    fn latin_and_cyrillic_abbreviations_differ() {
        // "c" is a chorus abbreviation; "с" (Cyrillic) is a solo one
        assert_eq!(classify("c:").unwrap().block_type, BlockType::Chorus);
        assert_eq!(classify("с:").unwrap().block_type, BlockType::Solo);
    }

    #[test]
    fn empty_line_is_unclassified() {
        assert!(classify("").is_none());
        assert!(classify("   ").is_none());
    }

    #[test]
    fn confident_results_are_learned() {
        let mut store = LearningStore::default();
        classify_with("  Припев ", &mut store);
        classify_with("Пр", &mut store);
        classify_with("[x]", &mut store);
        classify_with("Припев x2", &mut store);
        assert_eq!(store.confidence.get("припев"), Some(&EXPLICIT_CONFIDENCE));
        assert_eq!(store.pattern_history.get("припев"), Some(&BlockType::Chorus));
        assert_eq!(store.confidence.get("пр"), Some(&VARIATION_CONFIDENCE));
        assert!(!store.pattern_history.contains_key("пр"));
        assert!(!store.confidence.contains_key("[x]"));
        assert_eq!(store.confidence.get("припев x2"), Some(&EXPLICIT_CONFIDENCE));
        assert!(!store.pattern_history.contains_key("припев x2"));
    }

    #[test]
    fn user_correction_outranks_dictionary() {
        let mut store = LearningStore::default();
        store.record_correction("Припев", BlockType::Bridge, "Bridge");
        let r = classify_with("Припев", &mut store).unwrap();
        assert_eq!(r.block_type, BlockType::Bridge);
        assert_eq!(r.method, Method::UserCorrection);
        assert_eq!(r.term, "Bridge");
    }
}

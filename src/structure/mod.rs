pub mod classify;
pub mod render;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::learning::LearningStore;
use classify::{ClassificationResult, LineContext, Method};

/// A line opens a new block only above this confidence. Abbreviations score
/// 0.9, so on their own they stay lyric content.
pub const HEADER_THRESHOLD: f64 = 0.92;

/// Lines of lookback/lookahead handed to the classifier.
pub const CONTEXT_WINDOW: usize = 3;

/// Structural section of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Verse,
    Chorus,
    Bridge,
    Intro,
    Outro,
    Solo,
    PreChorus,
    Tag,
    Interlude,
    Unknown,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verse => "verse",
            Self::Chorus => "chorus",
            Self::Bridge => "bridge",
            Self::Intro => "intro",
            Self::Outro => "outro",
            Self::Solo => "solo",
            Self::PreChorus => "pre-chorus",
            Self::Tag => "tag",
            Self::Interlude => "interlude",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "verse" => Ok(Self::Verse),
            "chorus" => Ok(Self::Chorus),
            "bridge" => Ok(Self::Bridge),
            "intro" => Ok(Self::Intro),
            "outro" => Ok(Self::Outro),
            "solo" => Ok(Self::Solo),
            "pre-chorus" | "prechorus" | "pre" => Ok(Self::PreChorus),
            "tag" | "coda" => Ok(Self::Tag),
            "interlude" => Ok(Self::Interlude),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown block type: {other}")),
        }
    }
}

/// Language of the labels given to blocks that had no header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelLanguage {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ru")]
    Russian,
}

impl LabelLanguage {
    fn intro(self) -> &'static str {
        match self {
            Self::English => "Intro",
            Self::Russian => "Интро",
        }
    }

    fn outro(self) -> &'static str {
        match self {
            Self::English => "Outro",
            Self::Russian => "Аутро",
        }
    }

    fn chorus(self) -> &'static str {
        match self {
            Self::English => "Chorus",
            Self::Russian => "Припев",
        }
    }

    fn verse(self, n: usize) -> String {
        match self {
            Self::English => format!("Verse {n}"),
            Self::Russian => format!("Куплет {n}"),
        }
    }
}

/// One structural section: its header text and the lines under it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SongBlock {
    pub legend: String,
    pub content: Vec<String>,
    pub block_type: Option<BlockType>,
    pub confidence: f64,
    pub method: Option<Method>,
}

impl SongBlock {
    fn from_header(line: &str, detection: ClassificationResult) -> Self {
        let legend = match detection.method {
            Method::UserCorrection if !detection.term.is_empty() => detection.term,
            _ => line.trim().to_string(),
        };
        Self {
            legend,
            content: Vec::new(),
            block_type: Some(detection.block_type),
            confidence: detection.confidence,
            method: Some(detection.method),
        }
    }

    fn is_empty(&self) -> bool {
        self.legend.is_empty() && self.content.is_empty()
    }
}

/// Split a chord sheet into structural blocks.
///
/// Every line is classified; a line scoring above [`HEADER_THRESHOLD`] closes
/// the open block and starts a new one, anything else is appended to the open
/// block. A block is closed only when it has content; the final block is also
/// kept with just a header. Blocks left without a header are labeled afterwards by position and
/// content. Classifications are recorded in `store`.
pub fn segment_into_blocks(
    lyrics: &str,
    store: &mut LearningStore,
    labels: LabelLanguage,
) -> Vec<SongBlock> {
    if lyrics.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = lyrics.split('\n').collect();
    let mut blocks: Vec<SongBlock> = Vec::new();
    let mut current = SongBlock::default();

    for (i, line) in lines.iter().enumerate() {
        let ctx = LineContext {
            line,
            index: i,
            prev: &lines[i.saturating_sub(CONTEXT_WINDOW)..i],
            next: &lines[i + 1..(i + 1 + CONTEXT_WINDOW).min(lines.len())],
            block_index: blocks.len(),
        };

        match classify::detect(&ctx, store) {
            Some(detection) if detection.confidence > HEADER_THRESHOLD => {
                log::debug!(
                    "Header at line {}: {:?} ({:.2}, {:?})",
                    i + 1,
                    detection.block_type,
                    detection.confidence,
                    detection.method
                );
                // A header directly followed by another header is dropped
                let finished =
                    std::mem::replace(&mut current, SongBlock::from_header(line, detection));
                if !finished.content.is_empty() {
                    blocks.push(finished);
                }
            }
            _ => current.content.push(line.to_string()),
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    label_unheaded_blocks(&mut blocks, labels);
    blocks
}

/// Assign a type and legend to blocks that never got a confident header.
fn label_unheaded_blocks(blocks: &mut [SongBlock], labels: LabelLanguage) {
    let last = blocks.len().saturating_sub(1);
    for (index, block) in blocks.iter_mut().enumerate() {
        if block.block_type.is_some() && block.confidence >= 0.5 {
            continue;
        }

        if index == 0 && block.legend.is_empty() {
            block.block_type = Some(BlockType::Intro);
            block.legend = labels.intro().to_string();
        } else if index == last && block.content.len() < 3 {
            block.block_type = Some(BlockType::Outro);
            if block.legend.is_empty() {
                block.legend = labels.outro().to_string();
            }
        } else if block.legend.is_empty() {
            let text = block.content.join(" ").to_lowercase();
            if text.contains("припев") || text.contains("chorus") {
                block.block_type = Some(BlockType::Chorus);
                block.legend = labels.chorus().to_string();
            } else {
                // Numbered from the block position, not a running verse count
                block.block_type = Some(BlockType::Verse);
                block.legend = labels.verse(index / 2 + 1);
            }
        }
    }
}

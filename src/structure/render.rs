use serde::Serialize;

use super::classify::Method;
use super::{BlockType, SongBlock};

/// Coarse bucket of a block's confidence, used as a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn of(confidence: f64) -> Self {
        if confidence > 0.8 {
            Self::High
        } else if confidence > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Self::High => "high-confidence",
            Self::Medium => "medium-confidence",
            Self::Low => "low-confidence",
        }
    }
}

fn clean_type(block_type: Option<BlockType>) -> String {
    block_type
        .unwrap_or(BlockType::Unknown)
        .as_str()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn clean_method(method: Option<Method>) -> String {
    method
        .map_or("unknown", |m| m.as_str())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn clean_legend(legend: &str) -> String {
    legend
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .collect::<String>()
        .replace("data-", "")
}

/// Markup for a single block.
pub fn block_markup(block: &SongBlock) -> String {
    let tier = ConfidenceTier::of(block.confidence).css_class();
    let block_type = clean_type(block.block_type);
    let content = block.content.join("\n");

    if block.legend.is_empty() {
        return format!(
            "<fieldset class=\"song-block {tier}\" data-type=\"{block_type}\" data-confidence=\"{:.2}\">\n\
             <div class=\"song-block-content\">{content}</div>\n\
             </fieldset>",
            block.confidence
        );
    }

    let method = clean_method(block.method);
    let percent = (block.confidence * 100.0).round() as i64;
    format!(
        "<fieldset class=\"song-block {tier}\" data-type=\"{block_type}\" data-confidence=\"{:.2}\" data-method=\"{method}\">\n\
         <legend class=\"song-block-legend\" title=\"Confidence: {percent}% ({method})\">{}</legend>\n\
         <div class=\"song-block-content\">{content}</div>\n\
         </fieldset>",
        block.confidence,
        clean_legend(&block.legend)
    )
}

/// Markup for a whole song, one fieldset per block.
pub fn to_markup(blocks: &[SongBlock]) -> String {
    blocks.iter().map(block_markup).collect::<Vec<_>>().join("\n")
}

#[derive(Serialize)]
struct BlockRecord<'a> {
    legend: &'a str,
    block_type: BlockType,
    confidence: f64,
    tier: ConfidenceTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<Method>,
    content: &'a [String],
}

/// Blocks as a pretty-printed JSON array.
pub fn to_json(blocks: &[SongBlock]) -> serde_json::Result<String> {
    let records: Vec<BlockRecord<'_>> = blocks
        .iter()
        .map(|b| BlockRecord {
            legend: &b.legend,
            block_type: b.block_type.unwrap_or(BlockType::Unknown),
            confidence: b.confidence,
            tier: ConfidenceTier::of(b.confidence),
            method: b.method,
            content: &b.content,
        })
        .collect();
    serde_json::to_string_pretty(&records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse() -> SongBlock {
        SongBlock {
            legend: "Verse 1".to_string(),
            content: vec!["C  G".to_string(), "words".to_string()],
            block_type: Some(BlockType::Verse),
            confidence: 0.95,
            method: Some(Method::Explicit),
        }
    }

    #[test]
    fn tiers() {
        assert_eq!(ConfidenceTier::of(0.95), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::of(0.8), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::of(0.51), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::of(0.5), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::of(0.0), ConfidenceTier::Low);
    }

    #[test]
    fn block_with_legend() {
        let expected = "<fieldset class=\"song-block high-confidence\" data-type=\"verse\" data-confidence=\"0.95\" data-method=\"explicit\">\n\
<legend class=\"song-block-legend\" title=\"Confidence: 95% (explicit)\">Verse 1</legend>\n\
<div class=\"song-block-content\">C  G\nwords</div>\n\
</fieldset>";
        assert_eq!(block_markup(&verse()), expected);
    }

    #[test]
    fn block_without_legend_omits_method() {
        let block = SongBlock {
            content: vec!["x".to_string()],
            ..Default::default()
        };
        let expected = "<fieldset class=\"song-block low-confidence\" data-type=\"unknown\" data-confidence=\"0.00\">\n\
<div class=\"song-block-content\">x</div>\n\
</fieldset>";
        assert_eq!(block_markup(&block), expected);
    }

    #[test]
    fn attribute_tokens_are_sanitized() {
        let block = SongBlock {
            legend: "<b>\"Pre\" & data-x</b>".to_string(),
            block_type: Some(BlockType::PreChorus),
            confidence: 0.95,
            method: Some(Method::ExtendedPattern),
            ..Default::default()
        };
        let markup = block_markup(&block);
        assert!(markup.contains("data-type=\"prechorus\""));
        assert!(markup.contains("data-method=\"extended_pattern\""));
        assert!(markup.contains(">bPre  x/b</legend>"));
    }

    #[test]
    fn blocks_joined_by_newline() {
        let markup = to_markup(&[verse(), verse()]);
        assert_eq!(markup.matches("<fieldset").count(), 2);
        assert!(markup.contains("</fieldset>\n<fieldset"));
        assert_eq!(to_markup(&[]), "");
    }

    #[test]
    fn json_output() {
        let json = to_json(&[verse()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["legend"], "Verse 1");
        assert_eq!(value[0]["block_type"], "verse");
        assert_eq!(value[0]["tier"], "high");
        assert_eq!(value[0]["method"], "explicit");
        assert_eq!(value[0]["content"][1], "words");
    }
}

//! Keyword search over captured OCR text blocks

use serde::Serialize;

/// A keyword found inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordMatch {
    pub block_index: usize,
    pub block_text: String,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub matches: Vec<KeywordMatch>,
    pub total: usize,
}

/// Case-insensitive substring test
pub fn contains_keyword(block: &str, keyword: &str) -> bool {
    block.to_lowercase().contains(&keyword.to_lowercase())
}

/// Scan every block for every keyword.
///
/// Matches come out block by block, and within a block in keyword order.
pub fn find_matches<B, K>(blocks: &[B], keywords: &[K]) -> MatchReport
where
    B: AsRef<str>,
    K: AsRef<str>,
{
    let mut matches = Vec::new();
    for (block_index, block) in blocks.iter().enumerate() {
        let block = block.as_ref();
        for keyword in keywords {
            let keyword = keyword.as_ref();
            if contains_keyword(block, keyword) {
                tracing::trace!("Block {} contains {:?}", block_index, keyword);
                matches.push(KeywordMatch {
                    block_index,
                    block_text: block.to_string(),
                    keyword: keyword.to_string(),
                });
            }
        }
    }

    let total = matches.len();
    MatchReport { matches, total }
}

/// How many blocks to show around the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSpan {
    pub before: usize,
    /// Exclusive: the window ends `after` blocks past the anchor
    pub after: usize,
}

impl Default for WindowSpan {
    fn default() -> Self {
        Self {
            before: 5,
            after: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    Anchor,
    FollowsAnchor,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowLine {
    pub index: usize,
    pub text: String,
    pub role: LineRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnchorWindow {
    Found {
        anchor_index: usize,
        start: usize,
        end: usize,
        lines: Vec<WindowLine>,
    },
    NotFound {
        anchor: String,
    },
}

impl AnchorWindow {
    pub fn anchor_index(&self) -> Option<usize> {
        match self {
            Self::Found { anchor_index, .. } => Some(*anchor_index),
            Self::NotFound { .. } => None,
        }
    }
}

/// Blocks surrounding the first block equal to `anchor`.
///
/// Blocks are compared with surrounding whitespace trimmed; the comparison
/// itself is exact and case sensitive.
pub fn anchor_window<B: AsRef<str>>(blocks: &[B], anchor: &str, span: WindowSpan) -> AnchorWindow {
    let Some(anchor_index) = blocks
        .iter()
        .position(|block| block.as_ref().trim() == anchor)
    else {
        tracing::debug!("Anchor {:?} not present in {} blocks", anchor, blocks.len());
        return AnchorWindow::NotFound {
            anchor: anchor.to_string(),
        };
    };

    let start = anchor_index.saturating_sub(span.before);
    let end = anchor_index
        .saturating_add(span.after.max(1))
        .min(blocks.len());

    let lines = (start..end)
        .map(|index| WindowLine {
            index,
            text: blocks[index].as_ref().to_string(),
            role: if index == anchor_index {
                LineRole::Anchor
            } else if index == anchor_index + 1 {
                LineRole::FollowsAnchor
            } else {
                LineRole::Context
            },
        })
        .collect();

    AnchorWindow::Found {
        anchor_index,
        start,
        end,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANCHOR: &str = "Educational objective:";

    #[test]
    fn test_contains_keyword_ignores_case() {
        assert!(contains_keyword("Hello World", "hello"));
        assert!(contains_keyword("positive TINEL sign", "Tinel"));
        assert!(!contains_keyword("Hello", "xyz"));
    }

    #[test]
    fn test_find_matches_single_hit() {
        let blocks = ["carpal tunnel syndrome", "unrelated text"];
        let keywords = ["carpal tunnel", "xyz"];

        let report = find_matches(&blocks, &keywords);

        assert_eq!(report.total, 1);
        assert_eq!(
            report.matches,
            vec![KeywordMatch {
                block_index: 0,
                block_text: "carpal tunnel syndrome".to_string(),
                keyword: "carpal tunnel".to_string(),
            }]
        );
    }

    #[test]
    fn test_find_matches_orders_by_block_then_keyword() {
        let blocks = vec![
            "motor weakness during thumb abduction/opposition and thenar".to_string(),
            "Radius".to_string(),
            "radial half of the ring finger".to_string(),
        ];
        let keywords = vec!["opposition", "radial half", "thumb abduction"];

        let report = find_matches(&blocks, &keywords);

        let found: Vec<(usize, &str)> = report
            .matches
            .iter()
            .map(|m| (m.block_index, m.keyword.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![(0, "opposition"), (0, "thumb abduction"), (2, "radial half")]
        );
        assert_eq!(report.total, 3);
    }

    #[test]
    fn test_find_matches_empty_inputs() {
        let none: [&str; 0] = [];
        assert_eq!(find_matches(&none, &["a"]).total, 0);
        assert_eq!(find_matches(&["a"], &none).total, 0);
    }

    #[test]
    fn test_anchor_window_marks_anchor_and_follower() {
        let blocks = ["a", ANCHOR, "b", "c"];

        let window = anchor_window(&blocks, ANCHOR, WindowSpan::default());

        match window {
            AnchorWindow::Found {
                anchor_index,
                start,
                end,
                lines,
            } => {
                assert_eq!(anchor_index, 1);
                assert_eq!((start, end), (0, 4));
                assert_eq!(lines[1].role, LineRole::Anchor);
                assert_eq!(lines[2].index, 2);
                assert_eq!(lines[2].role, LineRole::FollowsAnchor);
                assert_eq!(lines[3].role, LineRole::Context);
            }
            other => panic!("expected a window, got {:?}", other),
        }
    }

    #[test]
    fn test_anchor_window_clamps_to_span() {
        let mut blocks: Vec<String> = (0..40).map(|i| format!("block {}", i)).collect();
        blocks[20] = format!("  {}  ", ANCHOR);

        let window = anchor_window(&blocks, ANCHOR, WindowSpan::default());

        match window {
            AnchorWindow::Found { start, end, lines, .. } => {
                assert_eq!((start, end), (15, 30));
                assert_eq!(lines.len(), 15);
                assert_eq!(lines.first().map(|l| l.index), Some(15));
            }
            other => panic!("expected a window, got {:?}", other),
        }
    }

    #[test]
    fn test_anchor_is_case_sensitive() {
        let blocks = ["educational objective:"];
        let window = anchor_window(&blocks, ANCHOR, WindowSpan::default());
        assert_eq!(window.anchor_index(), None);
    }

    #[test]
    fn test_anchor_not_found() {
        let blocks = ["References", "Subject"];
        let window = anchor_window(&blocks, ANCHOR, WindowSpan::default());
        assert_eq!(
            window,
            AnchorWindow::NotFound {
                anchor: ANCHOR.to_string()
            }
        );
    }
}

//! Block segmentation: splitting template text into prose and code blocks.
//!
//! The segmenter scans the template once, line by line, and records for
//! every code block how many value references appeared in the prose before
//! it. That count is the block's *threshold*: the block may only run once
//! the executor has served more requests than that.
//!
//! ~~~text
//! `a` is {{_ "a"}}, twice {{_ "a"}}.     <- 2 references
//! ```calc                                 <- block #0, threshold 2
//! a = 9
//! ```
//! Now `a` = {{_ "a"}}.                   <- 1 reference (3 in total)
//! ~~~
//!
//! Counting is a textual heuristic: it counts helper invocations of the form
//! `{{_ ...}}` and does not parse the template language. Loops, partials or
//! conditionals that change how often a reference is evaluated are not seen.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::EvalConfig;
use crate::error::{Result, StepwiseError};

/// A fenced chunk of block source and the request count it waits for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeBlock {
    /// 0-based position among the template's code blocks.
    pub index: usize,
    /// References counted in the prose before this block.
    pub threshold: u64,
    /// 1-based line of the open fence.
    pub fence_line: usize,
    pub source_lines: Vec<String>,
}

impl CodeBlock {
    pub fn source(&self) -> String {
        self.source_lines.join("\n")
    }
}

/// Result of segmenting one template.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Code blocks in source order, so thresholds are non-decreasing.
    pub blocks: VecDeque<CodeBlock>,
    /// References counted over all prose, including text after the last block.
    pub total_references: u64,
    /// The template with every code block removed, fences included.
    pub prose: String,
}

/// Splits template text according to the configured markers.
#[derive(Debug, Clone)]
pub struct Segmenter {
    open_marker: String,
    close_marker: String,
    helper: String,
}

enum Mode {
    Text,
    Block(CodeBlock),
    /// An ordinary fenced listing (e.g. ```` ```rust ````); stays prose.
    Foreign,
}

impl Segmenter {
    pub fn new(open_marker: &str, close_marker: &str, helper: &str) -> Self {
        Self {
            open_marker: open_marker.to_string(),
            close_marker: close_marker.to_string(),
            helper: helper.to_string(),
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Self::new(&config.open_marker, &config.close_marker, &config.helper)
    }

    /// Count helper invocations on one line of prose.
    ///
    /// An invocation is `{{` (optionally `{{{`, `{{~` and spaces) followed by
    /// the helper name and whitespace.
    pub fn count_references(&self, line: &str) -> u64 {
        let mut count = 0;
        let mut from = 0;
        while let Some(pos) = line[from..].find("{{") {
            let start = from + pos;
            let rest = line[start + 2..]
                .strip_prefix('{')
                .unwrap_or(&line[start + 2..]);
            let rest = rest.strip_prefix('~').unwrap_or(rest).trim_start();
            if let Some(after) = rest.strip_prefix(self.helper.as_str()) {
                if after.starts_with(char::is_whitespace) {
                    count += 1;
                }
            }
            from = start + 2;
        }
        count
    }

    /// A bare close marker, possibly with trailing whitespace.
    fn is_bare_close(&self, line: &str) -> bool {
        line.strip_prefix(self.close_marker.as_str())
            .is_some_and(|rest| rest.trim().is_empty())
    }

    /// Segment a whole template.
    ///
    /// Fails with [`StepwiseError::UnterminatedBlock`] when the text ends
    /// inside a code block, and with [`StepwiseError::UnmatchedFence`] for a
    /// bare close marker outside any fence.
    pub fn segment(&self, text: &str) -> Result<Segmentation> {
        let mut blocks = VecDeque::new();
        let mut prose = Vec::new();
        let mut references = 0u64;
        let mut mode = Mode::Text;

        for (i, line) in text.split('\n').enumerate() {
            let line_no = i + 1;
            mode = match mode {
                Mode::Text if line.starts_with(self.open_marker.as_str()) => {
                    Mode::Block(CodeBlock {
                        index: blocks.len(),
                        threshold: references,
                        fence_line: line_no,
                        source_lines: Vec::new(),
                    })
                }
                Mode::Text if self.is_bare_close(line) => {
                    return Err(StepwiseError::UnmatchedFence { line: line_no });
                }
                Mode::Text => {
                    references += self.count_references(line);
                    prose.push(line);
                    if line.starts_with(self.close_marker.as_str()) {
                        Mode::Foreign
                    } else {
                        Mode::Text
                    }
                }
                Mode::Foreign => {
                    references += self.count_references(line);
                    prose.push(line);
                    if self.is_bare_close(line) {
                        Mode::Text
                    } else {
                        Mode::Foreign
                    }
                }
                Mode::Block(block) if line.starts_with(self.close_marker.as_str()) => {
                    tracing::trace!(
                        index = block.index,
                        threshold = block.threshold,
                        lines = block.source_lines.len(),
                        "segmented code block"
                    );
                    blocks.push_back(block);
                    Mode::Text
                }
                Mode::Block(mut block) => {
                    block.source_lines.push(line.to_string());
                    Mode::Block(block)
                }
            };
        }

        match mode {
            Mode::Block(block) => {
                return Err(StepwiseError::UnterminatedBlock {
                    line: block.fence_line,
                })
            }
            Mode::Foreign => tracing::debug!("template ends inside a fenced listing"),
            Mode::Text => {}
        }

        Ok(Segmentation {
            blocks,
            total_references: references,
            prose: prose.join("\n"),
        })
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::from_config(&EvalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "\
`a` is {{_ \"a\"}}, twice {{_ \"a\"}}, thrice {{_ \"a\"}}.
```calc
a = 9
b = 3.2
```
But now `a` = {{_ \"a\"}} ({{_ \"a\"}}).
```calc
a = 10
```
And then `a` is {{_ \"a\"}}.
```calc
a *= b
```
Finally a: {{_ \"a\"}} ({{_ \"a\"}}).
";

    fn thresholds(seg: &Segmentation) -> Vec<u64> {
        seg.blocks.iter().map(|b| b.threshold).collect()
    }

    #[test]
    fn test_scenario_thresholds() {
        let seg = Segmenter::default().segment(SCENARIO).unwrap();
        assert_eq!(thresholds(&seg), vec![3, 5, 6]);
        assert_eq!(seg.total_references, 8);
        assert_eq!(seg.blocks[0].source_lines, vec!["a = 9", "b = 3.2"]);
        assert_eq!(seg.blocks[2].source(), "a *= b");
        assert_eq!(seg.blocks[1].fence_line, 7);
    }

    #[test]
    fn test_prose_drops_blocks() {
        let seg = Segmenter::default().segment(SCENARIO).unwrap();
        assert_eq!(
            seg.prose,
            "`a` is {{_ \"a\"}}, twice {{_ \"a\"}}, thrice {{_ \"a\"}}.\n\
             But now `a` = {{_ \"a\"}} ({{_ \"a\"}}).\n\
             And then `a` is {{_ \"a\"}}.\n\
             Finally a: {{_ \"a\"}} ({{_ \"a\"}}).\n"
        );
    }

    #[test]
    fn test_preamble_block_has_zero_threshold() {
        let seg = Segmenter::default()
            .segment("```calc\nx = 1\n```\nx is {{_ \"x\"}}")
            .unwrap();
        assert_eq!(thresholds(&seg), vec![0]);
        assert_eq!(seg.total_references, 1);
    }

    #[test]
    fn test_no_blocks() {
        let seg = Segmenter::default().segment("just {{_ \"x\"}} text").unwrap();
        assert!(seg.blocks.is_empty());
        assert_eq!(seg.total_references, 1);
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let err = Segmenter::default()
            .segment("intro\n```calc\na = 1\n")
            .unwrap_err();
        assert!(matches!(err, StepwiseError::UnterminatedBlock { line: 2 }));
    }

    #[test]
    fn test_orphan_close_is_error() {
        let err = Segmenter::default().segment("text\n```\nmore").unwrap_err();
        assert!(matches!(err, StepwiseError::UnmatchedFence { line: 2 }));
    }

    #[test]
    fn test_foreign_fences_stay_prose() {
        let text = "```rust\nlet x = {{_ \"a\"}};\n```\n```calc\na = 1\n```\n";
        let seg = Segmenter::default().segment(text).unwrap();
        assert_eq!(thresholds(&seg), vec![1]);
        assert_eq!(seg.prose, "```rust\nlet x = {{_ \"a\"}};\n```\n");
    }

    #[test]
    fn test_count_references_variants() {
        let s = Segmenter::default();
        assert_eq!(s.count_references("{{_ \"a\"}} {{ _ \"b\" }}"), 2);
        assert_eq!(s.count_references("{{{_ \"a\"}}} and {{~_ \"b\"~}}"), 2);
        assert_eq!(s.count_references("{{name}} {{_a}} _ \"a\""), 0);
        assert_eq!(s.count_references(""), 0);
    }

    #[test]
    fn test_custom_markers_and_helper() {
        let s = Segmenter::new("~~~ calc", "~~~", "val");
        let seg = s
            .segment("{{val \"a\"}}\n~~~ calc\na = 1\n~~~\n{{val \"a\"}}")
            .unwrap();
        assert_eq!(thresholds(&seg), vec![1]);
        assert_eq!(seg.total_references, 2);
    }

    #[test]
    fn test_empty_block_is_queued() {
        let seg = Segmenter::default().segment("```calc\n```\n").unwrap();
        assert_eq!(seg.blocks.len(), 1);
        assert!(seg.blocks[0].source_lines.is_empty());
    }
}

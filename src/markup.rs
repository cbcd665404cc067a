//! Message formatting: a fixed-order pipeline turning raw chat text into
//! typed fragments the history widget paints.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Knobs for the formatting pipeline.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Strip control characters before any other stage runs. Keeps agent
    /// replies from smuggling escape sequences into the terminal.
    pub sanitize: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { sanitize: true }
    }
}

/// One piece of formatted output. `Text` runs are content no stage
/// claimed; everything else is final once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Plain text, never containing a newline in the finished document
    Text(String),
    /// `**bold**` or `__bold__` content
    Bold(String),
    /// `*italic*` or `_italic_` content
    Italic(String),
    /// `` `inline code` `` content, kept verbatim
    Code(String),
    /// ```fenced``` content, kept verbatim including newlines
    CodeBlock(String),
    /// Line-leading `#`/`##`/`###` marker; styles the rest of its line
    Heading(u8),
    /// Line-leading `* ` or `- ` marker, displayed as `• `
    Bullet,
    /// Line-leading `N. ` marker, keeping its number
    Numbered(u32),
    /// A single `\n`
    LineBreak,
    /// A blank line (`\n\n`)
    ParagraphBreak,
}

/// The finished message: one outer container holding the fragment run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub fragments: Vec<Fragment>,
}

// Patterns, one per stage. Replacements happen in the fixed order below;
// a pattern only ever runs against still-unclaimed text.
static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("code block pattern"));
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("inline code pattern"));
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));
static BOLD_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(.*?)__").expect("bold pattern"));
static ITALIC_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern"));
static ITALIC_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(.*?)_").expect("italic pattern"));
static HEADING_3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### ").expect("heading pattern"));
static HEADING_2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## ").expect("heading pattern"));
static HEADING_1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# ").expect("heading pattern"));
static BULLET_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\* ").expect("bullet pattern"));
static BULLET_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- ").expect("bullet pattern"));
static NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\d+)\. ").expect("numbered pattern"));

/// Run the full pipeline. Stage order is load-bearing: bold must consume
/// `**` pairs before the italic stage sees single `*`, `###` must run
/// before `##` and `#`, and fences must run before inline code so their
/// backticks survive intact. List markers only match what earlier stages
/// left at a true line start. This never fails, whatever the input.
pub fn render(text: &str, options: &RenderOptions) -> Document {
    let text = if options.sanitize {
        strip_control_chars(text)
    } else {
        text.to_string()
    };

    let mut fragments = vec![Fragment::Text(text)];
    fragments = claim_inline(fragments, &CODE_BLOCK, Fragment::CodeBlock);
    fragments = claim_inline(fragments, &INLINE_CODE, Fragment::Code);
    fragments = claim_inline(fragments, &BOLD_STARS, Fragment::Bold);
    fragments = claim_inline(fragments, &BOLD_UNDERSCORES, Fragment::Bold);
    fragments = claim_inline(fragments, &ITALIC_STARS, Fragment::Italic);
    fragments = claim_inline(fragments, &ITALIC_UNDERSCORES, Fragment::Italic);
    fragments = claim_markers(fragments, &HEADING_3, |_| Some(Fragment::Heading(3)));
    fragments = claim_markers(fragments, &HEADING_2, |_| Some(Fragment::Heading(2)));
    fragments = claim_markers(fragments, &HEADING_1, |_| Some(Fragment::Heading(1)));
    fragments = claim_markers(fragments, &BULLET_STAR, |_| Some(Fragment::Bullet));
    fragments = claim_markers(fragments, &BULLET_DASH, |_| Some(Fragment::Bullet));
    fragments = claim_markers(fragments, &NUMBERED, |caps| {
        let number = caps.get(1)?.as_str().parse().ok()?;
        Some(Fragment::Numbered(number))
    });
    fragments = claim_separator(fragments, "\n\n", Fragment::ParagraphBreak);
    fragments = claim_separator(fragments, "\n", Fragment::LineBreak);

    Document { fragments }
}

/// Drop control characters, keeping `\n` and `\t`. This is what stands
/// between a hostile reply and the terminal's escape parser.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

/// Split every unclaimed text run on `pattern`, turning each match into
/// the fragment built from its first capture group.
fn claim_inline(
    fragments: Vec<Fragment>,
    pattern: &Regex,
    make: fn(String) -> Fragment,
) -> Vec<Fragment> {
    let mut out = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let Fragment::Text(text) = fragment else {
            out.push(fragment);
            continue;
        };
        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                out.push(Fragment::Text(text[last..whole.start()].to_string()));
            }
            out.push(make(inner.as_str().to_string()));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Fragment::Text(text[last..].to_string()));
        }
    }
    out
}

/// Like `claim_inline` but for line-leading markers. A match at the very
/// start of a text run only counts when that run actually begins a line;
/// a run sitting right after an inline fragment or another marker is
/// mid-line, and `(?m)^` alone cannot know that.
fn claim_markers(
    fragments: Vec<Fragment>,
    pattern: &Regex,
    make: impl Fn(&Captures) -> Option<Fragment>,
) -> Vec<Fragment> {
    let mut out = Vec::with_capacity(fragments.len());
    let mut at_line_start = true;
    for fragment in fragments {
        let Fragment::Text(text) = fragment else {
            at_line_start = false;
            out.push(fragment);
            continue;
        };
        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() == 0 && !at_line_start {
                continue;
            }
            let Some(marker) = make(&caps) else { continue };
            if whole.start() > last {
                out.push(Fragment::Text(text[last..whole.start()].to_string()));
            }
            out.push(marker);
            last = whole.end();
        }
        at_line_start = text.ends_with('\n');
        if last < text.len() {
            out.push(Fragment::Text(text[last..].to_string()));
        }
    }
    out
}

/// Split text runs on a literal separator, emitting a break fragment
/// between the parts.
fn claim_separator(
    fragments: Vec<Fragment>,
    separator: &str,
    break_fragment: Fragment,
) -> Vec<Fragment> {
    let mut out = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let Fragment::Text(text) = fragment else {
            out.push(fragment);
            continue;
        };
        for (index, part) in text.split(separator).enumerate() {
            if index > 0 {
                out.push(break_fragment.clone());
            }
            if !part.is_empty() {
                out.push(Fragment::Text(part.to_string()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(text: &str) -> Vec<Fragment> {
        render(text, &RenderOptions::default()).fragments
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(fragments("hello world"), vec![Fragment::Text("hello world".into())]);
    }

    #[test]
    fn empty_input_renders_empty() {
        assert!(fragments("").is_empty());
    }

    #[test]
    fn bold_with_stars() {
        assert_eq!(
            fragments("a **b** c"),
            vec![
                Fragment::Text("a ".into()),
                Fragment::Bold("b".into()),
                Fragment::Text(" c".into()),
            ]
        );
    }

    #[test]
    fn bold_with_underscores() {
        assert_eq!(fragments("__strong__"), vec![Fragment::Bold("strong".into())]);
    }

    #[test]
    fn bold_leaves_no_asterisks() {
        for fragment in fragments("**bold**") {
            if let Fragment::Text(text) = fragment {
                assert!(!text.contains('*'));
            }
        }
        assert_eq!(fragments("**bold**"), vec![Fragment::Bold("bold".into())]);
    }

    #[test]
    fn italic_runs_after_bold() {
        assert_eq!(
            fragments("**bold** and *it*"),
            vec![
                Fragment::Bold("bold".into()),
                Fragment::Text(" and ".into()),
                Fragment::Italic("it".into()),
            ]
        );
    }

    #[test]
    fn italic_with_underscores() {
        assert_eq!(fragments("_soft_"), vec![Fragment::Italic("soft".into())]);
    }

    #[test]
    fn inline_code_content_is_verbatim() {
        assert_eq!(fragments("`**x**`"), vec![Fragment::Code("**x**".into())]);
    }

    #[test]
    fn fenced_block_spans_lines() {
        assert_eq!(
            fragments("before ```let x = 1;\nx += 1;``` after"),
            vec![
                Fragment::Text("before ".into()),
                Fragment::CodeBlock("let x = 1;\nx += 1;".into()),
                Fragment::Text(" after".into()),
            ]
        );
    }

    #[test]
    fn fences_claim_before_inline_code() {
        assert_eq!(
            fragments("```a``` `b`"),
            vec![
                Fragment::CodeBlock("a".into()),
                Fragment::Text(" ".into()),
                Fragment::Code("b".into()),
            ]
        );
    }

    #[test]
    fn heading_levels_map_longest_first() {
        assert_eq!(
            fragments("# Title"),
            vec![Fragment::Heading(1), Fragment::Text("Title".into())]
        );
        assert_eq!(
            fragments("## Section"),
            vec![Fragment::Heading(2), Fragment::Text("Section".into())]
        );
        assert_eq!(
            fragments("### Sub"),
            vec![Fragment::Heading(3), Fragment::Text("Sub".into())]
        );
    }

    #[test]
    fn four_hashes_stay_literal() {
        assert_eq!(fragments("#### deep"), vec![Fragment::Text("#### deep".into())]);
    }

    #[test]
    fn heading_marker_requires_line_start() {
        assert_eq!(fragments("a # b"), vec![Fragment::Text("a # b".into())]);
        // The run after the inline code starts mid-line, so no heading.
        assert_eq!(
            fragments("see `x`# h"),
            vec![
                Fragment::Text("see ".into()),
                Fragment::Code("x".into()),
                Fragment::Text("# h".into()),
            ]
        );
    }

    #[test]
    fn heading_on_second_line() {
        assert_eq!(
            fragments("intro\n## Next"),
            vec![
                Fragment::Text("intro".into()),
                Fragment::LineBreak,
                Fragment::Heading(2),
                Fragment::Text("Next".into()),
            ]
        );
    }

    #[test]
    fn bullets_from_stars_and_dashes() {
        assert_eq!(
            fragments("* one\n- two"),
            vec![
                Fragment::Bullet,
                Fragment::Text("one".into()),
                Fragment::LineBreak,
                Fragment::Bullet,
                Fragment::Text("two".into()),
            ]
        );
    }

    #[test]
    fn dash_mid_line_is_not_a_bullet() {
        assert_eq!(fragments("a - b"), vec![Fragment::Text("a - b".into())]);
    }

    #[test]
    fn numbered_items_keep_their_number() {
        assert_eq!(
            fragments("1. first\n2. second"),
            vec![
                Fragment::Numbered(1),
                Fragment::Text("first".into()),
                Fragment::LineBreak,
                Fragment::Numbered(2),
                Fragment::Text("second".into()),
            ]
        );
    }

    #[test]
    fn paragraph_and_line_breaks() {
        assert_eq!(
            fragments("a\n\nb\nc"),
            vec![
                Fragment::Text("a".into()),
                Fragment::ParagraphBreak,
                Fragment::Text("b".into()),
                Fragment::LineBreak,
                Fragment::Text("c".into()),
            ]
        );
    }

    #[test]
    fn unmatched_markers_stay_literal() {
        assert_eq!(fragments("*open"), vec![Fragment::Text("*open".into())]);
        assert_eq!(fragments("`tick"), vec![Fragment::Text("`tick".into())]);
    }

    #[test]
    fn doubled_star_without_close_becomes_empty_italic() {
        // `**` with no closing pair survives bold, then the italic stage
        // consumes the two stars as an empty pair. Chained substitution
        // order, not line structure, decides.
        assert_eq!(
            fragments("**open"),
            vec![Fragment::Italic(String::new()), Fragment::Text("open".into())]
        );
    }

    #[test]
    fn bold_inside_heading_line() {
        assert_eq!(
            fragments("### Steps\n**Task:** search"),
            vec![
                Fragment::Heading(3),
                Fragment::Text("Steps".into()),
                Fragment::LineBreak,
                Fragment::Bold("Task:".into()),
                Fragment::Text(" search".into()),
            ]
        );
    }

    #[test]
    fn bulleted_bold_under_a_heading() {
        assert_eq!(
            fragments("### Available Tools\n- **search:reddit** - Search Reddit for posts"),
            vec![
                Fragment::Heading(3),
                Fragment::Text("Available Tools".into()),
                Fragment::LineBreak,
                Fragment::Bullet,
                Fragment::Bold("search:reddit".into()),
                Fragment::Text(" - Search Reddit for posts".into()),
            ]
        );
    }

    #[test]
    fn sanitize_strips_control_chars() {
        assert_eq!(
            fragments("a\u{1b}[31mred"),
            vec![Fragment::Text("a[31mred".into())]
        );
        assert_eq!(fragments("tab\tkept"), vec![Fragment::Text("tab\tkept".into())]);
    }

    #[test]
    fn sanitize_runs_before_fences() {
        // Stage 0 is global; even fence content loses control chars.
        assert_eq!(
            fragments("```a\u{7}b```"),
            vec![Fragment::CodeBlock("ab".into())]
        );
    }

    #[test]
    fn sanitize_can_be_switched_off() {
        let options = RenderOptions { sanitize: false };
        let document = render("a\u{1b}b", &options);
        assert_eq!(document.fragments, vec![Fragment::Text("a\u{1b}b".into())]);
    }
}

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::Structure;
use crate::syntax::HighlightedLine;
use crate::theme::Theme;
use crate::transform::{CodeBlock, Line};

/// A run of text sharing one style
struct Segment {
    start: usize,
    end: usize,
    css: String,
    in_word: bool,
}

/// Render a transformed block with the highlights computed for its lines
pub fn render(
    block: &CodeBlock,
    highlights: &[HighlightedLine],
    theme: &Theme,
    structure: Structure,
) -> String {
    let empty = HighlightedLine::default();
    let rendered = block
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| render_tokens(line, highlights.get(i).unwrap_or(&empty), theme));

    match structure {
        Structure::Inline => rendered.collect::<Vec<_>>().join("<br>"),
        Structure::Classic => {
            let mut out = String::new();
            let mut pre_class = format!("shiki {}", theme.name());
            for class in &block.pre_classes {
                pre_class.push(' ');
                pre_class.push_str(class);
            }
            let _ = write!(
                out,
                r#"<pre class="{}" style="background-color:{};color:{}" tabindex="0" data-pretty-code=""><code>"#,
                encode_double_quoted_attribute(&pre_class),
                encode_double_quoted_attribute(theme.background()),
                encode_double_quoted_attribute(theme.foreground()),
            );

            let lines: Vec<String> = block
                .lines
                .iter()
                .zip(rendered)
                .map(|(line, tokens)| {
                    let mut class = String::from("line");
                    for c in &line.classes {
                        class.push(' ');
                        class.push_str(c);
                    }
                    format!(
                        r#"<span class="{}">{tokens}</span>"#,
                        encode_double_quoted_attribute(&class)
                    )
                })
                .collect();
            out.push_str(&lines.join("\n"));
            out.push_str("</code></pre>");
            out
        }
    }
}

/// Token spans for one line, with word highlights wrapped around them
fn render_tokens(line: &Line, highlights: &HighlightedLine, theme: &Theme) -> String {
    let mut out = String::new();
    let mut in_word = false;

    for segment in segments(line, highlights, theme) {
        if segment.in_word != in_word {
            out.push_str(if segment.in_word {
                r#"<span class="highlighted-word">"#
            } else {
                "</span>"
            });
            in_word = segment.in_word;
        }
        let _ = write!(
            out,
            r#"<span style="{}">{}</span>"#,
            encode_double_quoted_attribute(&segment.css),
            encode_text(&line.text[segment.start..segment.end])
        );
    }
    if in_word {
        out.push_str("</span>");
    }
    out
}

/// Split a line at every highlight and word boundary, merging neighbours
/// that end up looking the same
fn segments(line: &Line, highlights: &HighlightedLine, theme: &Theme) -> Vec<Segment> {
    let text = line.text.as_str();
    let len = text.len();

    let words = word_ranges(text, &line.words);

    let mut bounds = vec![0, len];
    for h in &highlights.highlights {
        bounds.push(h.start.min(len));
        bounds.push(h.end.min(len));
    }
    for &(start, end) in &words {
        bounds.push(start);
        bounds.push(end);
    }
    bounds.retain(|&b| text.is_char_boundary(b));
    bounds.sort_unstable();
    bounds.dedup();

    let mut out: Vec<Segment> = Vec::new();
    for pair in bounds.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if start == end {
            continue;
        }
        let css = match theme.style_for(highlights.kind_at(start)) {
            Some(style) => style.css(theme.foreground()),
            None => format!("color:{}", theme.foreground()),
        };
        let in_word = words.iter().any(|&(s, e)| start >= s && end <= e);

        match out.last_mut() {
            Some(prev) if prev.css == css && prev.in_word == in_word => prev.end = end,
            _ => out.push(Segment {
                start,
                end,
                css,
                in_word,
            }),
        }
    }
    out
}

/// Byte ranges of every non-overlapping occurrence of each word
fn word_ranges(text: &str, words: &[String]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = words
        .iter()
        .filter(|w| !w.is_empty())
        .flat_map(|w| text.match_indices(w.as_str()).map(|(i, m)| (i, i + m.len())))
        .collect();
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

//! `[!code ...]` marker scanning shared by the notation transformers

use std::sync::LazyLock;

use regex::Regex;

use super::{CodeBlock, Line};
use crate::syntax::Language;

static NOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[!code\s+([^\]]+?)\s*\]").expect("valid notation regex"));

// A comment left with nothing in it once its marker is gone
static EMPTY_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s+)(?://|#|--|/\*\s*\*/|<!--\s*-->|\{/\*\s*\*/\})\s*$")
        .expect("valid comment regex")
});

// Assembly also comments with `;`, which elsewhere ends a statement
static EMPTY_ASM_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s+)(?://|#|;|/\*\s*\*/)\s*$").expect("valid comment regex")
});

fn empty_comment(language: Option<Language>) -> &'static Regex {
    match language {
        Some(Language::Asm) => &EMPTY_ASM_COMMENT,
        _ => &EMPTY_COMMENT,
    }
}

/// Split a trailing `:N` line count off a directive
pub(super) fn split_count(directive: &str) -> (&str, Option<usize>) {
    match directive.rsplit_once(':') {
        Some((head, count))
            if !head.is_empty() && !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()) =>
        {
            (head, count.parse().ok())
        }
        _ => (directive, None),
    }
}

/// Strip every marker `parse` recognizes and hand each affected line to `apply`.
///
/// `parse` maps a directive to its payload and the number of lines it
/// covers. A marker on a line with code covers that line onwards; a line
/// holding nothing but the marker is removed and the marker covers the
/// lines after it. Returns whether any marker was found.
pub(super) fn process<D>(
    block: &mut CodeBlock,
    parse: impl Fn(&str) -> Option<(D, usize)>,
    mut apply: impl FnMut(&mut Line, &D),
) -> bool {
    let comment = empty_comment(block.language);
    let mut matched = false;
    let mut i = 0;

    while i < block.lines.len() {
        let text = &block.lines[i].text;
        let mut hits = Vec::new();
        let mut stripped = String::with_capacity(text.len());
        let mut last = 0;

        for caps in NOTATION.captures_iter(text) {
            let (Some(whole), Some(directive)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Some(hit) = parse(directive.as_str()) {
                stripped.push_str(&text[last..whole.start()]);
                last = whole.end();
                hits.push(hit);
            }
        }

        if hits.is_empty() {
            i += 1;
            continue;
        }

        stripped.push_str(&text[last..]);
        matched = true;

        let cleaned = comment.replace(stripped.trim_end(), "");
        let cleaned = cleaned.trim_end();
        let standalone = cleaned.trim().is_empty();
        if standalone {
            block.lines.remove(i);
        } else {
            block.lines[i].text = cleaned.to_string();
        }

        for (payload, count) in &hits {
            let end = i.saturating_add(*count).min(block.lines.len());
            for line in &mut block.lines[i..end] {
                apply(line, payload);
            }
        }

        if !standalone {
            i += 1;
        }
    }

    matched
}

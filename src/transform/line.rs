//! Transformers that attach classes to whole lines

use super::notation::{process, split_count};
use super::{CodeBlock, Transformer};

/// A marker-driven line transformer.
///
/// Each directive maps to the classes added to the lines it covers; a block
/// with at least one match also gets `pre_class`.
#[derive(Debug, Clone, Copy)]
pub struct LineNotation {
    name: &'static str,
    directives: &'static [(&'static str, &'static str)],
    pre_class: &'static str,
}

impl LineNotation {
    /// `[!code ++]` and `[!code --]`
    pub fn diff() -> Self {
        Self {
            name: "notation-diff",
            directives: &[("++", "diff add"), ("--", "diff remove")],
            pre_class: "has-diff",
        }
    }

    /// `[!code highlight]` and its short form `[!code hl]`
    pub fn highlight() -> Self {
        Self {
            name: "notation-highlight",
            directives: &[("highlight", "highlighted"), ("hl", "highlighted")],
            pre_class: "has-highlighted",
        }
    }

    pub fn error_level() -> Self {
        Self {
            name: "notation-error-level",
            directives: &[
                ("error", "highlighted error"),
                ("warning", "highlighted warning"),
            ],
            pre_class: "has-highlighted",
        }
    }

    pub fn focus() -> Self {
        Self {
            name: "notation-focus",
            directives: &[("focus", "focused")],
            pre_class: "has-focused",
        }
    }

    fn classes_for(&self, directive: &str) -> Option<(&'static str, usize)> {
        let (head, count) = split_count(directive);
        self.directives
            .iter()
            .find(|(name, _)| *name == head)
            .map(|(_, classes)| (*classes, count.unwrap_or(1)))
    }
}

impl Transformer for LineNotation {
    fn name(&self) -> &'static str {
        self.name
    }

    fn transform(&self, block: &mut CodeBlock) {
        let matched = process(
            block,
            |directive| self.classes_for(directive),
            |line, classes| line.add_class(classes),
        );
        if matched {
            block.add_pre_class(self.pre_class);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(transformer: LineNotation, code: &str) -> CodeBlock {
        let mut block = CodeBlock::new(code, None);
        transformer.transform(&mut block);
        block
    }

    #[test]
    fn diff_marks_added_and_removed_lines() {
        let block = run(
            LineNotation::diff(),
            "fn main() {\n    old(); // [!code --]\n    new(); // [!code ++]\n}",
        );
        assert_eq!(block.source(), "fn main() {\n    old();\n    new();\n}");
        assert!(block.lines[0].classes.is_empty());
        assert_eq!(block.lines[1].classes, vec!["diff", "remove"]);
        assert_eq!(block.lines[2].classes, vec!["diff", "add"]);
        assert_eq!(block.pre_classes, vec!["has-diff"]);
    }

    #[test]
    fn highlight_accepts_short_form_and_count() {
        let block = run(LineNotation::highlight(), "a # [!code hl:2]\nb\nc");
        assert_eq!(block.lines[0].classes, vec!["highlighted"]);
        assert_eq!(block.lines[1].classes, vec!["highlighted"]);
        assert!(block.lines[2].classes.is_empty());
        assert_eq!(block.pre_classes, vec!["has-highlighted"]);
    }

    #[test]
    fn error_level_classes() {
        let block = run(
            LineNotation::error_level(),
            "x = 1 -- [!code error]\ny = 2 -- [!code warning]",
        );
        assert_eq!(block.lines[0].classes, vec!["highlighted", "error"]);
        assert_eq!(block.lines[1].classes, vec!["highlighted", "warning"]);
        assert_eq!(block.source(), "x = 1\ny = 2");
    }

    #[test]
    fn focus_on_standalone_line() {
        let block = run(LineNotation::focus(), "<!-- [!code focus] -->\n<p>hi</p>");
        assert_eq!(block.source(), "<p>hi</p>");
        assert_eq!(block.lines[0].classes, vec!["focused"]);
        assert_eq!(block.pre_classes, vec!["has-focused"]);
    }

    #[test]
    fn foreign_markers_survive() {
        let block = run(LineNotation::diff(), "a // [!code focus]");
        assert_eq!(block.source(), "a // [!code focus]");
        assert!(block.pre_classes.is_empty());
    }

    #[test]
    fn unknown_directive_is_ignored() {
        let block = run(LineNotation::highlight(), "a // [!code highlights]");
        assert_eq!(block.source(), "a // [!code highlights]");
        assert!(block.lines[0].classes.is_empty());
    }

    #[test]
    fn several_markers_on_one_line() {
        let block = run(LineNotation::diff(), "a // [!code ++] [!code --]");
        assert_eq!(block.source(), "a");
        assert_eq!(block.lines[0].classes, vec!["diff", "add", "remove"]);
    }
}

use super::notation::{process, split_count};
use super::{CodeBlock, Transformer};

/// `[!code word:TEXT]` marks every later occurrence of `TEXT` in the block;
/// `[!code word:TEXT:N]` limits it to `N` lines
#[derive(Debug, Clone, Copy, Default)]
pub struct WordHighlight;

fn parse(directive: &str) -> Option<(String, usize)> {
    let rest = directive.strip_prefix("word:")?;
    let (word, count) = split_count(rest);
    if word.is_empty() {
        return None;
    }
    Some((word.to_string(), count.unwrap_or(usize::MAX)))
}

impl Transformer for WordHighlight {
    fn name(&self) -> &'static str {
        "notation-word-highlight"
    }

    fn transform(&self, block: &mut CodeBlock) {
        let matched = process(block, parse, |line, word| {
            if line.text.contains(word.as_str()) {
                line.add_word(word);
            }
        });
        if matched {
            block.add_pre_class("has-highlighted-words");
        }
    }
}

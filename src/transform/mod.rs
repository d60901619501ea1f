//! Source-annotation transformers
//!
//! Transformers run on the raw code before it is tokenized. They strip
//! `[!code ...]` comment markers from the source and record presentational
//! classes on lines and on the enclosing `<pre>`.

mod line;
mod notation;
mod word;

pub use line::LineNotation;
pub use word::WordHighlight;

use crate::syntax::Language;

/// A single source line plus what transformers attached to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub classes: Vec<String>,
    pub words: Vec<String>,
}

impl Line {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Add space-separated classes, skipping ones already present
    pub fn add_class(&mut self, class: &str) {
        for class in class.split_whitespace() {
            if !self.classes.iter().any(|c| c == class) {
                self.classes.push(class.to_string());
            }
        }
    }

    pub fn add_word(&mut self, word: &str) {
        if !self.words.iter().any(|w| w == word) {
            self.words.push(word.to_string());
        }
    }
}

/// Code being prepared for highlighting
#[derive(Debug, Clone, Default)]
pub struct CodeBlock {
    pub lines: Vec<Line>,
    pub pre_classes: Vec<String>,
    /// Raw annotation string from the request, untouched
    pub meta: Option<String>,
    /// Language of the code, when known. Decides which comments a marker
    /// may sit in.
    pub language: Option<Language>,
}

impl CodeBlock {
    /// Split code into lines. CRLF is normalized and a single trailing
    /// newline does not produce an extra empty line.
    pub fn new(code: &str, meta: Option<&str>) -> Self {
        let code = code.replace("\r\n", "\n");
        let code = code.strip_suffix('\n').unwrap_or(&code);
        Self {
            lines: code.split('\n').map(Line::new).collect(),
            pre_classes: Vec::new(),
            meta: meta.map(str::to_string),
            language: None,
        }
    }

    pub fn in_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Current source text, lines joined with `\n`
    pub fn source(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn add_pre_class(&mut self, class: &str) {
        if !class.is_empty() && !self.pre_classes.iter().any(|c| c == class) {
            self.pre_classes.push(class.to_string());
        }
    }
}

pub trait Transformer: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, block: &mut CodeBlock);
}

/// The fixed notation pipeline, in application order
pub fn notation_transformers() -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(LineNotation::diff()),
        Box::new(LineNotation::highlight()),
        Box::new(WordHighlight),
        Box::new(LineNotation::error_level()),
        Box::new(LineNotation::focus()),
    ]
}

/// Run every transformer over `block` in order
pub fn apply_all(transformers: &[Box<dyn Transformer>], block: &mut CodeBlock) {
    for transformer in transformers {
        tracing::trace!(
            transformer = transformer.name(),
            meta = block.meta.as_deref().unwrap_or_default(),
            "applying transformer"
        );
        transformer.transform(block);
    }
}

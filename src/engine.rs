//! The highlighter boundary the worker talks to

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::render::{self, Structure};
use crate::syntax::{Highlighter, Language, LanguageRegistry};
use crate::theme::Theme;
use crate::transform::{self, CodeBlock, Transformer};

/// Per-call rendering options
#[derive(Debug, Clone, Copy)]
pub struct HighlightOptions<'a> {
    pub language: Language,
    pub structure: Structure,
    /// Raw code block annotation, passed through to transformers
    pub meta: Option<&'a str>,
}

pub trait HighlightEngine: Send + 'static {
    fn loaded_languages(&self) -> HashSet<Language>;

    /// Make `language` available. Loading an already loaded language is a no-op.
    fn load_language(&mut self, language: Language) -> Result<()>;

    fn code_to_html(&mut self, code: &str, options: &HighlightOptions<'_>) -> Result<String>;
}

/// Tree-sitter backed engine rendering with a fixed theme
pub struct TreeSitterEngine {
    registry: LanguageRegistry,
    highlighter: Highlighter,
    theme: Arc<Theme>,
    transformers: Vec<Box<dyn Transformer>>,
}

impl TreeSitterEngine {
    pub fn new(registry: LanguageRegistry, theme: Arc<Theme>) -> Self {
        Self {
            registry,
            highlighter: Highlighter::new(),
            theme,
            transformers: transform::notation_transformers(),
        }
    }

    /// Load each named language up front. Failures are logged and skipped;
    /// the language can still be loaded on first use.
    pub fn preload(&mut self, names: &[String]) {
        for name in names {
            let Some(language) = Language::from_name(name) else {
                warn!(language = %name, "unknown language in preload list");
                continue;
            };
            if let Err(e) = self.load_language(language) {
                warn!(language = language.name(), "preload failed: {e}");
            }
        }
        info!(loaded = self.registry.loaded_languages().len(), "highlighter ready");
    }
}

impl HighlightEngine for TreeSitterEngine {
    fn loaded_languages(&self) -> HashSet<Language> {
        self.registry.loaded_languages()
    }

    fn load_language(&mut self, language: Language) -> Result<()> {
        self.registry.load(language).map(|_| ())
    }

    fn code_to_html(&mut self, code: &str, options: &HighlightOptions<'_>) -> Result<String> {
        let mut block = CodeBlock::new(code, options.meta).in_language(options.language);
        transform::apply_all(&self.transformers, &mut block);

        let grammar = self.registry.load(options.language)?;
        let lines = self
            .highlighter
            .highlight(grammar, options.language, &block.source())?;

        Ok(render::render(&block, &lines, &self.theme, options.structure))
    }
}

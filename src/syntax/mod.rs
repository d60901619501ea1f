//! Syntax highlighting module using Tree-sitter
//!
//! Grammars are installed on demand into the configured grammars directory
//! and loaded with `libloading`.

mod highlighter;
mod installer;
mod languages;
mod metadata;

pub use highlighter::{Highlight, HighlightKind, HighlightedLine, Highlighter};
pub use installer::InstallOutcome;
pub use languages::{Language, LanguageRegistry};

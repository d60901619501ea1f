//! Language registry for Tree-sitter grammars
//!
//! Grammars are shared libraries loaded on demand from the grammars directory
//! and kept for the lifetime of the registry.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::info;

use super::installer::{GrammarInstaller, library_path};
use crate::error::{Error, Result};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    C,
    Cpp,
    CSharp,
    Json,
    Toml,
    Markdown,
    Bash,
    Lua,
    Ruby,
    Html,
    Css,
    Yaml,
    Asm,
}

impl Language {
    /// Resolve a request identifier (`rust`, `ts`, `c#`, ...) to a language
    pub fn from_name(name: &str) -> Option<Self> {
        let lang = match name.trim().to_lowercase().as_str() {
            "rust" | "rs" => Language::Rust,
            "python" | "py" => Language::Python,
            "javascript" | "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "typescript" | "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "go" | "golang" => Language::Go,
            "c" | "h" => Language::C,
            "cpp" | "c++" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "c#" | "csharp" | "cs" => Language::CSharp,
            "json" | "jsonc" => Language::Json,
            "toml" => Language::Toml,
            "markdown" | "md" => Language::Markdown,
            "bash" | "sh" | "shell" | "zsh" | "console" => Language::Bash,
            "lua" => Language::Lua,
            "ruby" | "rb" => Language::Ruby,
            "html" | "htm" => Language::Html,
            "css" | "scss" => Language::Css,
            "yaml" | "yml" => Language::Yaml,
            "asm" | "assembly" => Language::Asm,
            _ => return None,
        };
        Some(lang)
    }

    /// Get the display name for this language
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "Rust",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Tsx => "TSX",
            Language::Go => "Go",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::CSharp => "C#",
            Language::Json => "JSON",
            Language::Toml => "TOML",
            Language::Markdown => "Markdown",
            Language::Bash => "Bash",
            Language::Lua => "Lua",
            Language::Ruby => "Ruby",
            Language::Html => "HTML",
            Language::Css => "CSS",
            Language::Yaml => "YAML",
            Language::Asm => "Assembly",
        }
    }

    /// Get the grammar name (used for library loading)
    pub fn grammar_name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "c_sharp",
            Language::Json => "json",
            Language::Toml => "toml",
            Language::Markdown => "markdown",
            Language::Bash => "bash",
            Language::Lua => "lua",
            Language::Ruby => "ruby",
            Language::Html => "html",
            Language::Css => "css",
            Language::Yaml => "yaml",
            Language::Asm => "asm",
        }
    }

    /// Get the GitHub repository for this grammar
    pub fn grammar_repo(&self) -> &'static str {
        match self {
            Language::Rust => "tree-sitter/tree-sitter-rust",
            Language::Python => "tree-sitter/tree-sitter-python",
            Language::JavaScript => "tree-sitter/tree-sitter-javascript",
            Language::TypeScript => "tree-sitter/tree-sitter-typescript",
            Language::Tsx => "tree-sitter/tree-sitter-typescript",
            Language::Go => "tree-sitter/tree-sitter-go",
            Language::C => "tree-sitter/tree-sitter-c",
            Language::Cpp => "tree-sitter/tree-sitter-cpp",
            Language::CSharp => "tree-sitter/tree-sitter-c-sharp",
            Language::Json => "tree-sitter/tree-sitter-json",
            Language::Toml => "tree-sitter-grammars/tree-sitter-toml",
            Language::Markdown => "tree-sitter-grammars/tree-sitter-markdown",
            Language::Bash => "tree-sitter/tree-sitter-bash",
            Language::Lua => "tree-sitter-grammars/tree-sitter-lua",
            Language::Ruby => "tree-sitter/tree-sitter-ruby",
            Language::Html => "tree-sitter/tree-sitter-html",
            Language::Css => "tree-sitter/tree-sitter-css",
            Language::Yaml => "tree-sitter-grammars/tree-sitter-yaml",
            Language::Asm => "RubixDev/tree-sitter-asm",
        }
    }

    /// List all installable languages
    pub fn all() -> Vec<Language> {
        vec![
            Language::Rust,
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::Tsx,
            Language::Go,
            Language::C,
            Language::Cpp,
            Language::CSharp,
            Language::Json,
            Language::Toml,
            Language::Markdown,
            Language::Bash,
            Language::Lua,
            Language::Ruby,
            Language::Html,
            Language::Css,
            Language::Yaml,
            Language::Asm,
        ]
    }
}

/// A loaded grammar library
struct LoadedGrammar {
    // Keeps the shared object mapped while `language` is in use; statically
    // linked grammars have none
    #[allow(dead_code)]
    library: Option<Library>,
    language: tree_sitter::Language,
}

/// Registry of loaded Tree-sitter languages
pub struct LanguageRegistry {
    grammars_dir: PathBuf,
    auto_install: bool,
    loaded: HashMap<Language, LoadedGrammar>,
    installer: GrammarInstaller,
}

impl LanguageRegistry {
    pub fn new(grammars_dir: PathBuf, auto_install: bool) -> Self {
        let installer = GrammarInstaller::new(grammars_dir.clone());
        Self {
            grammars_dir,
            auto_install,
            loaded: HashMap::new(),
            installer,
        }
    }

    pub fn grammars_dir(&self) -> &Path {
        &self.grammars_dir
    }

    /// Check if a grammar library exists on disk
    pub fn is_installed(&self, lang: Language) -> bool {
        library_path(&self.grammars_dir, lang.grammar_name()).exists()
    }

    /// Languages whose grammar is currently loaded
    pub fn loaded_languages(&self) -> HashSet<Language> {
        self.loaded.keys().copied().collect()
    }

    /// Load a grammar, installing it first if allowed and reinstalling it
    /// when its recorded ABI is outdated
    pub fn load(&mut self, lang: Language) -> Result<&tree_sitter::Language> {
        if self.loaded.contains_key(&lang) {
            return Ok(&self.loaded[&lang].language);
        }

        let name = lang.grammar_name();
        let lib_path = library_path(&self.grammars_dir, name);

        if !lib_path.exists() {
            if !self.auto_install {
                return Err(Error::unavailable(
                    lang.name(),
                    format!("{} is not installed", lib_path.display()),
                ));
            }
            info!(grammar = name, "grammar not installed, installing");
            self.installer.install(lang)?;
        } else if self.installer.needs_reinstall(lang) {
            info!(grammar = name, "grammar has outdated ABI, reinstalling");
            self.installer.ensure_compatible(lang)?;
        }

        let library = unsafe { Library::new(&lib_path) }
            .map_err(|e| Error::unavailable(lang.name(), e.to_string()))?;

        let func_name = format!("tree_sitter_{name}");
        let language = unsafe {
            let func: Symbol<unsafe extern "C" fn() -> tree_sitter::Language> = library
                .get(func_name.as_bytes())
                .map_err(|e| Error::unavailable(lang.name(), e.to_string()))?;
            func()
        };

        info!(grammar = name, "loaded grammar");
        let grammar = self
            .loaded
            .entry(lang)
            .or_insert(LoadedGrammar {
                library: Some(library),
                language,
            });
        Ok(&grammar.language)
    }

    /// Register a grammar that is already linked into the process
    #[cfg(test)]
    pub(crate) fn insert_loaded(&mut self, lang: Language, language: tree_sitter::Language) {
        self.loaded.insert(
            lang,
            LoadedGrammar {
                library: None,
                language,
            },
        );
    }

    /// List installed grammars
    pub fn installed(&self) -> Vec<Language> {
        Language::all()
            .into_iter()
            .filter(|lang| self.is_installed(*lang))
            .collect()
    }

    /// Get a mutable reference to the installer
    pub fn installer_mut(&mut self) -> &mut GrammarInstaller {
        &mut self.installer
    }
}

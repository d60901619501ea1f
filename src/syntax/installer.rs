//! Grammar installer for Tree-sitter
//!
//! Downloads and compiles Tree-sitter grammars from GitHub.
//! Tracks ABI versions and auto-reinstalls when needed.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use super::languages::Language;
use super::metadata::GrammarMetadata;
use crate::error::{Error, Result};

/// Result of a successful grammar installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    Reinstalled, // Grammar was outdated and reinstalled
}

/// Path of the compiled grammar library inside `grammars_dir`
pub fn library_path(grammars_dir: &Path, name: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    let ext = "dylib";
    #[cfg(target_os = "windows")]
    let ext = "dll";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let ext = "so";

    grammars_dir.join(format!("lib{name}.{ext}"))
}

/// Grammar installer
pub struct GrammarInstaller {
    grammars_dir: PathBuf,
    cache_dir: PathBuf,
    metadata: GrammarMetadata,
}

impl GrammarInstaller {
    /// Create an installer for `grammars_dir`; sources are cached in a
    /// sibling `cache` directory
    pub fn new(grammars_dir: PathBuf) -> Self {
        let cache_dir = grammars_dir
            .parent()
            .map(|p| p.join("cache"))
            .unwrap_or_else(|| grammars_dir.join("cache"));
        let metadata = GrammarMetadata::load(&grammars_dir);

        Self {
            grammars_dir,
            cache_dir,
            metadata,
        }
    }

    /// Check if a grammar needs reinstalling due to ABI mismatch
    pub fn needs_reinstall(&self, lang: Language) -> bool {
        self.metadata.needs_reinstall(lang)
    }

    /// Check and reinstall a grammar if its ABI is outdated
    pub fn ensure_compatible(&mut self, lang: Language) -> Result<InstallOutcome> {
        if !self.metadata.needs_reinstall(lang) {
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        // Force reinstall by removing the old library first
        let _ = std::fs::remove_file(library_path(&self.grammars_dir, lang.grammar_name()));
        self.install_internal(lang, true)?;
        Ok(InstallOutcome::Reinstalled)
    }

    /// Install a grammar
    pub fn install(&mut self, lang: Language) -> Result<InstallOutcome> {
        self.install_internal(lang, false)
    }

    fn install_internal(&mut self, lang: Language, force: bool) -> Result<InstallOutcome> {
        let grammar_name = lang.grammar_name();

        let lib_path = library_path(&self.grammars_dir, grammar_name);
        if lib_path.exists() && !force {
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        std::fs::create_dir_all(&self.grammars_dir).map_err(|e| {
            Error::install(grammar_name, format!("failed to create grammars directory: {e}"))
        })?;
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| {
            Error::install(grammar_name, format!("failed to create cache directory: {e}"))
        })?;

        // Several grammars share a repository (typescript/tsx)
        let repo = lang.grammar_repo();
        let repo_dir = self.cache_dir.join(repo.replace('/', "__"));
        self.fetch(grammar_name, repo, &repo_dir)?;

        if let Err(e) = regenerate_grammar(&repo_dir, lang) {
            // Not fatal - try to compile with existing files
            warn!(grammar = grammar_name, "could not regenerate grammar: {e}");
        }

        let src_dir = find_src_dir(&repo_dir, lang);
        if !src_dir.join("parser.c").exists() {
            return Err(Error::install(
                grammar_name,
                format!("could not find parser.c in {}", src_dir.display()),
            ));
        }

        compile_grammar(grammar_name, &src_dir, &lib_path)?;

        self.metadata.record_install(lang, head_commit(&repo_dir));
        if let Err(e) = self.metadata.save(&self.grammars_dir) {
            warn!(grammar = grammar_name, "failed to save grammar metadata: {e}");
        }

        info!(grammar = grammar_name, path = %lib_path.display(), "installed grammar");
        Ok(InstallOutcome::Installed)
    }

    /// Clone the grammar repository, or pull it when already cached
    fn fetch(&self, grammar_name: &str, repo: &str, repo_dir: &Path) -> Result<()> {
        let status = if repo_dir.exists() {
            Command::new("git")
                .args(["pull", "--depth=1"])
                .current_dir(repo_dir)
                .status()
        } else {
            let url = format!("https://github.com/{repo}.git");
            Command::new("git")
                .args(["clone", "--depth=1", &url])
                .arg(repo_dir)
                .status()
        };

        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(Error::install(
                grammar_name,
                format!("git exited with code {:?}", s.code()),
            )),
            Err(e) => Err(Error::install(
                grammar_name,
                format!("failed to run git: {e}"),
            )),
        }
    }

    /// Uninstall a grammar
    pub fn uninstall(&mut self, lang: Language) -> Result<()> {
        let grammar_name = lang.grammar_name();

        let lib_path = library_path(&self.grammars_dir, grammar_name);
        if lib_path.exists() {
            std::fs::remove_file(&lib_path)?;
        }

        // TypeScript and TSX share one checkout
        let repo = lang.grammar_repo();
        let shared = Language::all().into_iter().any(|other| {
            other != lang
                && other.grammar_repo() == repo
                && library_path(&self.grammars_dir, other.grammar_name()).exists()
        });
        let repo_dir = self.cache_dir.join(repo.replace('/', "__"));
        if !shared && repo_dir.exists() {
            std::fs::remove_dir_all(&repo_dir)?;
        }

        self.metadata.record_uninstall(lang);
        self.metadata.save(&self.grammars_dir)?;
        info!(grammar = grammar_name, "uninstalled grammar");
        Ok(())
    }
}

/// Regenerate the grammar using tree-sitter CLI
fn regenerate_grammar(repo_dir: &Path, lang: Language) -> std::result::Result<(), String> {
    if Command::new("tree-sitter").arg("--version").output().is_err() {
        return Err(
            "tree-sitter CLI not found. Install with: npm install -g tree-sitter-cli".to_string(),
        );
    }

    let output = Command::new("tree-sitter")
        .arg("generate")
        .current_dir(grammar_root(repo_dir, lang))
        .output()
        .map_err(|e| format!("failed to run tree-sitter generate: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "tree-sitter generate failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}

/// Directory holding `grammar.js` for a language
fn grammar_root(repo_dir: &Path, lang: Language) -> PathBuf {
    match lang {
        Language::TypeScript => repo_dir.join("typescript"),
        Language::Tsx => repo_dir.join("tsx"),
        Language::Markdown => repo_dir.join("tree-sitter-markdown"),
        _ => repo_dir.to_path_buf(),
    }
}

/// Find the source directory containing parser.c
fn find_src_dir(repo_dir: &Path, lang: Language) -> PathBuf {
    let standard = grammar_root(repo_dir, lang).join("src");
    if standard.join("parser.c").exists() {
        return standard;
    }

    // Some repos have it in a grammar subdirectory
    let grammar_subdir = repo_dir.join("grammar").join("src");
    if grammar_subdir.join("parser.c").exists() {
        return grammar_subdir;
    }

    standard
}

/// Compile a grammar to a dynamic library
fn compile_grammar(name: &str, src_dir: &Path, lib_path: &Path) -> Result<()> {
    let scanner_c = src_dir.join("scanner.c");
    let scanner_cc = src_dir.join("scanner.cc");

    let mut cmd = Command::new("cc");
    cmd.args(["-shared", "-fPIC", "-O2", "-I"])
        .arg(src_dir)
        .arg(src_dir.join("parser.c"));

    if scanner_c.exists() {
        cmd.arg(&scanner_c);
    } else if scanner_cc.exists() {
        cmd.arg(&scanner_cc).arg("-lstdc++");
    }

    cmd.arg("-o").arg(lib_path);

    let output = cmd
        .output()
        .map_err(|e| Error::install(name, format!("failed to run compiler: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::install(
            name,
            format!(
                "compilation failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ),
        ))
    }
}

/// Commit hash of a cloned repository, if git can tell
fn head_commit(repo_dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

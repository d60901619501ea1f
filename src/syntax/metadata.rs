//! Grammar metadata tracking for ABI version compatibility
//!
//! Tracks which tree-sitter ABI version each grammar was compiled with,
//! and triggers auto-reinstall when versions don't match.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::languages::Language;
use crate::error::{Error, Result};

/// Current tree-sitter ABI version
/// This should match the tree-sitter crate version
pub const TREE_SITTER_ABI_VERSION: u32 = 14; // tree-sitter 0.24.x uses ABI 14

/// Metadata for a single installed grammar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarInfo {
    /// ABI version the grammar was compiled with
    pub abi_version: u32,
    /// Seconds since the Unix epoch
    pub installed_at: String,
    /// Git commit hash (if available)
    pub commit: Option<String>,
}

/// Metadata store for all installed grammars
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GrammarMetadata {
    /// Map of grammar name to info
    pub grammars: HashMap<String, GrammarInfo>,
}

impl GrammarMetadata {
    /// Load metadata from a grammars directory, empty if absent or unreadable
    pub fn load(grammars_dir: &Path) -> Self {
        fs::read_to_string(Self::metadata_path(grammars_dir))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save metadata into a grammars directory
    pub fn save(&self, grammars_dir: &Path) -> Result<()> {
        fs::create_dir_all(grammars_dir)?;

        let content = serde_json::to_string_pretty(self).map_err(Error::Serialize)?;
        fs::write(Self::metadata_path(grammars_dir), content)?;
        Ok(())
    }

    fn metadata_path(grammars_dir: &Path) -> PathBuf {
        grammars_dir.join("metadata.json")
    }

    /// Record that a grammar was installed
    pub fn record_install(&mut self, lang: Language, commit: Option<String>) {
        self.grammars.insert(
            lang.grammar_name().to_string(),
            GrammarInfo {
                abi_version: TREE_SITTER_ABI_VERSION,
                installed_at: unix_timestamp(),
                commit,
            },
        );
    }

    /// Record that a grammar was uninstalled
    pub fn record_uninstall(&mut self, lang: Language) {
        self.grammars.remove(lang.grammar_name());
    }

    /// Check if a grammar needs reinstalling due to ABI mismatch
    pub fn needs_reinstall(&self, lang: Language) -> bool {
        self.grammars
            .get(lang.grammar_name())
            .is_some_and(|info| info.abi_version != TREE_SITTER_ABI_VERSION)
    }
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_secs().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serialization() {
        let mut metadata = GrammarMetadata::default();
        metadata.record_install(Language::Rust, Some("abc123".to_string()));

        let json = serde_json::to_string(&metadata).unwrap();
        let loaded: GrammarMetadata = serde_json::from_str(&json).unwrap();

        assert!(loaded.grammars.contains_key("rust"));
        assert_eq!(
            loaded.grammars["rust"].commit.as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_needs_reinstall() {
        let mut metadata = GrammarMetadata::default();
        metadata.record_install(Language::Rust, None);

        // Current version should not need reinstall
        assert!(!metadata.needs_reinstall(Language::Rust));

        if let Some(info) = metadata.grammars.get_mut("rust") {
            info.abi_version = 13;
        }

        assert!(metadata.needs_reinstall(Language::Rust));
        // Unknown grammars are never outdated
        assert!(!metadata.needs_reinstall(Language::Go));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let grammars = dir.path().join("grammars");

        let mut metadata = GrammarMetadata::default();
        metadata.record_install(Language::CSharp, None);
        metadata.save(&grammars).unwrap();

        let loaded = GrammarMetadata::load(&grammars);
        assert!(loaded.grammars.contains_key("c_sharp"));

        let mut loaded = loaded;
        loaded.record_uninstall(Language::CSharp);
        assert!(!loaded.grammars.contains_key("c_sharp"));
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GrammarMetadata::load(dir.path()).grammars.is_empty());
    }
}

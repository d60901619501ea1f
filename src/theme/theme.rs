use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::syntax::HighlightKind;

const DARK_FOREGROUND: &str = "#bbbbbb";
const DARK_BACKGROUND: &str = "#1e1e1e";
const LIGHT_FOREGROUND: &str = "#333333";
const LIGHT_BACKGROUND: &str = "#ffffff";

/// Scopes a rule applies to. VS Code accepts both a single
/// comma-separated string and an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScopeList {
    One(String),
    Many(Vec<String>),
}

impl ScopeList {
    pub fn iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            ScopeList::One(scopes) => Box::new(
                scopes
                    .split(',')
                    .map(str::trim)
                    .filter(|scope| !scope.is_empty()),
            ),
            ScopeList::Many(scopes) => Box::new(scopes.iter().map(String::as_str)),
        }
    }

    /// Exact membership, no selector matching
    pub fn contains(&self, scope: &str) -> bool {
        self.iter().any(|s| s == scope)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSettings {
    #[serde(default)]
    pub foreground: Option<String>,
    #[serde(default)]
    pub font_style: Option<String>,
}

impl RuleSettings {
    /// Inline CSS for a token styled by this rule
    pub fn css(&self, fallback_foreground: &str) -> String {
        let mut css = format!(
            "color:{}",
            self.foreground.as_deref().unwrap_or(fallback_foreground)
        );
        if let Some(font_style) = &self.font_style {
            for style in font_style.split_whitespace() {
                match style {
                    "italic" => css.push_str(";font-style:italic"),
                    "bold" => css.push_str(";font-weight:bold"),
                    "underline" => css.push_str(";text-decoration:underline"),
                    _ => {}
                }
            }
        }
        css
    }
}

/// A single `tokenColors` entry
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRule {
    #[serde(default)]
    pub scope: Option<ScopeList>,
    #[serde(default)]
    pub settings: RuleSettings,
}

impl TokenRule {
    /// Length of the longest selector in this rule matching `scope`
    fn match_len(&self, scope: &str) -> Option<usize> {
        self.scope
            .as_ref()?
            .iter()
            .filter(|selector| selector_matches(selector, scope))
            .map(str::len)
            .max()
    }
}

/// `keyword` matches `keyword` and `keyword.control.rust`, but not `keywords`
fn selector_matches(selector: &str, scope: &str) -> bool {
    if selector.is_empty() || selector.contains(char::is_whitespace) {
        return false;
    }
    match scope.strip_prefix(selector) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Complete theme definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub colors: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub token_colors: Vec<TokenRule>,
}

impl Theme {
    /// Read a theme from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| Error::Theme {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("theme")
    }

    pub fn is_light(&self) -> bool {
        self.kind.as_deref() == Some("light")
    }

    fn color(&self, key: &str) -> Option<&str> {
        self.colors.get(key).and_then(|v| v.as_str())
    }

    pub fn foreground(&self) -> &str {
        self.color("editor.foreground").unwrap_or(if self.is_light() {
            LIGHT_FOREGROUND
        } else {
            DARK_FOREGROUND
        })
    }

    pub fn background(&self) -> &str {
        self.color("editor.background").unwrap_or(if self.is_light() {
            LIGHT_BACKGROUND
        } else {
            DARK_BACKGROUND
        })
    }

    /// Foreground of the first rule whose scope list contains `scope`.
    ///
    /// The search stops at the first containing rule even when that rule
    /// sets no foreground.
    pub fn foreground_for_scope(&self, scope: &str) -> Option<&str> {
        self.token_colors
            .iter()
            .find(|rule| rule.scope.as_ref().is_some_and(|s| s.contains(scope)))
            .and_then(|rule| rule.settings.foreground.as_deref())
    }

    /// Resolve the style of a syntax element.
    ///
    /// Candidate scopes are tried in order; for the first one any rule
    /// matches, the most specific selector wins (later rules win ties).
    pub fn style_for(&self, kind: HighlightKind) -> Option<&RuleSettings> {
        for candidate in kind.scopes() {
            let best = self
                .token_colors
                .iter()
                .filter_map(|rule| rule.match_len(candidate).map(|len| (len, rule)))
                .max_by_key(|(len, _)| *len);
            if let Some((_, rule)) = best {
                return Some(&rule.settings);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEME: &str = r##"{
        "name": "Hanekawa",
        "type": "dark",
        "colors": { "editor.foreground": "#e0def4", "editor.background": "#191724" },
        "tokenColors": [
            { "settings": { "foreground": "#ffffff" } },
            { "scope": ["comment", "punctuation.definition.comment"], "settings": { "foreground": "#6e6a86", "fontStyle": "italic" } },
            { "scope": "keyword, storage.type", "settings": { "foreground": "#31748f" } },
            { "scope": "keyword.control", "settings": { "foreground": "#eb6f92", "fontStyle": "bold" } },
            { "scope": ["meta.declaration.annotation"], "settings": { "foreground": "#f6c177" } },
            { "scope": ["entity.name.function"], "settings": { "fontStyle": "underline" } },
            { "scope": ["meta.declaration.annotation"], "settings": { "foreground": "#000000" } }
        ]
    }"##;

    fn theme() -> Theme {
        Theme::parse(THEME).unwrap()
    }

    #[test]
    fn parses_metadata_and_colors() {
        let theme = theme();
        assert_eq!(theme.name(), "Hanekawa");
        assert!(!theme.is_light());
        assert_eq!(theme.foreground(), "#e0def4");
        assert_eq!(theme.background(), "#191724");
        assert_eq!(theme.token_colors.len(), 7);
    }

    #[test]
    fn falls_back_to_default_colors() {
        let theme = Theme::parse(r#"{ "type": "light", "tokenColors": [] }"#).unwrap();
        assert_eq!(theme.name(), "theme");
        assert_eq!(theme.foreground(), LIGHT_FOREGROUND);
        assert_eq!(theme.background(), LIGHT_BACKGROUND);
    }

    #[test]
    fn scope_lookup_takes_first_rule() {
        let theme = theme();
        assert_eq!(
            theme.foreground_for_scope("meta.declaration.annotation"),
            Some("#f6c177")
        );
    }

    #[test]
    fn scope_lookup_is_exact() {
        let theme = theme();
        assert_eq!(theme.foreground_for_scope("meta.declaration"), None);
        assert_eq!(theme.foreground_for_scope("keyword"), Some("#31748f"));
        assert_eq!(theme.foreground_for_scope("storage.type"), Some("#31748f"));
        assert_eq!(theme.foreground_for_scope("nonexistent"), None);
    }

    #[test]
    fn scope_lookup_stops_at_rule_without_foreground() {
        let theme = theme();
        assert_eq!(theme.foreground_for_scope("entity.name.function"), None);
    }

    #[test]
    fn selector_prefix_matching() {
        assert!(selector_matches("keyword", "keyword"));
        assert!(selector_matches("keyword", "keyword.control.rust"));
        assert!(!selector_matches("keyword", "keywords"));
        assert!(!selector_matches("source.rust keyword", "keyword"));
        assert!(!selector_matches("", "keyword"));
    }

    #[test]
    fn style_prefers_most_specific_selector() {
        let theme = theme();
        let style = theme.style_for(HighlightKind::Keyword).unwrap();
        assert_eq!(style.foreground.as_deref(), Some("#eb6f92"));
        assert_eq!(style.css("#fff"), "color:#eb6f92;font-weight:bold");
    }

    #[test]
    fn style_css_falls_back_to_foreground() {
        let theme = theme();
        let style = theme.style_for(HighlightKind::Function).unwrap();
        assert_eq!(style.css("#e0def4"), "color:#e0def4;text-decoration:underline");
    }

    #[test]
    fn style_for_unmatched_kind() {
        let theme = theme();
        assert!(theme.style_for(HighlightKind::Number).is_none());
        assert!(theme.style_for(HighlightKind::Default).is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let result = Theme::load(Path::new("/nonexistent/theme.json"));
        assert!(matches!(result, Err(Error::ReadFile { .. })));
    }

    #[test]
    fn load_reports_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Theme::load(&path), Err(Error::Theme { .. })));
    }
}

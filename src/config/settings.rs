use std::collections::HashMap;
use std::path::PathBuf;

/// Languages loaded while the highlighter initializes
pub const DEFAULT_PRELOAD: &[&str] = &["javascript", "rust", "c#", "c", "asm", "sh", "ts"];

/// Worker and plugin settings that can be customized via Rhai config
#[derive(Debug, Clone)]
pub struct Settings {
    // Highlighting
    pub theme: PathBuf,
    pub grammars_dir: PathBuf,
    pub auto_install: bool,
    pub preload: Vec<String>,

    // Short scope name -> full scope path for `.name` requests
    pub token_aliases: HashMap<String, String>,

    // Markup plugin
    pub layout: Option<String>,
    pub custom_tags: Vec<String>,
    pub renderer: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let grammars_dir = dirs::config_dir()
            .map(|c| c.join("shade").join("grammars"))
            .unwrap_or_else(|| PathBuf::from("grammars"));

        Self {
            theme: PathBuf::from("hanekawa.json"),
            grammars_dir,
            auto_install: true,
            preload: DEFAULT_PRELOAD.iter().map(|l| l.to_string()).collect(),

            token_aliases: HashMap::from([(
                "fn".to_string(),
                "meta.declaration.annotation".to_string(),
            )]),

            layout: None,
            custom_tags: Vec::new(),
            renderer: None,
        }
    }
}

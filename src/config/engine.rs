use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rhai::{Engine, Scope};

use super::Settings;
use crate::error::{Error, Result};

/// The Rhai scripting engine for configuration
pub struct ConfigEngine {
    engine: Engine,
    settings: Arc<RwLock<Settings>>,
}

impl ConfigEngine {
    pub fn new() -> Self {
        let settings = Arc::new(RwLock::new(Settings::default()));
        let engine = Self::create_engine(Arc::clone(&settings));

        Self { engine, settings }
    }

    fn create_engine(settings: Arc<RwLock<Settings>>) -> Engine {
        let mut engine = Engine::new();

        // Limit script execution for safety
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_theme", move |path: &str| {
                if let Ok(mut settings) = s.write() {
                    settings.theme = PathBuf::from(path);
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("get_theme", move || -> String {
                s.read()
                    .map(|s| s.theme.display().to_string())
                    .unwrap_or_default()
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_grammars_dir", move |path: &str| {
                if let Ok(mut settings) = s.write() {
                    settings.grammars_dir = PathBuf::from(path);
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_auto_install", move |enabled: bool| {
                if let Ok(mut settings) = s.write() {
                    settings.auto_install = enabled;
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("preload", move |lang: &str| {
                if let Ok(mut settings) = s.write() {
                    if !settings.preload.iter().any(|l| l == lang) {
                        settings.preload.push(lang.to_string());
                    }
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("clear_preload", move || {
                if let Ok(mut settings) = s.write() {
                    settings.preload.clear();
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("alias", move |short: &str, scope: &str| {
                if let Ok(mut settings) = s.write() {
                    settings
                        .token_aliases
                        .insert(short.to_string(), scope.to_string());
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_layout", move |layout: &str| {
                if let Ok(mut settings) = s.write() {
                    settings.layout = Some(layout.to_string());
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("add_custom_tag", move |tag: &str| {
                if let Ok(mut settings) = s.write() {
                    settings.custom_tags.push(tag.to_string());
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_renderer", move |program: &str| {
                if let Ok(mut settings) = s.write() {
                    settings.renderer = Some(program.to_string());
                }
            });
        }

        engine.register_fn("print", |msg: &str| {
            tracing::info!(target: "shade::config", "{msg}");
        });

        engine
    }

    /// Load and execute a config file
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        self.eval(&content)
    }

    /// Evaluate a Rhai script string
    pub fn eval(&mut self, script: &str) -> Result<()> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|e| Error::Config(format!("parse error: {e}")))?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(())
    }

    /// Get the current settings (cloned)
    pub fn settings(&self) -> Settings {
        self.settings.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shade"))
    }

    /// Get the default config file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("init.rhai"))
    }

    /// Load the default config file if it exists
    pub fn load_default(&mut self) -> Result<()> {
        if let Some(config_file) = Self::config_file() {
            if config_file.exists() {
                return self.load_file(&config_file);
            }
        }
        Ok(()) // No config file is fine
    }
}

impl Default for ConfigEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_theme() {
        let mut engine = ConfigEngine::new();
        engine.eval(r#"set_theme("themes/nord.json");"#).unwrap();
        assert_eq!(engine.settings().theme, PathBuf::from("themes/nord.json"));
    }

    #[test]
    fn test_default_alias_present() {
        let engine = ConfigEngine::new();
        assert_eq!(
            engine.settings().token_aliases.get("fn").map(String::as_str),
            Some("meta.declaration.annotation")
        );
    }

    #[test]
    fn test_alias_extends_table() {
        let mut engine = ConfigEngine::new();
        engine.eval(r#"alias("kw", "keyword.control");"#).unwrap();
        let settings = engine.settings();
        assert_eq!(
            settings.token_aliases.get("kw"),
            Some(&"keyword.control".to_string())
        );
        assert!(settings.token_aliases.contains_key("fn"));
    }

    #[test]
    fn test_preload_dedupes() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(
                r#"
                clear_preload();
                preload("rust");
                preload("rust");
                preload("go");
            "#,
            )
            .unwrap();
        assert_eq!(engine.settings().preload, vec!["rust", "go"]);
    }

    #[test]
    fn test_plugin_settings() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(
                r#"
                set_layout("$lib/Layout.svelte");
                add_custom_tag("Callout");
                add_custom_tag("Figure");
                set_renderer("mdsvexrs");
            "#,
            )
            .unwrap();
        let settings = engine.settings();
        assert_eq!(settings.layout.as_deref(), Some("$lib/Layout.svelte"));
        assert_eq!(settings.custom_tags, vec!["Callout", "Figure"]);
        assert_eq!(settings.renderer.as_deref(), Some("mdsvexrs"));
    }

    #[test]
    fn test_invalid_script() {
        let mut engine = ConfigEngine::new();
        let result = engine.eval("this is not valid rhai {{{");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_runaway_script_is_stopped() {
        let mut engine = ConfigEngine::new();
        let result = engine.eval(
            r#"
            set_theme("before.json");
            let x = 0;
            loop { x += 1; }
        "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
        // Settings applied before the limit hit are kept
        assert_eq!(engine.settings().theme, PathBuf::from("before.json"));
    }

    #[test]
    fn test_expression_depth_limit() {
        let mut engine = ConfigEngine::new();
        let deep = format!("let x = {}1{};", "(".repeat(100), ")".repeat(100));
        match engine.eval(&deep) {
            Err(Error::Config(msg)) => assert!(msg.starts_with("parse error"), "{msg}"),
            other => panic!("expected a parse error, got {other:?}"),
        }

        let shallow = format!("let x = {}1{};", "(".repeat(10), ")".repeat(10));
        engine.eval(&shallow).unwrap();
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.rhai");
        std::fs::write(
            &path,
            r#"
            set_auto_install(false);
            set_grammars_dir("/opt/grammars");
        "#,
        )
        .unwrap();

        let mut engine = ConfigEngine::new();
        engine.load_file(&path).unwrap();

        let settings = engine.settings();
        assert!(!settings.auto_install);
        assert_eq!(settings.grammars_dir, PathBuf::from("/opt/grammars"));
        assert_eq!(settings.theme, PathBuf::from("hanekawa.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let mut engine = ConfigEngine::new();
        let result = engine.load_file(Path::new("/nonexistent/init.rhai"));
        assert!(matches!(result, Err(Error::ReadFile { .. })));
    }
}

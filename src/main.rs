use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{debug, error, info};

mod config;
mod engine;
mod error;
mod logging;
mod plugin;
mod render;
mod syntax;
mod theme;
mod transform;
mod worker;

use config::{ConfigEngine, Settings};
use engine::TreeSitterEngine;
use error::{Error, Result};
use plugin::{CommandRenderer, MarkupPlugin, Options};
use syntax::{InstallOutcome, Language, LanguageRegistry};
use theme::Theme;
use worker::Worker;

#[derive(Parser)]
#[command(name = "shade", about = "Syntax highlighting worker and markdown plugin")]
struct Cli {
    /// Config script (defaults to <config dir>/shade/init.rhai)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Theme JSON file, overrides the configured one
    #[arg(long, global = true)]
    theme: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer highlight requests on stdin, one JSON line each (default)
    Serve,

    /// Run the markdown plugin on a single file and print the result
    Markup {
        #[arg()]
        file: PathBuf,

        /// Layout component handed to the renderer
        #[arg(long)]
        layout: Option<String>,

        /// Tag the renderer should leave as a component (repeatable)
        #[arg(long = "custom-tag")]
        custom_tags: Vec<String>,

        /// Renderer program
        #[arg(long)]
        renderer: Option<String>,
    },

    /// Manage tree-sitter grammars
    Grammars {
        #[command(subcommand)]
        action: GrammarsCommand,
    },
}

#[derive(Subcommand)]
enum GrammarsCommand {
    /// Show every supported language and whether its grammar is installed
    List,

    /// Download and compile grammars
    Install {
        #[arg(required = true)]
        languages: Vec<String>,
    },

    /// Remove installed grammars
    Uninstall {
        #[arg(required = true)]
        languages: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(theme) = cli.theme {
        settings.theme = theme;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Markup {
            file,
            layout,
            custom_tags,
            renderer,
        } => markup(settings, &file, layout, custom_tags, renderer),
        Command::Grammars { action } => grammars(settings, action),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut config = ConfigEngine::new();
    match path {
        Some(path) => config.load_file(path)?,
        None => config.load_default()?,
    }
    Ok(config.settings())
}

async fn serve(settings: Settings) -> Result<()> {
    let theme = Arc::new(Theme::load(&settings.theme)?);
    info!(theme = theme.name(), path = %settings.theme.display(), "loaded theme");

    let Settings {
        grammars_dir,
        auto_install,
        preload,
        token_aliases,
        ..
    } = settings;

    let engine_theme = Arc::clone(&theme);
    let mut worker = Worker::spawn(
        move || {
            let registry = LanguageRegistry::new(grammars_dir, auto_install);
            let mut engine = TreeSitterEngine::new(registry, engine_theme);
            engine.preload(&preload);
            Ok(engine)
        },
        theme,
        token_aliases,
    );

    worker
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}

fn markup(
    settings: Settings,
    file: &Path,
    layout: Option<String>,
    custom_tags: Vec<String>,
    renderer: Option<String>,
) -> Result<()> {
    let program = plugin::renderer_command(renderer, &settings);
    let plugin = MarkupPlugin::new(
        Options::from_settings(&settings, layout, custom_tags),
        CommandRenderer::from_command(&program),
    );
    debug!(options = ?plugin.options(), renderer = %program, "markup plugin ready");

    if !plugin.process_file(file, &mut std::io::stdout().lock())? {
        info!(plugin = plugin.name(), file = %file.display(), "not a markdown file, skipped");
    }
    Ok(())
}

fn grammars(settings: Settings, action: GrammarsCommand) -> Result<()> {
    let mut registry = LanguageRegistry::new(settings.grammars_dir, true);

    match action {
        GrammarsCommand::List => {
            let installed = registry.installed();
            let mut out = std::io::stdout().lock();
            writeln!(out, "grammars in {}", registry.grammars_dir().display())?;
            for lang in Language::all() {
                let status = if installed.contains(&lang) {
                    "installed"
                } else {
                    "-"
                };
                writeln!(out, "  {:<12} {:<12} {status}", lang.name(), lang.grammar_name())?;
            }
        }
        GrammarsCommand::Install { languages } => {
            for name in languages {
                let lang = resolve(&name)?;
                let installer = registry.installer_mut();
                let outcome = match installer.install(lang)? {
                    InstallOutcome::AlreadyInstalled => installer.ensure_compatible(lang)?,
                    outcome => outcome,
                };
                info!(grammar = lang.grammar_name(), ?outcome, "grammar ready");
            }
        }
        GrammarsCommand::Uninstall { languages } => {
            for name in languages {
                let lang = resolve(&name)?;
                registry.installer_mut().uninstall(lang)?;
            }
        }
    }
    Ok(())
}

fn resolve(name: &str) -> Result<Language> {
    Language::from_name(name).ok_or_else(|| Error::UnknownLanguage(name.to_string()))
}

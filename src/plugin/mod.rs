//! Markdown preprocessor hook
//!
//! Hands `.md` files to an external renderer and returns the component code
//! it produces. Any other file passes through untouched.

mod renderer;

use std::io::Write;
use std::path::Path;

pub use renderer::{CommandRenderer, DEFAULT_RENDERER};

use crate::config::Settings;
use crate::error::{Error, Result};

/// Renderer program to run: the explicit one, else the configured one, else
/// the default
pub fn renderer_command(explicit: Option<String>, settings: &Settings) -> String {
    explicit
        .or_else(|| settings.renderer.clone())
        .unwrap_or_else(|| DEFAULT_RENDERER.to_string())
}

/// The external markdown-to-component compiler
pub trait Render {
    fn render(&self, content: &str, options: &RenderOptions) -> Result<String>;
}

/// Options handed to the renderer on every call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub layout: Option<String>,
    pub custom_tags: Vec<String>,
}

impl RenderOptions {
    pub fn set_layout(&mut self, layout: Option<String>) {
        self.layout = layout;
    }

    pub fn add_custom_tag(&mut self, tag: impl Into<String>) {
        self.custom_tags.push(tag.into());
    }
}

/// User-facing plugin options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub layout: Option<String>,
    pub custom_tags: Vec<String>,
}

impl Options {
    /// Merge command line options over the configured ones. An explicit
    /// layout replaces the configured layout; tags accumulate, configured first.
    pub fn from_settings(
        settings: &Settings,
        layout: Option<String>,
        custom_tags: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut tags = settings.custom_tags.clone();
        tags.extend(custom_tags);
        Self {
            layout: layout.or_else(|| settings.layout.clone()),
            custom_tags: tags,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MarkupInput<'a> {
    pub content: &'a str,
    pub filename: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub code: String,
}

pub struct MarkupPlugin<R> {
    options: RenderOptions,
    renderer: R,
}

impl<R: Render> MarkupPlugin<R> {
    pub fn new(options: Options, renderer: R) -> Self {
        let mut render_options = RenderOptions::default();
        render_options.set_layout(options.layout);
        for tag in options.custom_tags {
            render_options.add_custom_tag(tag);
        }

        Self {
            options: render_options,
            renderer,
        }
    }

    pub fn name(&self) -> &'static str {
        "shade"
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render markdown files; `None` means the file is not ours to handle
    pub fn markup(&self, input: MarkupInput<'_>) -> Result<Option<Processed>> {
        match input.filename {
            Some(name) if name.ends_with(".md") => {
                let code = self.renderer.render(input.content, &self.options)?;
                Ok(Some(Processed { code }))
            }
            _ => Ok(None),
        }
    }

    /// Run the plugin on a file, writing the rendered code to `out`.
    /// Returns whether the file was handled; nothing is written otherwise.
    pub fn process_file<W: Write>(&self, path: &Path, out: &mut W) -> Result<bool> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let filename = path.to_string_lossy();
        let input = MarkupInput {
            content: &content,
            filename: Some(&filename),
        };
        match self.markup(input)? {
            Some(processed) => {
                out.write_all(processed.code.as_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{Render, RenderOptions};
use crate::error::{Error, Result};

/// Renderer program used when none is configured
pub const DEFAULT_RENDERER: &str = "mdsvexrs";

/// Runs an external program: content on stdin, component code on stdout
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a configured command line such as `node render.mjs` into
    /// program and leading arguments
    pub fn from_command(command: &str) -> Self {
        let mut parts = command.split_whitespace();
        let program = parts.next().unwrap_or(DEFAULT_RENDERER);
        parts.fold(Self::new(program), |renderer, arg| renderer.arg(arg))
    }

    /// Extra arguments placed before the generated option flags
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self, options: &RenderOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(layout) = &options.layout {
            cmd.arg("--layout").arg(layout);
        }
        for tag in &options.custom_tags {
            cmd.arg("--custom-tag").arg(tag);
        }
        cmd
    }
}

impl Render for CommandRenderer {
    fn render(&self, content: &str, options: &RenderOptions) -> Result<String> {
        let mut child = self
            .command(options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Renderer(format!("failed to run {}: {e}", self.program)))?;

        debug!(program = %self.program, bytes = content.len(), "rendering markdown");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Renderer("renderer stdin unavailable".to_string()))?;

        // stdin is written while stdout is drained
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(content.as_bytes()));
            let output = child.wait_with_output();
            // Broken pipe here means the child stopped reading; its exit status decides
            let _ = writer.join();
            output
        })?;

        if !output.status.success() {
            return Err(Error::Renderer(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::Renderer(format!("{} produced invalid UTF-8: {e}", self.program)))
    }
}

//! Newline-delimited JSON messages exchanged with the supervising process

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub lang: String,
    #[serde(default)]
    pub inline: bool,
    pub code: String,
    #[serde(default)]
    pub meta: Option<String>,
}

impl Request {
    /// Scope name for single-token requests (`lang` written as `.scope`)
    pub fn token_scope(&self) -> Option<&str> {
        self.lang.strip_prefix('.')
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub html: String,
    /// Milliseconds spent on this request
    pub elapsed: f64,
    /// Milliseconds spent on every request so far, this one included
    pub sum: f64,
}

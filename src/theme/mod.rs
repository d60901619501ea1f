//! Color themes in the VS Code `tokenColors` format
//!
//! A theme is read once at startup and shared read-only between the
//! single-token lookup and the HTML renderer.

mod theme;

pub use theme::Theme;

//! HTML output for highlighted code blocks

mod html;

pub use html::render;

/// Shape of the generated markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Structure {
    /// A themed `<pre><code>` with one `<span class="line">` per line
    #[default]
    Classic,
    /// Bare token spans, lines separated by `<br>`
    Inline,
}

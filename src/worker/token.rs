use std::collections::HashMap;

use html_escape::encode_text;

use crate::theme::Theme;

/// Render `code` as a single token coloured for `scope`, skipping the highlighter.
///
/// `scope` is first translated through `aliases`. Without a matching theme
/// rule the escaped code is returned as is.
pub fn colorize(
    code: &str,
    scope: &str,
    aliases: &HashMap<String, String>,
    theme: &Theme,
) -> String {
    let scope = aliases.get(scope).map(String::as_str).unwrap_or(scope);
    let escaped = encode_text(code);

    match theme.foreground_for_scope(scope) {
        Some(color) => {
            format!(r#"<code data-pretty-code-figure style="color: {color}">{escaped}</code>"#)
        }
        None => escaped.into_owned(),
    }
}

//! Syntax highlighter using Tree-sitter
//!
//! Parses a whole snippet and splits the resulting node spans per line.

use std::ops::Range;

use tree_sitter::{Parser, Tree};

use super::languages::Language;
use crate::error::{Error, Result};

/// A highlight span within a line
#[derive(Debug, Clone)]
pub struct Highlight {
    pub start: usize, // Column start (byte offset within line)
    pub end: usize,   // Column end (byte offset within line)
    pub kind: HighlightKind,
}

/// Types of syntax elements for highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Keyword,
    String,
    Number,
    Comment,
    Function,
    Type,
    Variable,
    Operator,
    Punctuation,
    Property,
    Constant,
    Namespace,
    Parameter,
    Label,
    Default,
}

impl HighlightKind {
    /// Map a Tree-sitter node type to a highlight kind
    pub fn from_node_type(node_type: &str, lang: Language) -> Self {
        // Common patterns across languages
        match node_type {
            // Comments
            "comment" | "line_comment" | "block_comment" | "doc_comment" => HighlightKind::Comment,

            // Strings
            "string"
            | "string_literal"
            | "raw_string"
            | "raw_string_literal"
            | "char_literal"
            | "string_content"
            | "escape_sequence"
            | "interpreted_string_literal" => HighlightKind::String,

            // Numbers
            "number" | "integer" | "float" | "integer_literal" | "float_literal"
            | "number_literal" => HighlightKind::Number,

            // Keywords (language-specific patterns included)
            "keyword" | "storage_class" | "visibility_modifier" | "mutable_specifier" => {
                HighlightKind::Keyword
            }

            // Functions
            "function_item"
            | "function_definition"
            | "method_definition"
            | "function_declaration"
            | "call_expression"
            | "method_call" => HighlightKind::Function,

            // Types
            "type"
            | "type_identifier"
            | "primitive_type"
            | "type_annotation"
            | "type_arguments"
            | "generic_type"
            | "struct_item"
            | "enum_item"
            | "trait_item"
            | "class_definition"
            | "interface_declaration" => HighlightKind::Type,

            // Variables and identifiers
            "identifier" | "variable" | "field_identifier" | "shorthand_field_identifier" => {
                HighlightKind::Variable
            }

            // Operators
            "operator"
            | "binary_expression"
            | "unary_expression"
            | "comparison_operator"
            | "assignment_operator" => HighlightKind::Operator,

            // Punctuation
            "delimiter" | "bracket" | "parenthesis" | "brace" | "semicolon" | "comma" | "colon"
            | "arrow" | "fat_arrow" => HighlightKind::Punctuation,

            // Properties/fields
            "property" | "property_identifier" | "field_expression" | "member_expression" => {
                HighlightKind::Property
            }

            // Constants
            "true" | "false" | "null" | "none" | "nil" | "boolean" | "constant" | "const_item" => {
                HighlightKind::Constant
            }

            // Namespaces/modules
            "namespace" | "module" | "use_declaration" | "import_statement" | "import" | "use" => {
                HighlightKind::Namespace
            }

            // Parameters
            "parameter" | "formal_parameter" | "parameters" => HighlightKind::Parameter,

            // Labels
            "label" | "loop_label" | "lifetime" => HighlightKind::Label,

            // Language-specific patterns
            _ => Self::from_language_specific(node_type, lang),
        }
    }

    fn from_language_specific(node_type: &str, lang: Language) -> Self {
        match lang {
            Language::Rust => Self::from_rust_node(node_type),
            Language::Python => Self::from_python_node(node_type),
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                Self::from_js_node(node_type)
            }
            Language::Go => Self::from_go_node(node_type),
            Language::CSharp => Self::from_csharp_node(node_type),
            Language::C | Language::Cpp => Self::from_c_node(node_type),
            Language::Bash => Self::from_bash_node(node_type),
            Language::Asm => Self::from_asm_node(node_type),
            _ => HighlightKind::Default,
        }
    }

    fn from_rust_node(node_type: &str) -> Self {
        match node_type {
            "let" | "fn" | "pub" | "mod" | "use" | "struct" | "enum" | "trait" | "impl" | "for"
            | "loop" | "while" | "if" | "else" | "match" | "return" | "break" | "continue"
            | "async" | "await" | "const" | "static" | "mut" | "ref" | "self" | "super"
            | "crate" | "where" | "as" | "in" | "dyn" | "move" | "type" | "unsafe" | "extern" => {
                HighlightKind::Keyword
            }
            "macro_invocation" | "macro_definition" | "macro_rules" => HighlightKind::Function,
            "attribute_item" | "inner_attribute_item" => HighlightKind::Label,
            _ => HighlightKind::Default,
        }
    }

    fn from_python_node(node_type: &str) -> Self {
        match node_type {
            "def" | "class" | "if" | "elif" | "else" | "for" | "while" | "try" | "except"
            | "finally" | "with" | "as" | "import" | "from" | "return" | "yield" | "raise"
            | "pass" | "break" | "continue" | "lambda" | "and" | "or" | "not" | "in" | "is"
            | "global" | "nonlocal" | "assert" | "async" | "await" => HighlightKind::Keyword,
            "decorator" | "decorated_definition" => HighlightKind::Label,
            _ => HighlightKind::Default,
        }
    }

    fn from_js_node(node_type: &str) -> Self {
        match node_type {
            "function" | "const" | "let" | "var" | "if" | "else" | "for" | "while" | "do"
            | "switch" | "case" | "default" | "break" | "continue" | "return" | "throw" | "try"
            | "catch" | "finally" | "class" | "extends" | "new" | "this" | "super" | "import"
            | "export" | "from" | "async" | "await" | "yield" | "typeof" | "instanceof" | "in"
            | "of" | "delete" | "void" | "interface" | "type" | "enum" | "implements"
            | "public" | "private" | "protected" | "readonly" | "abstract" | "static" => {
                HighlightKind::Keyword
            }
            "jsx_element"
            | "jsx_opening_element"
            | "jsx_closing_element"
            | "jsx_self_closing_element" => HighlightKind::Type,
            _ => HighlightKind::Default,
        }
    }

    fn from_csharp_node(node_type: &str) -> Self {
        match node_type {
            "using" | "namespace" | "class" | "struct" | "record" | "interface" | "enum"
            | "public" | "private" | "protected" | "internal" | "static" | "readonly"
            | "override" | "virtual" | "abstract" | "sealed" | "async" | "await" | "var"
            | "new" | "return" | "if" | "else" | "for" | "foreach" | "while" | "switch"
            | "case" | "break" | "continue" | "try" | "catch" | "finally" | "throw" | "in"
            | "out" | "ref" | "this" | "base" | "get" | "set" | "void" => HighlightKind::Keyword,
            "predefined_type" => HighlightKind::Type,
            "attribute" | "attribute_list" => HighlightKind::Label,
            _ => HighlightKind::Default,
        }
    }

    fn from_c_node(node_type: &str) -> Self {
        match node_type {
            "if" | "else" | "for" | "while" | "do" | "switch" | "case" | "default" | "break"
            | "continue" | "return" | "goto" | "struct" | "union" | "enum" | "typedef"
            | "sizeof" | "static" | "extern" | "const" | "volatile" | "inline" | "class"
            | "namespace" | "template" | "typename" | "public" | "private" | "protected"
            | "virtual" | "new" | "delete" | "this" | "auto" => HighlightKind::Keyword,
            "#include" | "#define" | "#ifdef" | "#ifndef" | "#if" | "#else" | "#endif"
            | "preproc_directive" => HighlightKind::Label,
            "system_lib_string" => HighlightKind::String,
            "sized_type_specifier" => HighlightKind::Type,
            _ => HighlightKind::Default,
        }
    }

    fn from_bash_node(node_type: &str) -> Self {
        match node_type {
            "if" | "then" | "else" | "elif" | "fi" | "for" | "while" | "until" | "do" | "done"
            | "case" | "esac" | "in" | "function" | "local" | "export" | "declare"
            | "unset" => HighlightKind::Keyword,
            "command_name" => HighlightKind::Function,
            "variable_name" | "special_variable_name" => HighlightKind::Variable,
            _ => HighlightKind::Default,
        }
    }

    fn from_asm_node(node_type: &str) -> Self {
        match node_type {
            "word" => HighlightKind::Keyword,
            "reg" => HighlightKind::Variable,
            "int" => HighlightKind::Number,
            "meta" => HighlightKind::Label,
            _ => HighlightKind::Default,
        }
    }

    /// TextMate scopes this kind is looked up under, most specific first
    pub fn scopes(&self) -> &'static [&'static str] {
        match self {
            HighlightKind::Keyword => &["keyword.control", "keyword", "storage.type", "storage"],
            HighlightKind::String => &["string.quoted", "string"],
            HighlightKind::Number => &["constant.numeric"],
            HighlightKind::Comment => &["comment.line", "comment"],
            HighlightKind::Function => &["entity.name.function", "support.function"],
            HighlightKind::Type => &["entity.name.type", "support.type", "storage.type"],
            HighlightKind::Variable => &["variable.other", "variable"],
            HighlightKind::Operator => &["keyword.operator"],
            HighlightKind::Punctuation => &["punctuation"],
            HighlightKind::Property => &[
                "variable.other.property",
                "support.type.property-name",
                "variable.other",
            ],
            HighlightKind::Constant => &["constant.language", "constant"],
            HighlightKind::Namespace => &["entity.name.namespace", "entity.name.module"],
            HighlightKind::Parameter => &["variable.parameter"],
            HighlightKind::Label => &[
                "entity.name.label",
                "storage.modifier.lifetime",
                "meta.attribute",
            ],
            HighlightKind::Default => &[],
        }
    }

    fn from_go_node(node_type: &str) -> Self {
        match node_type {
            "func" | "package" | "import" | "type" | "struct" | "interface" | "map" | "chan"
            | "if" | "else" | "for" | "range" | "switch" | "case" | "default" | "select"
            | "break" | "continue" | "return" | "go" | "defer" | "var" | "const"
            | "fallthrough" => HighlightKind::Keyword,
            _ => HighlightKind::Default,
        }
    }
}

/// A line with its syntax highlights
#[derive(Debug, Clone, Default)]
pub struct HighlightedLine {
    pub highlights: Vec<Highlight>,
}

impl HighlightedLine {
    /// Get the highlight kind at a given column
    pub fn kind_at(&self, col: usize) -> HighlightKind {
        for h in &self.highlights {
            if col >= h.start && col < h.end {
                return h.kind;
            }
        }
        HighlightKind::Default
    }
}

/// Reusable Tree-sitter parser
pub struct Highlighter {
    parser: Parser,
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Parse `source` with `grammar` and return one entry per `\n`-separated line
    pub fn highlight(
        &mut self,
        grammar: &tree_sitter::Language,
        lang: Language,
        source: &str,
    ) -> Result<Vec<HighlightedLine>> {
        self.parser
            .set_language(grammar)
            .map_err(|e| Error::unavailable(lang.name(), e.to_string()))?;

        let tree = self.parser.parse(source, None).ok_or_else(|| Error::Parse {
            language: lang.name().to_string(),
        })?;

        Ok(build_highlights(source, &tree, lang))
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect highlight spans for the whole tree, split at line breaks.
///
/// Nodes are visited in pre-order, so a string or comment lands in a line's
/// span list before the pieces inside it.
fn build_highlights(source: &str, tree: &Tree, lang: Language) -> Vec<HighlightedLine> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let mut lines = vec![HighlightedLine::default(); line_starts.len()];

    let mut cursor = tree.walk();
    'walk: loop {
        let node = cursor.node();
        let kind = HighlightKind::from_node_type(node.kind(), lang);
        if kind != HighlightKind::Default
            && (node.child_count() == 0 || is_highlightable_parent(node.kind()))
        {
            push_span(&mut lines, &line_starts, source.len(), node.byte_range(), kind);
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    lines
}

/// Record `range` on every line it touches, in line-relative byte offsets.
/// Newlines are never part of a span.
fn push_span(
    lines: &mut [HighlightedLine],
    line_starts: &[usize],
    source_len: usize,
    range: Range<usize>,
    kind: HighlightKind,
) {
    let first = line_starts
        .partition_point(|&start| start <= range.start)
        .saturating_sub(1);

    for (row, (line, &line_start)) in lines.iter_mut().zip(line_starts).enumerate().skip(first) {
        if row > first && line_start >= range.end {
            break;
        }
        let line_end = line_starts
            .get(row + 1)
            .map_or(source_len, |next| next - 1);

        let start = range.start.max(line_start) - line_start;
        let end = range.end.min(line_end).max(line_start) - line_start;
        if start < end {
            line.highlights.push(Highlight { start, end, kind });
        }
    }
}

/// Nodes styled as a whole even though they have children
fn is_highlightable_parent(node_type: &str) -> bool {
    matches!(
        node_type,
        "string"
            | "string_literal"
            | "raw_string"
            | "raw_string_literal"
            | "template_string"
            | "verbatim_string_literal"
            | "comment"
            | "line_comment"
            | "block_comment"
    )
}

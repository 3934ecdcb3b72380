//! CF-009: Identifier naming helpers for code generated from templates.

/// Rust reserved words, strict and reserved-for-future-use.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

pub fn is_rust_keyword(s: &str) -> bool {
    RUST_KEYWORDS.contains(&s)
}

/// `BucketName` → `bucket_name`. Every uppercase letter after the first
/// character starts a new word, so acronyms split per letter.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// `bucket_name`, `my-function` or `my function` → `BucketName` / `MyFunction`.
pub fn to_pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if matches!(c, '_' | '-' | ' ') {
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Turn an arbitrary name into a valid Rust identifier.
///
/// A leading digit gets a `_` prefix and any other invalid leading character
/// becomes `_`. Later invalid characters are dropped. Keywords get a `_`
/// suffix and an empty result is `_`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    let mut chars = name.chars();

    match chars.next() {
        None => return "_".to_string(),
        Some(c) if c.is_alphabetic() || c == '_' => out.push(c),
        Some(c) if c.is_numeric() => {
            out.push('_');
            out.push(c);
        }
        Some(_) => out.push('_'),
    }

    out.extend(chars.filter(|c| c.is_alphanumeric() || *c == '_'));

    if is_rust_keyword(&out) {
        out.push('_');
    }
    out
}

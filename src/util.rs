//! Shared utility functions
//!
//! Naming and text helpers used by the model, the synthesizer and the
//! generators.

/// Prefixes stripped from accessor names to obtain the field name.
pub const ACCESSOR_PREFIXES: [&str; 3] = ["get_", "is_", "has_"];

/// Convert PascalCase or camelCase to snake_case
///
/// # Examples
/// ```
/// use declgen::util::to_snake_case;
/// assert_eq!(to_snake_case("PointSubclass"), "point_subclass");
/// assert_eq!(to_snake_case("fooBar"), "foo_bar");
/// ```
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Strip a conventional accessor prefix (`get_`, `is_`, `has_`).
///
/// Names consisting of the prefix alone are returned unchanged.
///
/// # Examples
/// ```
/// use declgen::util::field_name_from_accessor;
/// assert_eq!(field_name_from_accessor("get_value"), "value");
/// assert_eq!(field_name_from_accessor("is_active"), "active");
/// assert_eq!(field_name_from_accessor("size"), "size");
/// ```
pub fn field_name_from_accessor(accessor: &str) -> &str {
    for prefix in ACCESSOR_PREFIXES {
        if let Some(rest) = accessor.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    accessor
}

/// Substitute `$` placeholders left to right with the given arguments.
///
/// `$$` stands for a literal dollar sign. Surplus placeholders are left in
/// place; surplus arguments are ignored.
///
/// # Examples
/// ```
/// use declgen::util::substitute_placeholders;
/// let text = substitute_placeholders("The $ has to be $.", &["x", "even"]);
/// assert_eq!(text, "The x has to be even.");
/// assert_eq!(substitute_placeholders::<&str>("^a$$", &[]), "^a$");
/// ```
pub fn substitute_placeholders<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'$') {
            chars.next();
            out.push('$');
            continue;
        }
        match args.next() {
            Some(arg) => out.push_str(arg.as_ref()),
            None => out.push('$'),
        }
    }
    out
}

/// Escape literal dollar signs so the text survives placeholder substitution.
pub fn escape_placeholders(s: &str) -> String {
    s.replace('$', "$$")
}

/// Count the `$` placeholders in a template (ignoring `$$`).
pub fn count_placeholders(template: &str) -> usize {
    let mut count = 0;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'$') {
                chars.next();
            } else {
                count += 1;
            }
        }
    }
    count
}

/// Turn a `$` template into a Rust format string with `{:?}` holes.
///
/// Braces are doubled so that text such as regex quantifiers survives
/// `format!`.
pub fn template_to_format_string(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => out.push_str("{{"),
            '}' => out.push_str("}}"),
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                out.push('$');
            }
            '$' => out.push_str("{:?}"),
            other => out.push(other),
        }
    }
    out
}

/// Render a string as a Rust string literal.
///
/// Uses a raw string when the text contains backslashes or quotes so that
/// regex patterns read the same in generated code as in the declaration.
pub fn rust_string_literal(s: &str) -> String {
    if !s.contains('\\') && !s.contains('"') {
        return format!("\"{}\"", s.replace('\n', "\\n"));
    }
    let mut hashes = String::from("#");
    while s.contains(&format!("\"{}", hashes)) {
        hashes.push('#');
    }
    format!("r{hashes}\"{s}\"{hashes}")
}

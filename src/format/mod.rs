//! Code Formatting Module
//!
//! Generated units are pretty-printed with prettyplease. Plain `//` comments
//! do not survive the round trip through `syn`, so provenance lines are added
//! after formatting.

/// Format a generated Rust unit
pub fn format_rust(code: &str) -> Result<String, FormatError> {
    match syn::parse_file(code) {
        Ok(syntax_tree) => Ok(prettyplease::unparse(&syntax_tree)),
        Err(e) => Err(FormatError::Parse {
            message: e.to_string(),
        }),
    }
}

/// Format when enabled, otherwise only check that the unit parses
pub fn finish_unit(code: &str, auto_format: bool) -> Result<String, FormatError> {
    if auto_format {
        format_rust(code)
    } else {
        format_rust(code)?;
        Ok(code.to_string())
    }
}

/// Prepend `//` lines to a formatted unit
pub fn with_header(lines: &[String], code: &str) -> String {
    if lines.is_empty() {
        return code.to_string();
    }
    let mut out = String::new();
    for line in lines {
        out.push_str(format!("// {}", line).trim_end());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(code);
    out
}

/// Formatting errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Generated text is not valid Rust
    Parse { message: String },
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::Parse { message } => {
                write!(f, "generated code does not parse: {}", message)
            }
        }
    }
}

impl std::error::Error for FormatError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rust_simple() {
        let code = "impl P{fn area(&self)->u64{let result:u64={self.w*2};result}}";
        let result = format_rust(code).unwrap();

        assert!(result.contains("fn area(&self) -> u64"));
        assert!(result.contains("let result: u64 = "));
        assert!(result.contains("self.w * 2"));
    }

    #[test]
    fn test_format_rust_invalid() {
        let err = format_rust("fn invalid( { }").unwrap_err();
        assert!(err.to_string().starts_with("generated code does not parse"));
    }

    #[test]
    fn test_unformatted_units_are_still_checked() {
        let code = "struct P  {x:i64}";
        assert_eq!(finish_unit(code, false).unwrap(), code);
        assert!(finish_unit("struct {", false).is_err());
    }

    #[test]
    fn test_header_lines_are_comments() {
        let out = with_header(&["Generated from a.decl.yaml".into(), String::new()], "struct P;\n");
        assert_eq!(out, "// Generated from a.decl.yaml\n//\n\nstruct P;\n");
    }
}

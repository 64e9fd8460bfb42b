use regex::Regex;
use std::sync::OnceLock;

use crate::error::{FunctionKind, ValidationError};

/// Language tag of the embedded function dialect that the server evaluates
/// in-process. Views in any other language are stored as opaque text and
/// validated server-side.
pub const EMBEDDED_DIALECT: &str = "covescript";

/// Canonical shape of a map function, quoted in shape diagnostics.
pub const MAP_SHAPE_HINT: &str = "function(doc) capturing (emit) { ... }";

/// Canonical shape of a reduce function, quoted in shape diagnostics.
pub const REDUCE_SHAPE_HINT: &str = "function(keys, values, rereduce) { ... }";

/// A view function body together with the language it is written in.
///
/// Functions travel to the server as source text inside the design document;
/// the language decides which validator (if any) applies before they are
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    language: String,
    source: String,
}

impl Script {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Validate this script for the given role, using the validator
    /// registered for its language. Languages without a validator pass.
    pub fn check(&self, kind: FunctionKind) -> Result<(), ValidationError> {
        match validator_for(&self.language) {
            Some(validator) => validator.check_function(&self.source, kind),
            None => Ok(()),
        }
    }
}

/// Static validation strategy for one function language.
pub trait ScriptValidator: Send + Sync {
    /// Reject malformed function source before it is persisted to a view.
    ///
    /// Pure: no side effects, no partial state on failure.
    fn check_function(&self, source: &str, kind: FunctionKind) -> Result<(), ValidationError>;
}

/// Look up the validator for a language tag. `None` means the language is
/// not checked client-side (stored and transmitted as opaque text).
pub fn validator_for(language: &str) -> Option<&'static dyn ScriptValidator> {
    if language == EMBEDDED_DIALECT {
        Some(&DialectValidator)
    } else {
        None
    }
}

/// Validator for the embedded dialect: a generic syntax scan followed by a
/// structural signature match.
pub struct DialectValidator;

impl ScriptValidator for DialectValidator {
    fn check_function(&self, source: &str, kind: FunctionKind) -> Result<(), ValidationError> {
        // Syntax first: a shape mismatch on broken source would be misleading
        if let Err(detail) = scan_syntax(source) {
            return Err(ValidationError::Syntax { kind, detail });
        }

        let (pattern, expected) = match kind {
            FunctionKind::Map => (map_shape(), MAP_SHAPE_HINT),
            FunctionKind::Reduce => (reduce_shape(), REDUCE_SHAPE_HINT),
        };

        if pattern.is_match(source) {
            Ok(())
        } else {
            Err(ValidationError::Shape { kind, expected })
        }
    }
}

// Parameter names are fixed; the `$` sigil spelling and a by-ref `&$emit`
// capture are both accepted.
fn map_shape() -> &'static Regex {
    static MAP_SHAPE: OnceLock<Regex> = OnceLock::new();
    MAP_SHAPE.get_or_init(|| {
        Regex::new(
            r"(?s)^\s*function\s*\(\s*\$?doc\s*\)\s*capturing\s*\(\s*&?\$?emit\s*\)\s*\{.*\}\s*;?\s*$",
        )
        .expect("valid regex")
    })
}

fn reduce_shape() -> &'static Regex {
    static REDUCE_SHAPE: OnceLock<Regex> = OnceLock::new();
    REDUCE_SHAPE.get_or_init(|| {
        Regex::new(
            r"(?s)^\s*function\s*\(\s*\$?keys\s*,\s*\$?values\s*,\s*\$?rereduce\s*\)\s*\{.*\}\s*;?\s*$",
        )
        .expect("valid regex")
    })
}

/// Scan source text for errors that would fail to parse in the embedded
/// dialect: unbalanced delimiters, unterminated string literals, and
/// unterminated block comments. Returns a diagnostic on the first error.
fn scan_syntax(source: &str) -> Result<(), String> {
    let bytes = source.as_bytes();
    let mut stack: Vec<(u8, usize)> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                let quote = bytes[i];
                let start = i;
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(format!(
                                "unterminated string literal starting at offset {start}"
                            ))
                        }
                        Some(b'\\') => i += 2,
                        Some(&c) if c == quote => break,
                        Some(_) => i += 1,
                    }
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(format!(
                                "unterminated block comment starting at offset {start}"
                            ))
                        }
                        Some(b'*') if bytes.get(i + 1) == Some(&b'/') => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            open @ (b'(' | b'{' | b'[') => stack.push((open, i)),
            close @ (b')' | b'}' | b']') => {
                let expected = match close {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Err(format!(
                            "unexpected `{}` at offset {i}",
                            close as char
                        ))
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    if let Some((open, at)) = stack.pop() {
        return Err(format!("unclosed `{}` at offset {at}", open as char));
    }
    Ok(())
}

/// Undo one level of backslash escaping on function source, as received from
/// form-encoded or shell-quoted inputs: `\"` -> `"`, `\'` -> `'`, `\\` -> `\`.
/// Any other escape sequence is left alone.
pub fn strip_escapes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\'' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str, kind: FunctionKind) -> Result<(), ValidationError> {
        DialectValidator.check_function(source, kind)
    }

    #[test]
    fn test_map_shape_accepted() {
        assert!(check(
            "function(doc) capturing (emit) { emit(doc.id, 1); }",
            FunctionKind::Map
        )
        .is_ok());

        // Sigil spelling and by-ref capture
        assert!(check(
            "function($doc) capturing (&$emit) { $emit($doc->type, 1); }",
            FunctionKind::Map
        )
        .is_ok());

        // Trailing semicolon and multi-line body
        assert!(check(
            "function(doc) capturing (emit) {\n  if (doc.kind == \"post\") {\n    emit(doc.kind, null);\n  }\n};",
            FunctionKind::Map
        )
        .is_ok());
    }

    #[test]
    fn test_map_shape_rejected() {
        // Wrong parameter name, as in the classic mistake
        let err = check("function($x){ $emit($x); }", FunctionKind::Map).unwrap_err();
        match err {
            ValidationError::Shape { kind, expected } => {
                assert_eq!(kind, FunctionKind::Map);
                assert_eq!(expected, MAP_SHAPE_HINT);
            }
            other => panic!("expected shape error, got {other:?}"),
        }

        // Missing capture clause
        assert!(matches!(
            check("function(doc) { emit(doc, 1); }", FunctionKind::Map),
            Err(ValidationError::Shape { .. })
        ));
    }

    #[test]
    fn test_reduce_shape() {
        assert!(check(
            "function(keys, values, rereduce) { return sum(values); }",
            FunctionKind::Reduce
        )
        .is_ok());
        assert!(check(
            "function($keys, $values, $rereduce) { return count($values); }",
            FunctionKind::Reduce
        )
        .is_ok());

        // Two-argument form is not a reduce function
        assert!(matches!(
            check("function(keys, values) { return 0; }", FunctionKind::Reduce),
            Err(ValidationError::Shape {
                kind: FunctionKind::Reduce,
                ..
            })
        ));
    }

    #[test]
    fn test_syntax_checked_before_shape() {
        // Unbalanced brace AND wrong shape: syntax wins
        let err = check("function($x){ $emit($x); ", FunctionKind::Map).unwrap_err();
        assert!(matches!(err, ValidationError::Syntax { .. }));
    }

    #[test]
    fn test_syntax_diagnostics() {
        assert!(scan_syntax("function(doc) capturing (emit) { emit(1); }").is_ok());
        assert!(scan_syntax("{ 'quotes }{[( inside strings' }").is_ok());
        assert!(scan_syntax("{ // comment with ( unbalanced\n }").is_ok());

        assert!(scan_syntax("f(").unwrap_err().contains("unclosed `(`"));
        assert!(scan_syntax("f())").unwrap_err().contains("unexpected `)`"));
        assert!(scan_syntax("(]").unwrap_err().contains("unexpected `]`"));
        assert!(scan_syntax("'abc").unwrap_err().contains("unterminated string"));
        assert!(scan_syntax("/* abc").unwrap_err().contains("unterminated block comment"));
    }

    #[test]
    fn test_unknown_language_skips_validation() {
        let script = Script::new("javascript", "not a function at all ((((");
        assert!(script.check(FunctionKind::Map).is_ok());

        let script = Script::new(EMBEDDED_DIALECT, "not a function at all ((((");
        assert!(script.check(FunctionKind::Map).is_err());
    }

    #[test]
    fn test_strip_escapes() {
        assert_eq!(
            strip_escapes(r#"function(doc) capturing (emit) { emit(\"a\", 1); }"#),
            r#"function(doc) capturing (emit) { emit("a", 1); }"#
        );
        assert_eq!(strip_escapes(r"a \\ b \' c"), r"a \ b ' c");
        // Unknown escapes pass through
        assert_eq!(strip_escapes(r"a \n b"), r"a \n b");
    }
}

// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error code registry.
//!
//! Maps error codes (E0001, E0201, etc.) to titles and categories.

use std::collections::HashMap;

pub const UNEXPECTED_CHARACTER: &str = "E0001";
pub const UNTERMINATED_LITERAL: &str = "E0002";
pub const UNKNOWN_ESCAPE: &str = "E0003";
pub const MALFORMED_NUMBER: &str = "E0004";
pub const NESTED_STRING_EXPRESSION: &str = "E0005";

pub const UNEXPECTED_TOKEN: &str = "E0100";
pub const TOO_FEW_ITEMS: &str = "E0101";
pub const TOO_DEEPLY_NESTED: &str = "E0102";

pub const UNDEFINED_IDENTIFIER: &str = "E0200";
pub const REDEFINITION: &str = "E0201";
pub const BREAK_OUTSIDE_LOOP: &str = "E0204";
pub const CONTINUE_OUTSIDE_LOOP: &str = "E0205";
pub const RETURN_OUTSIDE_FUNCTION: &str = "E0206";

/// Registry of all known error codes.
pub struct ErrorCodeRegistry {
    codes: HashMap<&'static str, ErrorCodeInfo>,
}

/// Information about a single error code.
pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
}

/// Error category for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    Resolution,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Lexical => write!(f, "Lexical"),
            ErrorCategory::Syntax => write!(f, "Syntax"),
            ErrorCategory::Resolution => write!(f, "Resolution"),
        }
    }
}

macro_rules! register_codes {
    ($($code:expr => ($title:literal, $cat:expr)),* $(,)?) => {{
        let mut map = HashMap::new();
        $(
            map.insert($code, ErrorCodeInfo {
                code: $code,
                title: $title,
                category: $cat,
            });
        )*
        map
    }};
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        use ErrorCategory::*;

        Self {
            codes: register_codes! {
                // Lexer errors (E00xx)
                UNEXPECTED_CHARACTER => ("unexpected character", Lexical),
                UNTERMINATED_LITERAL => ("unterminated literal or comment", Lexical),
                UNKNOWN_ESCAPE => ("unknown escape sequence", Lexical),
                MALFORMED_NUMBER => ("malformed number literal", Lexical),
                NESTED_STRING_EXPRESSION => ("nested string expression", Lexical),

                // Parser errors (E01xx)
                UNEXPECTED_TOKEN => ("unexpected token", Syntax),
                TOO_FEW_ITEMS => ("list needs more items", Syntax),
                TOO_DEEPLY_NESTED => ("too deeply nested", Syntax),

                // Binder errors (E02xx)
                UNDEFINED_IDENTIFIER => ("undefined identifier", Resolution),
                REDEFINITION => ("redefinition", Resolution),
                BREAK_OUTSIDE_LOOP => ("break outside of loop", Resolution),
                CONTINUE_OUTSIDE_LOOP => ("continue outside of loop", Resolution),
                RETURN_OUTSIDE_FUNCTION => ("return outside of function", Resolution),
            },
        }
    }
}

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    pub fn all(&self) -> impl Iterator<Item = &ErrorCodeInfo> {
        self.codes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_prefix() {
        let registry = ErrorCodeRegistry::default();
        for info in registry.all() {
            let expected = match &info.code[..3] {
                "E00" => ErrorCategory::Lexical,
                "E01" => ErrorCategory::Syntax,
                "E02" => ErrorCategory::Resolution,
                other => panic!("unexpected code prefix {}", other),
            };
            assert_eq!(info.category, expected, "{}", info.code);
        }
        assert_eq!(registry.get(REDEFINITION).map(|i| i.title), Some("redefinition"));
        assert!(registry.get("E9999").is_none());
    }
}

//! Go identifier validation.
//!
//! Provides validation of names supplied for renames and new variables.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][0-9A-Za-z_]*$").expect("identifier pattern"));

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(break|case|chan|const|continue|default|defer|else|fallthrough|for|func|go|goto|if|import|interface|map|package|range|return|select|struct|switch|type|var)$",
    )
    .expect("keyword pattern")
});

/// Names that extract-local refuses to turn into a variable: predeclared
/// types plus the package names most often mistaken for values.
static PREDECLARED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(bool|byte|complex64|complex128|error|float32|float64|int|int8|int16|int32|int64|rune|string|uint|uint8|uint16|uint32|uint64|uintptr|global|reflect)$",
    )
    .expect("predeclared pattern")
});

/// Error for validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name cannot be empty")]
    Empty,

    /// Not of the form letter-or-underscore followed by letters, digits and
    /// underscores.
    #[error("invalid name '{name}': not a Go identifier")]
    NotIdentifier { name: String },

    #[error("invalid name '{name}': cannot use Go keyword as identifier")]
    Keyword { name: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check if a name is a Go keyword.
pub fn is_go_keyword(name: &str) -> bool {
    KEYWORD.is_match(name)
}

/// Check if `text` is the name of a predeclared type, or `global` or
/// `reflect`.
pub fn is_predeclared(text: &str) -> bool {
    PREDECLARED.is_match(text)
}

/// Validate that a string is a usable Go identifier.
///
/// ```
/// use gorefactor_go::validation::validate_go_identifier;
///
/// assert!(validate_go_identifier("total").is_ok());
/// assert!(validate_go_identifier("_tmp2").is_ok());
/// assert!(validate_go_identifier("2x").is_err());
/// assert!(validate_go_identifier("range").is_err());
/// ```
pub fn validate_go_identifier(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !IDENTIFIER.is_match(name) {
        return Err(ValidationError::NotIdentifier {
            name: name.to_string(),
        });
    }
    if is_go_keyword(name) {
        return Err(ValidationError::Keyword {
            name: name.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod valid_identifiers {
        use super::*;

        #[test]
        fn simple_names() {
            assert!(validate_go_identifier("x").is_ok());
            assert!(validate_go_identifier("count").is_ok());
            assert!(validate_go_identifier("ServeHTTP").is_ok());
        }

        #[test]
        fn underscores_and_digits() {
            assert!(validate_go_identifier("_").is_ok());
            assert!(validate_go_identifier("_private").is_ok());
            assert!(validate_go_identifier("v2").is_ok());
        }

        #[test]
        fn predeclared_names_are_identifiers() {
            // shadowing a predeclared name is legal Go
            assert!(validate_go_identifier("string").is_ok());
            assert!(validate_go_identifier("len").is_ok());
        }
    }

    mod invalid_identifiers {
        use super::*;

        #[test]
        fn empty_name() {
            assert_eq!(validate_go_identifier(""), Err(ValidationError::Empty));
        }

        #[test]
        fn starts_with_digit() {
            assert!(matches!(
                validate_go_identifier("1st"),
                Err(ValidationError::NotIdentifier { .. })
            ));
        }

        #[test]
        fn punctuation() {
            for name in ["a-b", "a.b", "a b", "x!", "émigré"] {
                assert!(validate_go_identifier(name).is_err(), "{name}");
            }
        }

        #[test]
        fn keywords() {
            for name in ["func", "range", "fallthrough", "type", "var"] {
                assert_eq!(
                    validate_go_identifier(name),
                    Err(ValidationError::Keyword {
                        name: name.to_string()
                    })
                );
            }
        }

        #[test]
        fn keyword_prefix_is_fine() {
            assert!(validate_go_identifier("format").is_ok());
            assert!(validate_go_identifier("types").is_ok());
        }
    }

    mod predeclared {
        use super::*;

        #[test]
        fn matches_whole_names_only() {
            assert!(is_predeclared("string"));
            assert!(is_predeclared("reflect"));
            assert!(is_predeclared("uintptr"));
            assert!(!is_predeclared("strings"));
            assert!(!is_predeclared("reflect.String"));
            assert!(!is_predeclared("len"));
        }
    }
}

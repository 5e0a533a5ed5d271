//! Error types for registration, validation, compilation and rendering

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in template source text
pub type Span = std::ops::Range<usize>;

/// Raised at registration time; no method is installed when it occurs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid parameter name '{name}': expected an identifier")]
    InvalidParameterName { name: String },

    #[error("parameter '{name}' is declared more than once")]
    DuplicateParameter { name: String },

    #[error("parameter '{name}' is declared both mandatory and optional")]
    ConflictingParameter { name: String },

    #[error("invalid method name '{name}': expected an identifier")]
    InvalidMethodName { name: String },

    #[error("no known template dialect found in [{}]", tags.join(", "))]
    UnknownDialect { tags: Vec<String> },

    #[error("method '{name}' needs exactly one of `template` or `inline`")]
    AmbiguousTemplate { name: String },
}

/// Raised at call time when named arguments do not match the contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing keywords: {}", keywords.join(", "))]
    Missing { keywords: Vec<String> },

    #[error("unknown keywords: {}", keywords.join(", "))]
    Unknown { keywords: Vec<String> },
}

impl ValidationError {
    /// The offending keyword names, sorted
    pub fn keywords(&self) -> &[String] {
        match self {
            ValidationError::Missing { keywords } | ValidationError::Unknown { keywords } => {
                keywords
            }
        }
    }
}

/// Malformed template source
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{origin}: {message} at {span:?}")]
pub struct CompileError {
    /// File path or inline label the source came from
    pub origin: String,
    pub message: String,
    pub span: Span,
    pub expected: Vec<String>,
}

impl CompileError {
    pub fn new(origin: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
            span,
            expected: Vec::new(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str) -> String {
        let origin = self.origin.as_str();
        let expected_str = if self.expected.is_empty() {
            String::new()
        } else {
            format!("\nExpected: {}", self.expected.join(", "))
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, origin, self.span.start)
            .with_message(&self.message)
            .with_label(
                Label::new((origin, self.span.clone()))
                    .with_message(format!("{}{}", self.message, expected_str))
                    .with_color(Color::Red),
            )
            .finish()
            .write((origin, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Errors while loading settings or manifest files
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// All errors surfaced by registration and generated methods
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("template compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no template dialect registered for {}", path.display())]
    NoDialectForPath { path: PathBuf },

    #[error("undefined method '{name}'")]
    UndefinedMethod { name: String },

    #[error("undefined name '{name}' in template")]
    UndefinedName { name: String },

    #[error("template yielded but no content block was given")]
    NoContent,

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl Error {
    /// The validation failure, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Alias for `Result<T, viewsmith::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl<'a> From<chumsky::error::Rich<'a, crate::engine::lexer::Token>> for CompileError {
    fn from(err: chumsky::error::Rich<'a, crate::engine::lexer::Token>) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of expression".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of expression".to_string()),
                _ => None,
            })
            .collect();

        CompileError {
            origin: String::new(),
            message,
            span: err.span().into_range(),
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::engine::lexer::Token) -> String {
    use crate::engine::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Number(n) => format!("number {}", n),
        Token::Yield => "keyword 'yield'".to_string(),
        Token::True => "keyword 'true'".to_string(),
        Token::False => "keyword 'false'".to_string(),
        Token::Nil => "keyword 'nil'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_join_keywords() {
        let err = ValidationError::Missing {
            keywords: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "missing keywords: a, b");

        let err = Error::from(ValidationError::Unknown {
            keywords: vec!["e".to_string()],
        });
        assert_eq!(err.to_string(), "unknown keywords: e");
    }

    #[test]
    fn test_unknown_dialect_message() {
        let err = ConfigurationError::UnknownDialect {
            tags: vec!["haml".to_string(), "title".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no known template dialect found in [haml, title]"
        );
    }

    #[test]
    fn test_compile_error_format_mentions_origin() {
        let err = CompileError::new("inline:badge", "Unexpected '+'", 2..3);
        let report = err.format("p +");
        assert!(report.contains("inline:badge"));
        assert!(report.contains("Unexpected '+'"));
    }
}

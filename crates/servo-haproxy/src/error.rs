use std::fmt;

use servo_schemas::ServoError;

/// Failure of a document operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Text could not be parsed. `line` is 1-based.
    Parse { line: usize, message: String },
    /// The section or key addressed by `set_default` does not exist.
    NotFound { section: String, key: String },
    /// The value does not fit the key's type.
    TypeMismatch {
        section: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Any other rejected write (bad key, bad section name, bad value text).
    Write {
        section: String,
        key: String,
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn write(
        section: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::Write {
            section: section.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { line, message } => write!(f, "line {line}: {message}"),
            ConfigError::NotFound { section, key } => {
                write!(f, "'{key}' not found in section '{section}'")
            }
            ConfigError::TypeMismatch {
                section,
                key,
                expected,
                found,
            } => write!(
                f,
                "'{key}' in section '{section}' expects {expected}, got {found}"
            ),
            ConfigError::Write {
                section,
                key,
                message,
            } => write!(f, "cannot write '{key}' in section '{section}': {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ServoError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Parse { line, message } => ServoError::TemplateParse { line, message },
            ConfigError::NotFound { section, key } => ServoError::SectionWrite {
                section,
                key,
                message: "not found".to_string(),
            },
            ConfigError::TypeMismatch {
                section,
                key,
                expected,
                found,
            } => ServoError::SectionWrite {
                section,
                key,
                message: format!("type mismatch: expected {expected}, got {found}"),
            },
            ConfigError::Write {
                section,
                key,
                message,
            } => ServoError::SectionWrite {
                section,
                key,
                message,
            },
        }
    }
}

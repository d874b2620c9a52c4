use std::fmt;
use std::time::Duration;

/// Every failure the servo reports, one variant per kind so callers can branch.
///
/// Variants carry the evidence needed for logging: the sink name, the missing
/// policy names, the template line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServoError {
    /// The snapshot could not be decoded or has the wrong shape.
    Decode(String),
    /// A referenced policy is not registered. `name` is the first missing name
    /// in reference order; `missing` is every missing name, sorted.
    PolicyNotFound { name: String, missing: Vec<String> },
    /// The template supplier could not produce any text.
    TemplateSource(String),
    /// The configuration text could not be parsed.
    TemplateParse { line: usize, message: String },
    /// An attribute assignment against a parsed document failed.
    SectionWrite {
        section: String,
        key: String,
        message: String,
    },
    /// The sink rejected or failed to persist a value.
    Emission { sink: String, message: String },
    /// The handler variant does not support the operation.
    Capability {
        handler: &'static str,
        operation: &'static str,
    },
    /// A digest reference did not match any live cache entry.
    ValueNotCached { stream: String, digest: String },
    /// A receive failed because the transport broke or the peer went away.
    Transport(String),
    /// A bounded receive elapsed without a value.
    Timeout { name: String, after: Duration },
}

/// Fieldless view of [`ServoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    PolicyNotFound,
    TemplateSource,
    TemplateParse,
    SectionWrite,
    Emission,
    Capability,
    ValueNotCached,
    Transport,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "DECODE",
            ErrorKind::PolicyNotFound => "POLICY_NOT_FOUND",
            ErrorKind::TemplateSource => "TEMPLATE_SOURCE",
            ErrorKind::TemplateParse => "TEMPLATE_PARSE",
            ErrorKind::SectionWrite => "SECTION_WRITE",
            ErrorKind::Emission => "EMISSION",
            ErrorKind::Capability => "CAPABILITY",
            ErrorKind::ValueNotCached => "VALUE_NOT_CACHED",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Timeout => "TIMEOUT",
        }
    }
}

impl ServoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServoError::Decode(_) => ErrorKind::Decode,
            ServoError::PolicyNotFound { .. } => ErrorKind::PolicyNotFound,
            ServoError::TemplateSource(_) => ErrorKind::TemplateSource,
            ServoError::TemplateParse { .. } => ErrorKind::TemplateParse,
            ServoError::SectionWrite { .. } => ErrorKind::SectionWrite,
            ServoError::Emission { .. } => ErrorKind::Emission,
            ServoError::Capability { .. } => ErrorKind::Capability,
            ServoError::ValueNotCached { .. } => ErrorKind::ValueNotCached,
            ServoError::Transport(_) => ErrorKind::Transport,
            ServoError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        ServoError::Decode(msg.into())
    }

    pub fn emission(sink: impl Into<String>, msg: impl fmt::Display) -> Self {
        ServoError::Emission {
            sink: sink.into(),
            message: msg.to_string(),
        }
    }

    /// Build a `PolicyNotFound` from the missing names in reference order.
    ///
    /// Returns `None` when nothing is missing.
    pub fn policy_not_found(missing_in_order: &[String]) -> Option<Self> {
        let first = missing_in_order.first()?.clone();
        let mut missing = missing_in_order.to_vec();
        missing.sort();
        missing.dedup();
        Some(ServoError::PolicyNotFound {
            name: first,
            missing,
        })
    }
}

impl fmt::Display for ServoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoError::Decode(msg) => write!(f, "malformed snapshot: {msg}"),
            ServoError::PolicyNotFound { name, missing } if missing.len() > 1 => write!(
                f,
                "policy not found {name} ({} referenced policies missing: {})",
                missing.len(),
                missing.join(", ")
            ),
            ServoError::PolicyNotFound { name, .. } => write!(f, "policy not found {name}"),
            ServoError::TemplateSource(msg) => write!(f, "template unavailable: {msg}"),
            ServoError::TemplateParse { line, message } => {
                write!(f, "template parse error at line {line}: {message}")
            }
            ServoError::SectionWrite {
                section,
                key,
                message,
            } => write!(f, "cannot set '{key}' in section '{section}': {message}"),
            ServoError::Emission { sink, message } => {
                write!(f, "sink '{sink}' failed: {message}")
            }
            ServoError::Capability { handler, operation } => {
                write!(f, "{operation} not supported by {handler} handler")
            }
            ServoError::ValueNotCached { stream, digest } => {
                write!(f, "no cached value for {stream} with digest {digest}")
            }
            ServoError::Transport(msg) => write!(f, "transport error: {msg}"),
            ServoError::Timeout { name, after } => {
                write!(f, "no value for '{name}' within {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for ServoError {}

//! Parsed proxy configuration.
//!
//! A document is a preamble of comments followed by ordered sections. Each
//! section holds ordered entries: attributes (key + structured value) and
//! comment lines. Blank lines are not kept; serialization puts exactly one
//! between sections.

use std::fmt;
use std::str::FromStr;

use crate::attribute::{Attribute, Shape};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Global,
    Defaults,
    Frontend,
    Backend,
    Listen,
    Userlist,
    Resolvers,
    Peers,
    Program,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Global => "global",
            SectionKind::Defaults => "defaults",
            SectionKind::Frontend => "frontend",
            SectionKind::Backend => "backend",
            SectionKind::Listen => "listen",
            SectionKind::Userlist => "userlist",
            SectionKind::Resolvers => "resolvers",
            SectionKind::Peers => "peers",
            SectionKind::Program => "program",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "global" => SectionKind::Global,
            "defaults" => SectionKind::Defaults,
            "frontend" => SectionKind::Frontend,
            "backend" => SectionKind::Backend,
            "listen" => SectionKind::Listen,
            "userlist" => SectionKind::Userlist,
            "resolvers" => SectionKind::Resolvers,
            "peers" => SectionKind::Peers,
            "program" => SectionKind::Program,
            _ => return None,
        })
    }

    /// Whether a header of this kind must carry a name.
    pub fn requires_name(&self) -> bool {
        !matches!(self, SectionKind::Global | SectionKind::Defaults)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Full comment text including the leading `#`.
    Comment(String),
    Attribute { key: String, value: Attribute },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub name: Option<String>,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(kind: SectionKind, name: Option<String>) -> Self {
        Self {
            kind,
            name,
            entries: Vec::new(),
        }
    }

    /// `frontend http-8080`, `global`, ...
    pub fn label(&self) -> String {
        match &self.name {
            Some(n) => format!("{} {n}", self.kind.as_str()),
            None => self.kind.as_str().to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.entries.iter().find_map(|e| match e {
            Entry::Attribute { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    /// Attribute keys in order of first appearance.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for e in &self.entries {
            if let Entry::Attribute { key, .. } = e {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, Entry::Attribute { key: k, .. } if k == key))
    }

    /// Replace every line of `key` with `value` at the first occurrence, or
    /// append. An empty list removes the key.
    fn assign(&mut self, key: &str, value: Attribute) {
        let first = self.position(key);
        let mut index = 0;
        self.entries.retain(|e| {
            let keep = match e {
                Entry::Attribute { key: k, .. } => k != key || Some(index) == first,
                Entry::Comment(_) => true,
            };
            index += 1;
            keep
        });

        match first {
            Some(at) if value.is_empty_list() => {
                self.entries.remove(at);
            }
            Some(at) => {
                self.entries[at] = Entry::Attribute {
                    key: key.to_string(),
                    value,
                };
            }
            None if value.is_empty_list() => {}
            None => self.entries.push(Entry::Attribute {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// Add a parsed line; list-valued keys merge into the first occurrence.
    fn push_parsed(&mut self, key: String, value: Attribute) {
        if let Some(at) = self.position(&key) {
            if let Entry::Attribute { value: existing, .. } = &mut self.entries[at] {
                if existing.extend(value.clone()) {
                    return;
                }
            }
        }
        self.entries.push(Entry::Attribute { key, value });
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = Document::default();

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let (tokens, comment) = tokenize(line, line_no)?;

            if tokens.is_empty() {
                if let Some(c) = comment {
                    match doc.sections.last_mut() {
                        Some(section) => section.entries.push(Entry::Comment(c)),
                        None => doc.preamble.push(c),
                    }
                }
                continue;
            }

            if let Some(kind) = SectionKind::from_keyword(&tokens[0]) {
                let name = match &tokens[1..] {
                    [] if kind.requires_name() => {
                        return Err(ConfigError::parse(
                            line_no,
                            format!("{} section without a name", kind.as_str()),
                        ))
                    }
                    [] => None,
                    [name] => Some(name.clone()),
                    _ => {
                        return Err(ConfigError::parse(
                            line_no,
                            format!("unexpected tokens after {} header", kind.as_str()),
                        ))
                    }
                };
                doc.sections.push(Section::new(kind, name));
                if let (Some(c), Some(section)) = (comment, doc.sections.last_mut()) {
                    section.entries.push(Entry::Comment(c));
                }
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                return Err(ConfigError::parse(
                    line_no,
                    format!("'{}' outside of any section", tokens[0]),
                ));
            };
            let (key, rest) = split_key(&tokens);
            let value = Attribute::parse(&key, rest)
                .map_err(|msg| ConfigError::parse(line_no, format!("{key}: {msg}")))?;
            section.push_parsed(key, value);
            if let Some(c) = comment {
                section.entries.push(Entry::Comment(c));
            }
        }

        Ok(doc)
    }

    pub fn serialize(&self) -> String {
        self.to_string()
    }

    pub fn section(&self, kind: SectionKind, name: Option<&str>) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.kind == kind && s.name.as_deref() == name)
    }

    pub fn get(&self, kind: SectionKind, name: Option<&str>, key: &str) -> Option<&Attribute> {
        self.section(kind, name).and_then(|s| s.get(key))
    }

    /// Overwrite an existing scalar key in the first `defaults` section.
    pub fn set_default(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let key = normalize_key(key)
            .ok_or_else(|| ConfigError::write("defaults", key, "invalid key"))?;
        let not_found = || ConfigError::NotFound {
            section: "defaults".to_string(),
            key: key.clone(),
        };

        let section = self
            .sections
            .iter_mut()
            .find(|s| s.kind == SectionKind::Defaults)
            .ok_or_else(not_found)?;
        let at = section.position(&key).ok_or_else(not_found)?;
        let Entry::Attribute { value: existing, .. } = &mut section.entries[at] else {
            return Err(not_found());
        };

        let (tokens, comment) = tokenize(value, 1)
            .map_err(|e| ConfigError::write("defaults", key.as_str(), e.to_string()))?;
        let expected = existing.type_name();
        let mismatch = |found: &'static str| ConfigError::TypeMismatch {
            section: "defaults".to_string(),
            key: key.clone(),
            expected,
            found,
        };
        if comment.is_some() || tokens.is_empty() {
            return Err(mismatch("empty value"));
        }

        let replacement = match existing {
            Attribute::Text(_) => Attribute::Text(tokens.join(" ")),
            Attribute::Timeout(_) => match Attribute::parse(&key, &tokens) {
                Ok(parsed @ Attribute::Timeout(_)) => parsed,
                _ => return Err(mismatch("text")),
            },
            _ => return Err(mismatch("text")),
        };
        *existing = replacement;
        Ok(())
    }

    /// `set_default("timeout <name>", value)`.
    pub fn set_default_timeout(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        self.set_default(&format!("timeout {name}"), value)
    }

    /// Ensure the section exists, then assign each attribute in order.
    ///
    /// Keys not named in `attributes` are left untouched. Assigning an empty
    /// list removes the key.
    pub fn create_or_replace_section(
        &mut self,
        kind: SectionKind,
        name: &str,
        attributes: &[(String, Attribute)],
    ) -> Result<(), ConfigError> {
        let name = name.trim();
        let label = if name.is_empty() {
            kind.as_str().to_string()
        } else {
            format!("{} {name}", kind.as_str())
        };
        if kind.requires_name() && name.is_empty() {
            return Err(ConfigError::write(label, "", "section requires a name"));
        }
        if name.contains(char::is_whitespace) || name.contains('#') {
            return Err(ConfigError::write(label, "", "invalid section name"));
        }
        if kind == SectionKind::Global && !name.is_empty() {
            return Err(ConfigError::write(label, "", "global takes no name"));
        }

        let mut checked = Vec::with_capacity(attributes.len());
        for (key, value) in attributes {
            let normalized = normalize_key(key)
                .filter(|k| k == key)
                .ok_or_else(|| ConfigError::write(label.as_str(), key.as_str(), "invalid key"))?;
            let expected = Shape::for_key(&normalized);
            if value.shape() != expected {
                return Err(ConfigError::TypeMismatch {
                    section: label,
                    key: normalized,
                    expected: expected.name(),
                    found: value.type_name(),
                });
            }
            checked.push((normalized, value.clone()));
        }

        let name = (!name.is_empty()).then(|| name.to_string());
        let at = match self
            .sections
            .iter()
            .position(|s| s.kind == kind && s.name == name)
        {
            Some(at) => at,
            None => {
                self.sections.push(Section::new(kind, name));
                self.sections.len() - 1
            }
        };
        let section = &mut self.sections[at];
        for (key, value) in checked {
            section.assign(&key, value);
        }
        Ok(())
    }
}

impl FromStr for Document {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Document::parse(s)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.preamble {
            writeln!(f, "{c}")?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 || !self.preamble.is_empty() {
                writeln!(f)?;
            }
            writeln!(f, "{}", section.label())?;
            for entry in &section.entries {
                match entry {
                    Entry::Comment(c) => writeln!(f, "  {c}")?,
                    Entry::Attribute { key, value } => {
                        for line in value.value_lines() {
                            if line.is_empty() {
                                writeln!(f, "  {key}")?;
                            } else {
                                writeln!(f, "  {key} {line}")?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

/// Split a line into tokens and an optional trailing `#` comment.
///
/// Backslash escapes and quotes are kept in the token text so values render
/// back exactly as written.
pub(crate) fn tokenize(
    line: &str,
    line_no: usize,
) -> Result<(Vec<String>, Option<String>), ConfigError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut comment = None;
    let mut chars = line.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some((_, next)) = chars.next() {
                    current.push(next);
                }
            }
            '"' | '\'' => {
                match quote {
                    None => quote = Some(c),
                    Some(q) if q == c => quote = None,
                    Some(_) => {}
                }
                current.push(c);
            }
            '#' if quote.is_none() && current.is_empty() => {
                comment = Some(line[idx..].trim_end().to_string());
                break;
            }
            c if c.is_whitespace() && quote.is_none() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(ConfigError::parse(line_no, "unterminated quote"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok((tokens, comment))
}

/// Split tokens into the attribute key and its value tokens.
pub(crate) fn split_key(tokens: &[String]) -> (String, &[String]) {
    let words = match tokens.first().map(String::as_str) {
        Some("no") if tokens.get(1).map(String::as_str) == Some("option") => 3,
        Some("timeout" | "option" | "stats" | "errorfile") => 2,
        _ => 1,
    };
    let words = words.min(tokens.len());
    (tokens[..words].join(" "), &tokens[words..])
}

/// Canonical spelling of a key, or `None` if it is not a well-formed key.
fn normalize_key(key: &str) -> Option<String> {
    let (tokens, comment) = tokenize(key, 1).ok()?;
    if comment.is_some() || tokens.is_empty() {
        return None;
    }
    let (normalized, rest) = split_key(&tokens);
    rest.is_empty().then_some(normalized)
}

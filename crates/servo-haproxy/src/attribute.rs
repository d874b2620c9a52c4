//! Structured attribute values.
//!
//! Known keys parse into typed values; everything else is kept as text. The
//! `Display`-like rendering (`value_lines`) is canonical, so rendering a
//! parsed value and parsing it again yields the same value.

use std::fmt;

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Free text after the key, tokens joined by single spaces.
    Text(String),
    /// Key with no value (`option httplog`).
    Flag,
    /// Duration with optional unit suffix (`5s`, `1m`, `500`).
    Timeout(String),
    Bind(Vec<Bind>),
    Log(Vec<LogTarget>),
    ForwardFor(ForwardFor),
    Balance(Balance),
    Cookie(Cookie),
    Servers(Vec<Server>),
    HttpActions(Vec<HttpAction>),
}

/// Type a key's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Scalar,
    Timeout,
    Bind,
    Log,
    ForwardFor,
    Balance,
    Cookie,
    Servers,
    HttpActions,
}

impl Shape {
    pub(crate) fn for_key(key: &str) -> Shape {
        match key {
            "bind" => Shape::Bind,
            "log" => Shape::Log,
            "server" => Shape::Servers,
            "http-request" | "http-response" => Shape::HttpActions,
            "option forwardfor" => Shape::ForwardFor,
            "balance" => Shape::Balance,
            "cookie" => Shape::Cookie,
            k if k.starts_with("timeout ") => Shape::Timeout,
            _ => Shape::Scalar,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Shape::Scalar => "text",
            Shape::Timeout => "timeout",
            Shape::Bind => "bind list",
            Shape::Log => "log list",
            Shape::ForwardFor => "forwardfor",
            Shape::Balance => "balance",
            Shape::Cookie => "cookie",
            Shape::Servers => "server list",
            Shape::HttpActions => "http action list",
        }
    }
}

impl Attribute {
    pub fn text(value: impl Into<String>) -> Self {
        Attribute::Text(value.into())
    }

    pub fn timeout(value: impl Into<String>) -> Self {
        Attribute::Timeout(value.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Attribute::Text(_) => "text",
            Attribute::Flag => "flag",
            other => other.shape().name(),
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        match self {
            Attribute::Text(_) | Attribute::Flag => Shape::Scalar,
            Attribute::Timeout(_) => Shape::Timeout,
            Attribute::Bind(_) => Shape::Bind,
            Attribute::Log(_) => Shape::Log,
            Attribute::ForwardFor(_) => Shape::ForwardFor,
            Attribute::Balance(_) => Shape::Balance,
            Attribute::Cookie(_) => Shape::Cookie,
            Attribute::Servers(_) => Shape::Servers,
            Attribute::HttpActions(_) => Shape::HttpActions,
        }
    }

    /// `true` for a list value with no elements. Writing one removes the key.
    pub fn is_empty_list(&self) -> bool {
        match self {
            Attribute::Bind(v) => v.is_empty(),
            Attribute::Log(v) => v.is_empty(),
            Attribute::Servers(v) => v.is_empty(),
            Attribute::HttpActions(v) => v.is_empty(),
            _ => false,
        }
    }

    /// Append the elements of a same-typed list. Returns `false` (and leaves
    /// `self` alone) when either side is not a list of the same type.
    pub(crate) fn extend(&mut self, other: Attribute) -> bool {
        match (self, other) {
            (Attribute::Bind(a), Attribute::Bind(b)) => a.extend(b),
            (Attribute::Log(a), Attribute::Log(b)) => a.extend(b),
            (Attribute::Servers(a), Attribute::Servers(b)) => a.extend(b),
            (Attribute::HttpActions(a), Attribute::HttpActions(b)) => a.extend(b),
            _ => return false,
        }
        true
    }

    /// Value text per output line (one per list element; empty for a flag).
    pub fn value_lines(&self) -> Vec<String> {
        fn each<T: fmt::Display>(items: &[T]) -> Vec<String> {
            items.iter().map(T::to_string).collect()
        }
        match self {
            Attribute::Text(s) | Attribute::Timeout(s) => vec![s.clone()],
            Attribute::Flag => vec![String::new()],
            Attribute::Bind(v) => each(v),
            Attribute::Log(v) => each(v),
            Attribute::ForwardFor(v) => vec![v.to_string()],
            Attribute::Balance(v) => vec![v.to_string()],
            Attribute::Cookie(v) => vec![v.to_string()],
            Attribute::Servers(v) => each(v),
            Attribute::HttpActions(v) => each(v),
        }
    }

    /// Parse the tokens following `key` into the key's value type.
    pub(crate) fn parse(key: &str, rest: &[String]) -> Result<Attribute, String> {
        match Shape::for_key(key) {
            Shape::Scalar if rest.is_empty() => Ok(Attribute::Flag),
            Shape::Scalar => Ok(Attribute::Text(rest.join(" "))),
            Shape::Timeout => match rest {
                [value] if is_duration(value) => Ok(Attribute::Timeout(value.clone())),
                [value] => Err(format!("invalid duration '{value}'")),
                _ => Err("expects exactly one duration".to_string()),
            },
            Shape::Bind => Bind::parse(rest).map(|b| Attribute::Bind(vec![b])),
            Shape::Log => LogTarget::parse(rest).map(|l| Attribute::Log(vec![l])),
            Shape::ForwardFor => ForwardFor::parse(rest).map(Attribute::ForwardFor),
            Shape::Balance => Balance::parse(rest).map(Attribute::Balance),
            Shape::Cookie => Cookie::parse(rest).map(Attribute::Cookie),
            Shape::Servers => Server::parse(rest).map(|s| Attribute::Servers(vec![s])),
            Shape::HttpActions => HttpAction::parse(rest).map(|a| Attribute::HttpActions(vec![a])),
        }
    }
}

/// `<digits>[us|ms|s|m|h|d]`
pub(crate) fn is_duration(value: &str) -> bool {
    let digits = value.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && matches!(&value[digits..], "" | "us" | "ms" | "s" | "m" | "h" | "d")
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[String]) -> fmt::Result {
    for p in parts {
        write!(f, " {p}")?;
    }
    Ok(())
}

fn write_cond(f: &mut fmt::Formatter<'_>, cond: &Option<String>) -> fmt::Result {
    match cond {
        Some(c) => write!(f, " {c}"),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// bind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    pub address: String,
    pub params: Vec<String>,
}

impl Bind {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            params: Vec::new(),
        }
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        let (address, params) = rest.split_first().ok_or("bind expects an address")?;
        Ok(Self {
            address: address.clone(),
            params: params.to_vec(),
        })
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        write_joined(f, &self.params)
    }
}

// ---------------------------------------------------------------------------
// log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// `log global`
    Global,
    Target {
        address: String,
        /// `len`/`format`/`sample` option pairs, in order.
        options: Vec<(String, String)>,
        facility: String,
        level: Option<String>,
        min_level: Option<String>,
    },
}

impl LogTarget {
    pub fn target(
        address: impl Into<String>,
        facility: impl Into<String>,
        level: Option<&str>,
    ) -> Self {
        LogTarget::Target {
            address: address.into(),
            options: Vec::new(),
            facility: facility.into(),
            level: level.map(str::to_string),
            min_level: None,
        }
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        if let [only] = rest {
            if only == "global" {
                return Ok(LogTarget::Global);
            }
        }
        let (address, mut tail) = rest.split_first().ok_or("log expects an address")?;
        let mut options = Vec::new();
        while let [opt, value, more @ ..] = tail {
            if !matches!(opt.as_str(), "len" | "format" | "sample") {
                break;
            }
            options.push((opt.clone(), value.clone()));
            tail = more;
        }
        match tail {
            [facility] => Ok(Self::with(address, options, facility, None, None)),
            [facility, level] => Ok(Self::with(address, options, facility, Some(level), None)),
            [facility, level, min] => Ok(Self::with(
                address,
                options,
                facility,
                Some(level),
                Some(min),
            )),
            [] => Err(format!("log target '{address}' has no facility")),
            _ => Err(format!("too many fields for log target '{address}'")),
        }
    }

    fn with(
        address: &str,
        options: Vec<(String, String)>,
        facility: &str,
        level: Option<&String>,
        min_level: Option<&String>,
    ) -> Self {
        LogTarget::Target {
            address: address.to_string(),
            options,
            facility: facility.to_string(),
            level: level.cloned(),
            min_level: min_level.cloned(),
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Global => f.write_str("global"),
            LogTarget::Target {
                address,
                options,
                facility,
                level,
                min_level,
            } => {
                f.write_str(address)?;
                for (k, v) in options {
                    write!(f, " {k} {v}")?;
                }
                write!(f, " {facility}")?;
                if let Some(l) = level {
                    write!(f, " {l}")?;
                }
                if let Some(m) = min_level {
                    write!(f, " {m}")?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// option forwardfor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardFor {
    pub except: Option<String>,
    pub header: Option<String>,
    pub if_none: bool,
}

impl ForwardFor {
    pub fn except(network: impl Into<String>) -> Self {
        Self {
            except: Some(network.into()),
            ..Self::default()
        }
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        let mut out = Self::default();
        let mut it = rest.iter();
        while let Some(word) = it.next() {
            match word.as_str() {
                "except" => out.except = Some(it.next().ok_or("except expects a network")?.clone()),
                "header" => out.header = Some(it.next().ok_or("header expects a name")?.clone()),
                "if-none" => out.if_none = true,
                other => return Err(format!("unknown forwardfor option '{other}'")),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for ForwardFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(e) = &self.except {
            parts.push(format!("except {e}"));
        }
        if let Some(h) = &self.header {
            parts.push(format!("header {h}"));
        }
        if self.if_none {
            parts.push("if-none".to_string());
        }
        f.write_str(&parts.join(" "))
    }
}

// ---------------------------------------------------------------------------
// balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub algorithm: String,
    pub args: Vec<String>,
}

impl Balance {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            args: Vec::new(),
        }
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        let (algorithm, args) = rest.split_first().ok_or("balance expects an algorithm")?;
        Ok(Self {
            algorithm: algorithm.clone(),
            args: args.to_vec(),
        })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.algorithm)?;
        write_joined(f, &self.args)
    }
}

// ---------------------------------------------------------------------------
// cookie
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieMode {
    Insert,
    Rewrite,
    Prefix,
}

impl CookieMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieMode::Insert => "insert",
            CookieMode::Rewrite => "rewrite",
            CookieMode::Prefix => "prefix",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub mode: Option<CookieMode>,
    pub indirect: bool,
    pub nocache: bool,
    pub httponly: bool,
    pub secure: bool,
    /// Milliseconds unless a unit suffix is given.
    pub maxidle: Option<String>,
    pub maxlife: Option<String>,
    /// Options without a dedicated field, verbatim.
    pub extra: Vec<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, mode: CookieMode) -> Self {
        Self {
            name: name.into(),
            mode: Some(mode),
            indirect: false,
            nocache: false,
            httponly: false,
            secure: false,
            maxidle: None,
            maxlife: None,
            extra: Vec::new(),
        }
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        let (name, opts) = rest.split_first().ok_or("cookie expects a name")?;
        let mut out = Self {
            mode: None,
            ..Self::new(name.clone(), CookieMode::Insert)
        };
        let mut it = opts.iter();
        while let Some(word) = it.next() {
            match word.as_str() {
                "insert" => out.mode = Some(CookieMode::Insert),
                "rewrite" => out.mode = Some(CookieMode::Rewrite),
                "prefix" => out.mode = Some(CookieMode::Prefix),
                "indirect" => out.indirect = true,
                "nocache" => out.nocache = true,
                "httponly" => out.httponly = true,
                "secure" => out.secure = true,
                "maxidle" | "maxlife" => {
                    let value = it
                        .next()
                        .filter(|v| is_duration(v))
                        .ok_or_else(|| format!("{word} expects a duration"))?
                        .clone();
                    if word == "maxidle" {
                        out.maxidle = Some(value);
                    } else {
                        out.maxlife = Some(value);
                    }
                }
                other => out.extra.push(other.to_string()),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(m) = self.mode {
            write!(f, " {}", m.as_str())?;
        }
        for (on, word) in [
            (self.indirect, "indirect"),
            (self.nocache, "nocache"),
            (self.httponly, "httponly"),
            (self.secure, "secure"),
        ] {
            if on {
                write!(f, " {word}")?;
            }
        }
        write_joined(f, &self.extra)?;
        if let Some(v) = &self.maxidle {
            write!(f, " maxidle {v}")?;
        }
        if let Some(v) = &self.maxlife {
            write!(f, " maxlife {v}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// server
// ---------------------------------------------------------------------------

/// Server options that take one argument. Every other option is a flag.
const SERVER_VALUE_PARAMS: &[&str] = &[
    "addr",
    "agent-inter",
    "agent-port",
    "alpn",
    "ca-file",
    "check-sni",
    "cookie",
    "crt",
    "downinter",
    "error-limit",
    "fall",
    "fastinter",
    "id",
    "init-addr",
    "inter",
    "maxconn",
    "maxqueue",
    "minconn",
    "on-error",
    "on-marked-down",
    "on-marked-up",
    "port",
    "proto",
    "resolvers",
    "rise",
    "slowstart",
    "sni",
    "source",
    "weight",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerParam {
    Flag(String),
    Value { name: String, value: String },
}

impl ServerParam {
    pub fn flag(name: impl Into<String>) -> Self {
        ServerParam::Flag(name.into())
    }

    pub fn value(name: impl Into<String>, value: impl fmt::Display) -> Self {
        ServerParam::Value {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ServerParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerParam::Flag(n) => f.write_str(n),
            ServerParam::Value { name, value } => write!(f, "{name} {value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub name: String,
    pub address: String,
    pub params: Vec<ServerParam>,
}

impl Server {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ServerParam) -> Self {
        self.params.push(param);
        self
    }

    /// Value of the first `name` option, if any.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            ServerParam::Value { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p, ServerParam::Flag(n) if n == name))
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        let [name, address, opts @ ..] = rest else {
            return Err("server expects a name and an address".to_string());
        };
        let mut params = Vec::new();
        let mut it = opts.iter();
        while let Some(word) = it.next() {
            if SERVER_VALUE_PARAMS.contains(&word.as_str()) {
                let value = it
                    .next()
                    .ok_or_else(|| format!("server option '{word}' expects a value"))?;
                params.push(ServerParam::value(word.clone(), value));
            } else {
                params.push(ServerParam::Flag(word.clone()));
            }
        }
        Ok(Self {
            name: name.clone(),
            address: address.clone(),
            params,
        })
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.address)?;
        for p in &self.params {
            write!(f, " {p}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// http-request / http-response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAction {
    SetHeader {
        name: String,
        fmt: String,
        cond: Option<String>,
    },
    AddHeader {
        name: String,
        fmt: String,
        cond: Option<String>,
    },
    DelHeader {
        name: String,
        cond: Option<String>,
    },
    Capture {
        sample: String,
        len: u32,
        cond: Option<String>,
    },
    /// Any other action, verbatim.
    Other(String),
}

impl HttpAction {
    pub fn set_header(name: impl Into<String>, fmt: impl Into<String>) -> Self {
        HttpAction::SetHeader {
            name: name.into(),
            fmt: fmt.into(),
            cond: None,
        }
    }

    fn parse(rest: &[String]) -> Result<Self, String> {
        let cond_at = rest
            .iter()
            .skip(1)
            .position(|t| t == "if" || t == "unless")
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let (body, cond) = rest.split_at(cond_at);
        let cond = (!cond.is_empty()).then(|| cond.join(" "));

        let action = match body {
            [] => return Err("expects an action".to_string()),
            [verb, name, fmt @ ..] if verb == "set-header" || verb == "add-header" => {
                if fmt.is_empty() {
                    return Err(format!("{verb} expects a value"));
                }
                let (name, fmt) = (name.clone(), fmt.join(" "));
                if verb == "set-header" {
                    HttpAction::SetHeader { name, fmt, cond }
                } else {
                    HttpAction::AddHeader { name, fmt, cond }
                }
            }
            [verb, name] if verb == "del-header" => HttpAction::DelHeader {
                name: name.clone(),
                cond,
            },
            [verb, sample, len_kw, len] if verb == "capture" && len_kw == "len" => {
                HttpAction::Capture {
                    sample: sample.clone(),
                    len: len
                        .parse()
                        .map_err(|_| format!("invalid capture length '{len}'"))?,
                    cond,
                }
            }
            _ => HttpAction::Other(rest.join(" ")),
        };
        Ok(action)
    }
}

impl fmt::Display for HttpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpAction::SetHeader { name, fmt, cond } => {
                write!(f, "set-header {name} {fmt}")?;
                write_cond(f, cond)
            }
            HttpAction::AddHeader { name, fmt, cond } => {
                write!(f, "add-header {name} {fmt}")?;
                write_cond(f, cond)
            }
            HttpAction::DelHeader { name, cond } => {
                write!(f, "del-header {name}")?;
                write_cond(f, cond)
            }
            HttpAction::Capture { sample, len, cond } => {
                write!(f, "capture {sample} len {len}")?;
                write_cond(f, cond)
            }
            HttpAction::Other(raw) => f.write_str(raw),
        }
    }
}

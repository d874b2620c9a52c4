//! servo-haproxy
//!
//! Configuration synthesis for the proxy:
//! - `Document`: parse section-oriented config text, write attributes into
//!   named sections, serialize back (serialize → parse → serialize is stable)
//! - `SectionMapper` / `ListenerMapping`: reconciled load balancer → section
//!   updates
//! - `ConfigSynthesizer`: template supplier + mapper → config text

mod attribute;
mod document;
mod error;
mod mapping;
mod synthesizer;

pub use attribute::{
    Attribute, Balance, Bind, Cookie, CookieMode, ForwardFor, HttpAction, LogTarget, Server,
    ServerParam,
};
pub use document::{Document, Entry, Section, SectionKind};
pub use error::ConfigError;
pub use mapping::{
    backend_name, frontend_name, server_cookie, ListenerMapping, MappingSettings, SectionMapper,
    SectionUpdate, APP_COOKIE_POLICY, LB_COOKIE_POLICY, PROXY_PROTOCOL_POLICY,
};
pub use synthesizer::{ConfigSynthesizer, FileTemplate, StaticTemplate, TemplateSupplier};

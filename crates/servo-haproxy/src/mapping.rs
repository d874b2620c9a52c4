//! Load balancer → proxy sections.
//!
//! Every listener yields one frontend (`<proto>-<port>`) and one backend
//! (`backend-<proto>-<port>`). Session affinity comes from the policies
//! attached to the listener and to backend servers on the same instance port.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use servo_schemas::{LoadBalancer, Listener, Policy, ServoError};

use crate::attribute::{
    Attribute, Balance, Bind, Cookie, CookieMode, ForwardFor, HttpAction, LogTarget, Server,
    ServerParam,
};
use crate::document::SectionKind;
use crate::error::ConfigError;

pub const LB_COOKIE_POLICY: &str = "LBCookieStickinessPolicyType";
pub const APP_COOKIE_POLICY: &str = "AppCookieStickinessPolicyType";
pub const PROXY_PROTOCOL_POLICY: &str = "ProxyProtocolPolicyType";

/// One `create_or_replace_section` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUpdate {
    pub kind: SectionKind,
    pub name: String,
    pub attributes: Vec<(String, Attribute)>,
}

impl SectionUpdate {
    fn new(kind: SectionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    fn set(&mut self, key: &str, value: Attribute) {
        self.attributes.push((key.to_string(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Derives section updates from a reconciled load balancer.
pub trait SectionMapper: Send + Sync {
    fn sections(&self, lb: &LoadBalancer) -> Result<Vec<SectionUpdate>, ServoError>;
}

impl<F> SectionMapper for F
where
    F: Fn(&LoadBalancer) -> Result<Vec<SectionUpdate>, ServoError> + Send + Sync,
{
    fn sections(&self, lb: &LoadBalancer) -> Result<Vec<SectionUpdate>, ServoError> {
        self(lb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSettings {
    pub bind_address: String,
    pub log_socket: String,
    pub log_facility: String,
    pub log_level: String,
    /// Unescaped; spaces are escaped when written.
    pub log_format: String,
    pub cookie_name: String,
    /// Used when the load balancer carries no idle timeout.
    pub default_idle_timeout_secs: u32,
    pub forwardfor_except: String,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            log_socket: "/var/lib/load-balancer-servo/haproxy.sock".to_string(),
            log_facility: "local2".to_string(),
            log_level: "info".to_string(),
            log_format:
                "httplog %Ts %ci %cp %si %sp %Tq %Tw %Tc %Tr %Tt %ST %U %B %f %b %s %ts %r %hrl"
                    .to_string(),
            cookie_name: "AWSELB".to_string(),
            default_idle_timeout_secs: 60,
            forwardfor_except: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListenerMapping {
    pub settings: MappingSettings,
}

impl ListenerMapping {
    pub fn new(settings: MappingSettings) -> Self {
        Self { settings }
    }
}

pub fn frontend_name(listener: &Listener) -> String {
    format!(
        "{}-{}",
        listener.protocol.to_ascii_lowercase(),
        listener.load_balancer_port
    )
}

pub fn backend_name(listener: &Listener) -> String {
    format!("backend-{}", frontend_name(listener))
}

/// Cookie value identifying a server: base64 of its IP address.
pub fn server_cookie(ip: &str) -> String {
    STANDARD.encode(ip)
}

impl SectionMapper for ListenerMapping {
    fn sections(&self, lb: &LoadBalancer) -> Result<Vec<SectionUpdate>, ServoError> {
        let s = &self.settings;
        let idle = lb
            .attributes
            .idle_timeout_secs
            .unwrap_or(s.default_idle_timeout_secs);

        let mut out: Vec<SectionUpdate> = Vec::with_capacity(lb.listeners.len() * 2);
        for listener in &lb.listeners {
            let frontend = frontend_name(listener);
            // Two listeners on one protocol/port would share a section.
            if out.iter().any(|u| u.name == frontend) {
                return Err(ConfigError::write(
                    format!("frontend {frontend}"),
                    "bind",
                    format!("duplicate listener {frontend}"),
                )
                .into());
            }
            let http = listener.is_http();
            let proto = listener.protocol.to_ascii_lowercase();
            let backend = backend_name(listener);
            let mode = if http { "http" } else { "tcp" };
            let affinity = Affinity::merge(lb, listener, &backend, &s.cookie_name)?;

            let mut fe = SectionUpdate::new(SectionKind::Frontend, frontend);
            fe.set("mode", Attribute::text(mode));
            if http {
                fe.set(
                    "option forwardfor",
                    Attribute::ForwardFor(ForwardFor::except(s.forwardfor_except.as_str())),
                );
                fe.set(
                    "http-request",
                    Attribute::HttpActions(vec![
                        HttpAction::set_header("X-Forwarded-Proto", proto.as_str()),
                        HttpAction::set_header(
                            "X-Forwarded-Port",
                            listener.load_balancer_port.to_string(),
                        ),
                    ]),
                );
            } else {
                fe.set("option tcplog", Attribute::Flag);
            }
            fe.set(
                "bind",
                Attribute::Bind(vec![Bind::new(format!(
                    "{}:{}",
                    s.bind_address, listener.load_balancer_port
                ))]),
            );
            let log = if lb.attributes.access_log {
                vec![LogTarget::target(
                    s.log_socket.as_str(),
                    s.log_facility.as_str(),
                    Some(s.log_level.as_str()),
                )]
            } else {
                Vec::new()
            };
            fe.set("log", Attribute::Log(log));
            if http {
                fe.set("log-format", Attribute::text(s.log_format.replace(' ', "\\ ")));
            }
            fe.set("timeout client", Attribute::timeout(format!("{idle}s")));
            fe.set("default_backend", Attribute::text(backend.as_str()));

            let mut be = SectionUpdate::new(SectionKind::Backend, backend.as_str());
            be.set("mode", Attribute::text(mode));
            be.set("balance", Attribute::Balance(Balance::new("roundrobin")));
            be.set("timeout server", Attribute::timeout(format!("{idle}s")));
            match (&affinity.cookie, http) {
                (Some(cookie), true) => {
                    be.set(
                        "http-response",
                        Attribute::HttpActions(vec![HttpAction::set_header(
                            "Cache-control",
                            r#"no-cache="set-cookie""#,
                        )]),
                    );
                    be.set("cookie", Attribute::Cookie(cookie.clone()));
                }
                _ => be.set("http-response", Attribute::HttpActions(Vec::new())),
            }
            be.set("server", Attribute::Servers(servers(lb, listener, &affinity, http)));

            out.push(fe);
            out.push(be);
        }
        Ok(out)
    }
}

fn servers(lb: &LoadBalancer, listener: &Listener, affinity: &Affinity, http: bool) -> Vec<Server> {
    lb.backend_instances
        .iter()
        .enumerate()
        .map(|(i, instance)| {
            let name = if instance.instance_id.is_empty() {
                format!("{}-{}", frontend_name(listener), i + 1)
            } else {
                instance.instance_id.clone()
            };
            let mut server = Server::new(
                name,
                format!("{}:{}", instance.ip_address, listener.instance_port),
            );
            if http && affinity.cookie.is_some() {
                server = server.with_param(ServerParam::value(
                    "cookie",
                    server_cookie(&instance.ip_address),
                ));
            }
            if let Some(hc) = lb.health_check.as_ref().filter(|hc| hc.interval_secs > 0) {
                server = server
                    .with_param(ServerParam::flag("check"))
                    .with_param(ServerParam::value("inter", format!("{}s", hc.interval_secs)));
                if hc.healthy_threshold > 0 {
                    server = server.with_param(ServerParam::value("rise", hc.healthy_threshold));
                }
                if hc.unhealthy_threshold > 0 {
                    server = server.with_param(ServerParam::value("fall", hc.unhealthy_threshold));
                }
            }
            if affinity.send_proxy {
                server = server.with_param(ServerParam::flag("send-proxy"));
            }
            server
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Policy merge
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Affinity {
    cookie: Option<Cookie>,
    send_proxy: bool,
}

impl Affinity {
    /// Fold the listener's policies, then those of backend servers on the same
    /// instance port. Later cookie policies override earlier ones.
    fn merge(
        lb: &LoadBalancer,
        listener: &Listener,
        backend: &str,
        cookie_name: &str,
    ) -> Result<Self, ServoError> {
        let mut names: Vec<&str> = Vec::new();
        let server_names = lb
            .backend_servers
            .iter()
            .filter(|b| b.instance_port == listener.instance_port)
            .flat_map(|b| b.policy_names.iter());
        for name in listener.policy_names.iter().chain(server_names) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }

        let missing: Vec<String> = names
            .iter()
            .filter(|n| lb.policy(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if let Some(err) = ServoError::policy_not_found(&missing) {
            return Err(err);
        }

        let mut out = Affinity::default();
        for policy in names.iter().filter_map(|n| lb.policy(n)) {
            out.apply(policy, backend, cookie_name)?;
        }
        Ok(out)
    }

    fn apply(&mut self, policy: &Policy, backend: &str, cookie_name: &str) -> Result<(), ServoError> {
        let section = format!("backend {backend}");
        match policy.policy_type.as_str() {
            LB_COOKIE_POLICY => {
                let mut cookie = Cookie::new(cookie_name, CookieMode::Insert);
                cookie.indirect = true;
                let period = policy.attribute("CookieExpirationPeriod").unwrap_or("0").trim();
                let secs: u64 = period.parse().map_err(|_| {
                    ServoError::from(ConfigError::write(
                        section.as_str(),
                        "cookie",
                        format!("policy {}: invalid CookieExpirationPeriod '{period}'", policy.name),
                    ))
                })?;
                if secs > 0 {
                    let ms = secs.checked_mul(1000).ok_or_else(|| {
                        ServoError::from(ConfigError::write(
                            section.as_str(),
                            "cookie",
                            format!(
                                "policy {}: CookieExpirationPeriod '{period}' out of range",
                                policy.name
                            ),
                        ))
                    })?;
                    let ms = ms.to_string();
                    cookie.maxidle = Some(ms.clone());
                    cookie.maxlife = Some(ms);
                }
                self.cookie = Some(cookie);
            }
            APP_COOKIE_POLICY => {
                let name = policy
                    .attribute("CookieName")
                    .map(str::trim)
                    .filter(|n| !n.is_empty() && !n.contains(char::is_whitespace))
                    .ok_or_else(|| {
                        ServoError::from(ConfigError::write(
                            section.as_str(),
                            "cookie",
                            format!("policy {}: missing or invalid CookieName", policy.name),
                        ))
                    })?;
                let mut cookie = Cookie::new(name, CookieMode::Prefix);
                cookie.nocache = true;
                self.cookie = Some(cookie);
            }
            PROXY_PROTOCOL_POLICY => {
                self.send_proxy = policy
                    .attribute("ProxyProtocol")
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servo_schemas::{BackendInstance, BackendServer, ErrorKind, HealthCheck};

    fn sticky() -> Policy {
        Policy::new("sticky", LB_COOKIE_POLICY).with_attribute("CookieExpirationPeriod", "300")
    }

    fn balancer() -> LoadBalancer {
        let mut lb = LoadBalancer::new("balancer-1");
        lb.listeners
            .push(Listener::new("HTTP", 8080, 8080).with_policy("sticky"));
        lb.backend_instances
            .push(BackendInstance::new("i-1", "10.111.10.215"));
        lb.policies.push(sticky());
        lb
    }

    #[test]
    fn names_follow_protocol_and_port() {
        let l = Listener::new("HTTP", 8080, 80);
        assert_eq!(frontend_name(&l), "http-8080");
        assert_eq!(backend_name(&l), "backend-http-8080");
    }

    #[test]
    fn server_cookie_is_base64_of_ip() {
        assert_eq!(server_cookie("10.111.10.215"), "MTAuMTExLjEwLjIxNQ==");
    }

    #[test]
    fn lb_cookie_policy_sets_cookie_and_server_cookie() {
        let updates = ListenerMapping::default().sections(&balancer()).unwrap();
        assert_eq!(updates.len(), 2);
        let be = &updates[1];
        assert_eq!(be.name, "backend-http-8080");
        let Some(Attribute::Cookie(c)) = be.get("cookie") else {
            panic!("expected cookie");
        };
        assert_eq!(
            c.to_string(),
            "AWSELB insert indirect maxidle 300000 maxlife 300000"
        );
        let Some(Attribute::Servers(servers)) = be.get("server") else {
            panic!("expected servers");
        };
        assert_eq!(
            servers[0].to_string(),
            "i-1 10.111.10.215:8080 cookie MTAuMTExLjEwLjIxNQ=="
        );
    }

    #[test]
    fn app_cookie_policy_prefixes() {
        let mut lb = balancer();
        lb.policies = vec![Policy::new("sticky", APP_COOKIE_POLICY).with_attribute("CookieName", "JSESSIONID")];
        let updates = ListenerMapping::default().sections(&lb).unwrap();
        assert_eq!(
            updates[1].get("cookie"),
            Some(&Attribute::Cookie({
                let mut c = Cookie::new("JSESSIONID", CookieMode::Prefix);
                c.nocache = true;
                c
            }))
        );
    }

    #[test]
    fn backend_server_policies_merge_on_matching_instance_port() {
        let mut lb = balancer();
        lb.listeners[0].policy_names.clear();
        lb.backend_servers.push(BackendServer::new(8080).with_policy("proxy"));
        lb.backend_servers.push(BackendServer::new(9090).with_policy("sticky"));
        lb.policies = vec![
            sticky(),
            Policy::new("proxy", PROXY_PROTOCOL_POLICY).with_attribute("ProxyProtocol", "true"),
        ];
        let updates = ListenerMapping::default().sections(&lb).unwrap();
        let be = &updates[1];
        assert_eq!(be.get("cookie"), None);
        let Some(Attribute::Servers(servers)) = be.get("server") else {
            panic!("expected servers");
        };
        assert!(servers[0].has_flag("send-proxy"));
        assert_eq!(servers[0].param("cookie"), None);
    }

    #[test]
    fn tcp_listener_uses_tcp_mode_without_http_actions() {
        let mut lb = LoadBalancer::new("lb");
        lb.listeners.push(Listener::new("TCP", 25, 2525));
        let updates = ListenerMapping::default().sections(&lb).unwrap();
        let fe = &updates[0];
        assert_eq!(fe.name, "tcp-25");
        assert_eq!(fe.get("mode"), Some(&Attribute::text("tcp")));
        assert_eq!(fe.get("option tcplog"), Some(&Attribute::Flag));
        assert_eq!(fe.get("http-request"), None);
        assert_eq!(fe.get("log-format"), None);
    }

    #[test]
    fn health_check_adds_check_params() {
        let mut lb = balancer();
        lb.health_check = Some(HealthCheck {
            target: "TCP:8080".to_string(),
            interval_secs: 30,
            timeout_secs: 5,
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        });
        let updates = ListenerMapping::default().sections(&lb).unwrap();
        let Some(Attribute::Servers(servers)) = updates[1].get("server") else {
            panic!("expected servers");
        };
        assert!(servers[0].to_string().ends_with("check inter 30s rise 2 fall 3"));
    }

    #[test]
    fn access_log_toggles_log_target() {
        let mut lb = balancer();
        let off = ListenerMapping::default().sections(&lb).unwrap();
        assert_eq!(off[0].get("log"), Some(&Attribute::Log(Vec::new())));
        lb.attributes.access_log = true;
        let on = ListenerMapping::default().sections(&lb).unwrap();
        assert_eq!(
            on[0].get("log").map(Attribute::value_lines),
            Some(vec!["/var/lib/load-balancer-servo/haproxy.sock local2 info".to_string()])
        );
    }

    #[test]
    fn unresolved_policy_fails_closed() {
        let mut lb = balancer();
        lb.policies.clear();
        let err = ListenerMapping::default().sections(&lb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
    }

    #[test]
    fn bad_expiration_period_is_section_write_error() {
        let mut lb = balancer();
        lb.policies = vec![Policy::new("sticky", LB_COOKIE_POLICY)
            .with_attribute("CookieExpirationPeriod", "soon")];
        let err = ListenerMapping::default().sections(&lb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionWrite);
    }

    #[test]
    fn oversized_expiration_period_is_section_write_error() {
        let mut lb = balancer();
        lb.policies = vec![Policy::new("sticky", LB_COOKIE_POLICY)
            .with_attribute("CookieExpirationPeriod", "18446744073709552")];
        let err = ListenerMapping::default().sections(&lb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionWrite);
    }

    #[test]
    fn duplicate_listener_port_is_rejected() {
        let mut lb = balancer();
        lb.listeners.push(Listener::new("http", 8080, 9090));
        let err = ListenerMapping::default().sections(&lb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionWrite);
        assert!(err.to_string().contains("http-8080"));
    }
}

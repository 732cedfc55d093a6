// Endpoint & Credentials Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

use super::error::{DomainError, Result};

/// Namespace used when the descriptor carries no path
pub const DEFAULT_NAMESPACE: &str = "root/cimv2";

/// Well-known CIM-XML port over plain HTTP
pub const DEFAULT_HTTP_PORT: u16 = 5988;

/// Well-known CIM-XML port over HTTPS
pub const DEFAULT_HTTPS_PORT: u16 = 5989;

/// Transport scheme of a WBEM endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => DEFAULT_HTTP_PORT,
            Scheme::Https => DEFAULT_HTTPS_PORT,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structurally valid WBEM server address
///
/// Accepted descriptor forms:
/// - `host`
/// - `host:port`
/// - `scheme://host[:port][/namespace]`
///
/// The scheme defaults to `https` and the port to the scheme's well-known
/// CIM-XML port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    namespace: String,
}

impl Endpoint {
    /// Parse an endpoint descriptor
    ///
    /// # Errors
    /// `DomainError::InvalidEndpoint` for empty input, unsupported schemes,
    /// invalid hosts, bad ports, embedded user info, query or fragment parts.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let trimmed = descriptor.trim();
        if trimmed.is_empty() {
            return Err(DomainError::endpoint(descriptor, "endpoint is empty"));
        }
        if let Some(c) = trimmed
            .chars()
            .find(|&c| c.is_whitespace() || c.is_control() || matches!(c, '?' | '#'))
        {
            return Err(DomainError::endpoint(
                descriptor,
                format!("unexpected character {:?}", c),
            ));
        }

        let (scheme, rest) = match trimmed.split_once("://") {
            Some((raw, rest)) => (parse_scheme(descriptor, raw)?, rest),
            None => (Scheme::Https, trimmed),
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };

        if authority.contains('@') {
            return Err(DomainError::endpoint(
                descriptor,
                "credentials must not be embedded in the endpoint",
            ));
        }

        let (host, port) = split_host_port(descriptor, authority)?;
        let port = match port {
            Some(raw) => parse_port(descriptor, raw)?,
            None => scheme.default_port(),
        };

        let namespace = path.trim_matches('/');
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            namespace.to_string()
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            namespace,
        })
    }

    /// Replace the namespace taken from the descriptor
    pub fn with_namespace(mut self, namespace: &str) -> Result<Self> {
        let namespace = namespace.trim().trim_matches('/');
        if namespace.is_empty() {
            return Err(DomainError::ValidationError(
                "namespace must not be empty".to_string(),
            ));
        }
        self.namespace = namespace.to_string();
        Ok(self)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Base URL without namespace (`scheme://host:port`)
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.url(), self.namespace)
    }
}

fn parse_scheme(descriptor: &str, raw: &str) -> Result<Scheme> {
    match raw.to_ascii_lowercase().as_str() {
        "http" => Ok(Scheme::Http),
        "https" => Ok(Scheme::Https),
        "" => Err(DomainError::endpoint(descriptor, "missing scheme before '://'")),
        other => Err(DomainError::endpoint(
            descriptor,
            format!("unsupported scheme '{}', use http or https", other),
        )),
    }
}

fn split_host_port<'a>(descriptor: &str, authority: &'a str) -> Result<(&'a str, Option<&'a str>)> {
    // Bracketed IPv6 literal: [::1]:5989
    if authority.starts_with('[') {
        let end = authority
            .find(']')
            .ok_or_else(|| DomainError::endpoint(descriptor, "unterminated IPv6 literal"))?;
        let host = &authority[..=end];
        if host.len() == 2 {
            return Err(DomainError::endpoint(descriptor, "missing host"));
        }
        if host[1..end].parse::<Ipv6Addr>().is_err() {
            return Err(DomainError::endpoint(descriptor, "invalid IPv6 address"));
        }
        return match &authority[end + 1..] {
            "" => Ok((host, None)),
            rest => match rest.strip_prefix(':') {
                Some(port) => Ok((host, Some(port))),
                None => Err(DomainError::endpoint(
                    descriptor,
                    "unexpected characters after IPv6 literal",
                )),
            },
        };
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    if host.is_empty() {
        return Err(DomainError::endpoint(descriptor, "missing host"));
    }
    if host.contains(':') {
        return Err(DomainError::endpoint(
            descriptor,
            "IPv6 addresses must be enclosed in brackets",
        ));
    }
    if let Some(c) = host
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-')))
    {
        return Err(DomainError::endpoint(
            descriptor,
            format!("invalid character {:?} in host", c),
        ));
    }
    if host.starts_with(['.', '-']) || host.ends_with('-') {
        return Err(DomainError::endpoint(descriptor, "invalid host name"));
    }
    Ok((host, port))
}

fn parse_port(descriptor: &str, raw: &str) -> Result<u16> {
    match raw.parse::<u16>() {
        Ok(0) => Err(DomainError::endpoint(descriptor, "port must not be zero")),
        Ok(port) => Ok(port),
        Err(_) => Err(DomainError::endpoint(
            descriptor,
            format!("invalid port '{}'", raw),
        )),
    }
}

/// Principal/secret pair used to authenticate the session
///
/// SECURITY: `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    principal: String,
    secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_descriptor() {
        let ep = Endpoint::parse("http://cimserver.example.com:15988/interop").unwrap();

        assert_eq!(ep.scheme(), Scheme::Http);
        assert_eq!(ep.host(), "cimserver.example.com");
        assert_eq!(ep.port(), 15988);
        assert_eq!(ep.namespace(), "interop");
        assert_eq!(ep.url(), "http://cimserver.example.com:15988");
    }

    #[test]
    fn test_parse_defaults() {
        let ep = Endpoint::parse("10.1.132.4").unwrap();

        assert_eq!(ep.scheme(), Scheme::Https);
        assert_eq!(ep.port(), DEFAULT_HTTPS_PORT);
        assert_eq!(ep.namespace(), DEFAULT_NAMESPACE);

        let ep = Endpoint::parse("HTTP://server").unwrap();
        assert_eq!(ep.port(), DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_parse_multi_segment_namespace() {
        let ep = Endpoint::parse("https://server/root/PG_InterOp/").unwrap();
        assert_eq!(ep.namespace(), "root/PG_InterOp");
        assert_eq!(ep.to_string(), "https://server:5989/root/PG_InterOp");
    }

    #[test]
    fn test_parse_ipv6() {
        let ep = Endpoint::parse("http://[::1]:5988").unwrap();
        assert_eq!(ep.host(), "[::1]");
        assert_eq!(ep.port(), 5988);

        assert!(Endpoint::parse("::1").is_err());
        assert!(Endpoint::parse("http://[::1").is_err());
        assert!(Endpoint::parse("http://[]:5988").is_err());
        assert!(Endpoint::parse("http://[not-an-ip]:5988").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "   ",
            "ftp://server",
            "://server",
            "http://",
            "http://:5988",
            "server:abc",
            "server:0",
            "server:70000",
            "http://user:pw@server",
            "my server",
            "server?x",
            "http://host#frag",
            "bad\u{7f}host",
            "http://ser_ver",
            "https://-server",
            "server/root/ci mv2",
            "/tmp/cimserver.socket",
        ] {
            let result = Endpoint::parse(bad);
            assert!(
                matches!(result, Err(DomainError::InvalidEndpoint { .. })),
                "expected '{}' to be rejected, got {:?}",
                bad,
                result
            );
        }
    }

    #[test]
    fn test_with_namespace() {
        let ep = Endpoint::parse("server/root/cimv2")
            .unwrap()
            .with_namespace("/interop/")
            .unwrap();
        assert_eq!(ep.namespace(), "interop");

        let err = Endpoint::parse("server").unwrap().with_namespace("  ");
        assert!(matches!(err, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("sheldon", "penny");
        let rendered = format!("{:?}", creds);

        assert!(rendered.contains("sheldon"));
        assert!(!rendered.contains("penny"));
    }
}

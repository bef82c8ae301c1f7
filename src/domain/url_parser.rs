//! Instance URL parser.
//!
//! Upstream masters encode a tunnel's addressing and options into one
//! opaque URL embedded on `instance.url`:
//!
//! ```text
//! <protocol>://[<password>@]<tunnelHost>[:<tunnelPort>]/<targetHost>[:<targetPort>][?key=value&...]
//! ```

use crate::domain::tunnel::TlsMode;
use crate::error::{Error, Result};

/// Everything extractable from an `instance.url` value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstanceUrl {
    pub protocol: String,
    pub password: Option<String>,
    pub tunnel_address: Option<String>,
    pub tunnel_port: Option<i32>,
    pub target_address: Option<String>,
    pub target_port: Option<i32>,
    pub tls_mode: TlsMode,
    pub log_level: String,
    pub crt: Option<String>,
    pub key: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub mode: Option<String>,
    pub read: Option<String>,
    pub rate: Option<String>,
}

/// Parse a single `host[:port]` fragment with IPv6 awareness, per §4.4(v).
fn parse_host_port(fragment: &str) -> (Option<String>, Option<i32>) {
    if fragment.is_empty() {
        return (None, None);
    }

    if let Some(rest) = fragment.strip_prefix('[') {
        if let Some(close) = rest.find(']') {
            let addr = &rest[..close];
            let tail = &rest[close + 1..];
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse::<i32>().ok())
                .filter(|p| (1..=65535).contains(p));
            let addr = if addr.is_empty() { None } else { Some(addr.to_string()) };
            return (addr, port);
        }
    }

    let colon_count = fragment.matches(':').count();

    if colon_count > 1 {
        // Presumed IPv6: the port is only the trailing numeric segment
        // after the *last* colon, and only if it's a valid port number.
        if let Some(last_colon) = fragment.rfind(':') {
            let candidate = &fragment[last_colon + 1..];
            if let Ok(port) = candidate.parse::<i32>() {
                if (1..=65535).contains(&port) {
                    let addr = &fragment[..last_colon];
                    let addr = if addr.is_empty() { None } else { Some(addr.to_string()) };
                    return (addr, Some(port));
                }
            }
        }
        return (Some(fragment.to_string()), None);
    }

    if colon_count == 1 {
        let mut parts = fragment.splitn(2, ':');
        let addr = parts.next().unwrap_or("");
        let port_str = parts.next().unwrap_or("");
        let port = port_str.parse::<i32>().ok();
        let addr = if addr.is_empty() { None } else { Some(addr.to_string()) };
        return (addr, port);
    }

    // No colon at all: a pure numeric fragment is a port-only value.
    if !fragment.is_empty() && fragment.bytes().all(|b| b.is_ascii_digit()) {
        return (None, fragment.parse::<i32>().ok());
    }

    (Some(fragment.to_string()), None)
}

/// Parse an `instance.url` value into its addressing and option fields.
pub fn parse_instance_url(raw: &str) -> Result<ParsedInstanceUrl> {
    let (protocol, rest) = raw
        .split_once("://")
        .ok_or_else(|| Error::InstanceUrl(format!("missing protocol separator in {raw:?}")))?;

    // Lift an optional `user@` prefix as the password. The '@' only counts
    // if it appears before the first '/' (i.e. within the host portion).
    let first_slash = rest.find('/');
    let (password, rest) = match rest.find('@') {
        Some(at_idx) if first_slash.map(|s| at_idx < s).unwrap_or(true) => {
            (Some(rest[..at_idx].to_string()), &rest[at_idx + 1..])
        }
        _ => (None, rest),
    };

    let (host_path, query) = match rest.split_once('?') {
        Some((h, q)) => (h, Some(q)),
        None => (rest, None),
    };

    let (tunnel_frag, target_frag) = match host_path.split_once('/') {
        Some((h, t)) => (h, Some(t)),
        None => (host_path, None),
    };

    let (tunnel_address, tunnel_port) = parse_host_port(tunnel_frag);
    let (target_address, target_port) = match target_frag {
        Some(t) => parse_host_port(t),
        None => (None, None),
    };

    let mut parsed = ParsedInstanceUrl {
        protocol: protocol.to_string(),
        password,
        tunnel_address,
        tunnel_port,
        target_address,
        target_port,
        tls_mode: TlsMode::Inherit,
        log_level: "inherit".to_string(),
        crt: None,
        key: None,
        min: None,
        max: None,
        mode: None,
        read: None,
        rate: None,
    };

    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tls" => {
                    if let Some(mode) = TlsMode::from_query_value(value.as_ref()) {
                        parsed.tls_mode = mode;
                    }
                }
                "log" => parsed.log_level = value.to_lowercase(),
                "crt" => parsed.crt = Some(value.into_owned()),
                "key" => parsed.key = Some(value.into_owned()),
                "min" => parsed.min = Some(value.into_owned()),
                "max" => parsed.max = Some(value.into_owned()),
                "mode" => parsed.mode = Some(value.into_owned()),
                "read" => parsed.read = Some(value.into_owned()),
                "rate" => parsed.rate = Some(value.into_owned()),
                _ => {}
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s1_style_url() {
        let parsed = parse_instance_url("client://:5000/10.0.0.1:80?log=info").unwrap();
        assert_eq!(parsed.protocol, "client");
        assert_eq!(parsed.tunnel_address, None);
        assert_eq!(parsed.tunnel_port, Some(5000));
        assert_eq!(parsed.target_address, Some("10.0.0.1".to_string()));
        assert_eq!(parsed.target_port, Some(80));
        assert_eq!(parsed.log_level, "info");
        assert_eq!(parsed.tls_mode, TlsMode::Inherit);
    }

    #[test]
    fn lifts_password_prefix() {
        let parsed = parse_instance_url("server://secret@0.0.0.0:8080/10.0.0.1:80?tls=1").unwrap();
        assert_eq!(parsed.password, Some("secret".to_string()));
        assert_eq!(parsed.tunnel_address, Some("0.0.0.0".to_string()));
        assert_eq!(parsed.tunnel_port, Some(8080));
        assert_eq!(parsed.tls_mode, TlsMode::SelfSigned);
    }

    #[test]
    fn tls_only_parses_valid_values() {
        let parsed = parse_instance_url("server://0.0.0.0:8080/10.0.0.1:80?tls=9").unwrap();
        assert_eq!(parsed.tls_mode, TlsMode::Inherit);
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let (addr, port) = parse_host_port("[::1]:8080");
        assert_eq!(addr, Some("::1".to_string()));
        assert_eq!(port, Some(8080));
    }

    #[test]
    fn bracketed_ipv6_without_port() {
        let (addr, port) = parse_host_port("[2001:db8::1]");
        assert_eq!(addr, Some("2001:db8::1".to_string()));
        assert_eq!(port, None);
    }

    #[test]
    fn unbracketed_ipv6_with_valid_trailing_port() {
        let (addr, port) = parse_host_port("2001:db8::1:8080");
        assert_eq!(addr, Some("2001:db8::1".to_string()));
        assert_eq!(port, Some(8080));
    }

    #[test]
    fn unbracketed_ipv6_without_valid_port_keeps_whole_fragment() {
        let (addr, port) = parse_host_port("2001:db8::99999");
        assert_eq!(addr, Some("2001:db8::99999".to_string()));
        assert_eq!(port, None);
    }

    #[test]
    fn traditional_host_colon_port() {
        let (addr, port) = parse_host_port("10.0.0.1:80");
        assert_eq!(addr, Some("10.0.0.1".to_string()));
        assert_eq!(port, Some(80));
    }

    #[test]
    fn pure_numeric_fragment_is_port_only() {
        let (addr, port) = parse_host_port("8080");
        assert_eq!(addr, None);
        assert_eq!(port, Some(8080));
    }

    #[test]
    fn query_keys_are_extracted() {
        let parsed = parse_instance_url(
            "server://0.0.0.0:8080/10.0.0.1:80?tls=2&log=WARN&crt=%2Fetc%2Fssl%2Fa.crt&key=%2Fetc%2Fssl%2Fa.key&min=1&max=10&mode=1&read=r&rate=100",
        )
        .unwrap();
        assert_eq!(parsed.tls_mode, TlsMode::Custom);
        assert_eq!(parsed.log_level, "warn");
        assert_eq!(parsed.crt, Some("/etc/ssl/a.crt".to_string()));
        assert_eq!(parsed.key, Some("/etc/ssl/a.key".to_string()));
        assert_eq!(parsed.min, Some("1".to_string()));
        assert_eq!(parsed.max, Some("10".to_string()));
        assert_eq!(parsed.mode, Some("1".to_string()));
        assert_eq!(parsed.read, Some("r".to_string()));
        assert_eq!(parsed.rate, Some("100".to_string()));
    }

    #[test]
    fn missing_protocol_is_an_error() {
        assert!(parse_instance_url("not-a-url").is_err());
    }
}

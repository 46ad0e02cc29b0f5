//! Reduction of arbitrary hosts to the unit that `domain` and `https-domain`
//! rules are matched against.
//!
//! IP literals are kept as they are. Hostnames are reduced to their
//! registrable domain (public suffix plus one label) and prefixed with
//! [`DOMAIN_SEPARATOR`], so `www.example.co.uk` becomes `.example.co.uk`.
//! Anything that cannot be reduced is returned unchanged.

use std::net::IpAddr;

/// Leading marker that distinguishes a registrable domain from an exact host.
pub const DOMAIN_SEPARATOR: char = '.';

/// Returns the canonical matching unit for `host`. Never fails.
pub fn canonicalize(host: &str) -> String {
    if is_ip_literal(host) {
        return host.to_string();
    }
    if let Some((ip, _port)) = split_host_port(host) {
        if is_ip_literal(ip) {
            return ip.to_string();
        }
    }
    match registrable_domain(host) {
        Some(domain) => format!("{DOMAIN_SEPARATOR}{domain}"),
        None => host.to_string(),
    }
}

/// Splits `host:port`, including the bracketed IPv6 form `[::1]:443`.
///
/// Returns `None` when no port is present or when the input has more than
/// one colon outside of brackets (a bare IPv6 literal).
pub fn split_host_port(input: &str) -> Option<(&str, &str)> {
    if let Some(rest) = input.strip_prefix('[') {
        let end = rest.find(']')?;
        let port = rest[end + 1..].strip_prefix(':')?;
        if port.contains([':', '[', ']']) {
            return None;
        }
        return Some((&rest[..end], port));
    }

    let colon = input.rfind(':')?;
    let (host, port) = (&input[..colon], &input[colon + 1..]);
    if host.contains([':', '[', ']']) || port.contains([']', '[']) {
        return None;
    }
    Some((host, port))
}

fn is_ip_literal(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

fn registrable_domain(host: &str) -> Option<&str> {
    // Empty labels never reduce; this also keeps already-canonical input stable.
    if host.is_empty()
        || host.starts_with(DOMAIN_SEPARATOR)
        || host.ends_with('.')
        || host.contains("..")
    {
        return None;
    }
    psl::domain_str(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_literals_are_unchanged() {
        assert_eq!(canonicalize("93.184.216.34"), "93.184.216.34");
        assert_eq!(canonicalize("2001:db8::1"), "2001:db8::1");
        assert_eq!(canonicalize("::1"), "::1");
    }

    #[test]
    fn test_ip_with_port_drops_port() {
        assert_eq!(canonicalize("93.184.216.34:443"), "93.184.216.34");
        assert_eq!(canonicalize("[2001:db8::1]:8443"), "2001:db8::1");
        assert_eq!(canonicalize("10.0.0.1:"), "10.0.0.1");
    }

    #[test]
    fn test_hostnames_reduce_to_registrable_domain() {
        assert_eq!(canonicalize("example.com"), ".example.com");
        assert_eq!(canonicalize("www.example.com"), ".example.com");
        assert_eq!(canonicalize("a.b.c.example.com"), ".example.com");
        assert_eq!(canonicalize("example.co.uk"), ".example.co.uk");
        assert_eq!(canonicalize("static.cdn.example.co.uk"), ".example.co.uk");
    }

    #[test]
    fn test_unreducible_hosts_fall_back_to_input() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("localhost"), "localhost");
        assert_eq!(canonicalize("co.uk"), "co.uk");
        assert_eq!(canonicalize("bad..example.com"), "bad..example.com");
        assert_eq!(canonicalize("example.com."), "example.com.");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        for host in [
            "www.example.com",
            "deep.sub.example.co.uk",
            "93.184.216.34",
            "93.184.216.34:443",
            "localhost",
        ] {
            let once = canonicalize(host);
            let again = canonicalize(once.trim_start_matches(DOMAIN_SEPARATOR));
            assert_eq!(once, again, "not idempotent for {host}");
            assert_eq!(canonicalize(&once), once);
        }
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com:443"), Some(("example.com", "443")));
        assert_eq!(split_host_port("[::1]:80"), Some(("::1", "80")));
        assert_eq!(split_host_port("example.com"), None);
        assert_eq!(split_host_port("2001:db8::1"), None);
        assert_eq!(split_host_port("[::1]"), None);
        assert_eq!(split_host_port("[::1"), None);
    }
}

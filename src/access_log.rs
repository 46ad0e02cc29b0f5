//! Parser for proxy access-log lines in the native squid format:
//!
//! ```text
//! <epoch.frac> <elapsed-ms> <client> <result>/<code> <bytes> <method> <target> - <hier>/<peer> <content-type>
//! ```

use crate::domain::{canonicalize, split_host_port};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// Display format for entry timestamps, always UTC.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    //                time       ms      client   result     bytes  method  target           peer  type
    Regex::new(r"^\s*([0-9.]+)\s+\d+\s+(\S+)\s+(\S+)\s+\d+\s+(\w+)\s+(\S+)\s+-\s\S+\s(\S+)")
        .expect("access log pattern compiles")
});

/// One parsed access-log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Utc>,
    pub client: String,
    pub method: String,
    /// Canonical domain of `host`, see [`crate::domain::canonicalize`].
    pub domain: String,
    /// Target host with any port removed.
    pub host: String,
    /// Path of a full URL target; empty for `host:port` targets.
    pub path: String,
    /// The target exactly as logged.
    pub url: String,
    pub content_type: String,
}

impl LogEntry {
    pub fn display_time(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }
}

fn serialize_time<S: Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&time.format(TIME_FORMAT))
}

/// Result of feeding one line to [`parse_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Entry(LogEntry),
    /// Blank line; nothing to report.
    Skip,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogParseError {
    #[error("bad log line: {line:?}")]
    Malformed { line: String },

    #[error("failed to parse epoch time {value:?} in line {line:?}")]
    BadEpoch { value: String, line: String },
}

impl LogParseError {
    /// The offending line, for diagnostics.
    pub fn line(&self) -> &str {
        match self {
            LogParseError::Malformed { line } | LogParseError::BadEpoch { line, .. } => line,
        }
    }
}

/// Parses one raw log line. A line either yields a complete entry, is
/// skipped (empty), or is rejected whole.
pub fn parse_line(line: &str) -> Result<LineOutcome, LogParseError> {
    if line.is_empty() {
        return Ok(LineOutcome::Skip);
    }

    let caps = LINE_RE
        .captures(line)
        .ok_or_else(|| LogParseError::Malformed {
            line: line.to_string(),
        })?;

    let epoch = &caps[1];
    let time = epoch_to_utc(epoch).ok_or_else(|| LogParseError::BadEpoch {
        value: epoch.to_string(),
        line: line.to_string(),
    })?;

    let target = &caps[5];
    let (host, path) = split_target(target);

    Ok(LineOutcome::Entry(LogEntry {
        time,
        client: caps[2].to_string(),
        method: caps[4].to_string(),
        domain: canonicalize(&host),
        host,
        path,
        url: target.to_string(),
        content_type: caps[6].to_string(),
    }))
}

/// Converts a fractional Unix timestamp into whole seconds plus nanoseconds.
fn epoch_to_utc(value: &str) -> Option<DateTime<Utc>> {
    let ts: f64 = value.parse().ok()?;
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.trunc();
    let nanos = ((ts - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Splits a request target into (host, path).
///
/// Full URLs (`http://host/path`) are split on the logged text, so the path
/// keeps any `..` segments and is percent-decoded; anything else is a
/// CONNECT style `host` or `host:port` with no path. Hosts are lowercased.
fn split_target(target: &str) -> (String, String) {
    if target.contains('/') && Url::parse(target).is_ok() {
        let rest = target.split_once(':').map_or("", |(_, rest)| rest);
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let Some(hier) = rest.strip_prefix("//") else {
            // `scheme:/path` has no authority; `scheme:opaque` has neither.
            let path = if rest.starts_with('/') { decode_path(rest) } else { String::new() };
            return (String::new(), path);
        };
        let (authority, path) = hier.split_at(hier.find('/').unwrap_or(hier.len()));
        let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        let host = match split_host_port(authority) {
            Some((host, _port)) => host,
            None => authority.trim_start_matches('[').trim_end_matches(']'),
        };
        return (host.to_lowercase(), decode_path(path));
    }

    let host = match split_host_port(target) {
        Some((host, _port)) => host,
        None => target,
    };
    (host.to_lowercase(), String::new())
}

fn decode_path(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: &str) -> LogEntry {
        match parse_line(line) {
            Ok(LineOutcome::Entry(e)) => e,
            other => panic!("expected entry for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_full_url() {
        let e = entry(
            "1700000000.123    50 10.0.0.5 TCP_MISS/200 512 GET http://example.co.uk/a/b - HIER_DIRECT/1.2.3.4 text/html",
        );
        assert_eq!(e.domain, ".example.co.uk");
        assert_eq!(e.host, "example.co.uk");
        assert_eq!(e.path, "/a/b");
        assert_eq!(e.method, "GET");
        assert_eq!(e.client, "10.0.0.5");
        assert_eq!(e.url, "http://example.co.uk/a/b");
        assert_eq!(e.content_type, "text/html");
        assert_eq!(e.display_time(), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_parse_connect_to_ip() {
        let e = entry(
            "1700000000.000 10 10.0.0.5 TCP_TUNNEL/200 0 CONNECT 93.184.216.34:443 - HIER_DIRECT/93.184.216.34 -",
        );
        assert_eq!(e.host, "93.184.216.34");
        assert_eq!(e.domain, "93.184.216.34");
        assert_eq!(e.path, "");
        assert_eq!(e.method, "CONNECT");
        assert_eq!(e.url, "93.184.216.34:443");
        assert_eq!(e.content_type, "-");
    }

    #[test]
    fn test_parse_connect_to_hostname() {
        let e = entry(
            "1700000001.5 120 192.168.1.20 TCP_TUNNEL/200 4711 CONNECT www.example.com:443 - HIER_DIRECT/93.184.216.34 -",
        );
        assert_eq!(e.host, "www.example.com");
        assert_eq!(e.domain, ".example.com");
        assert_eq!(e.path, "");
        assert_eq!(e.time.timestamp(), 1_700_000_001);
        assert_eq!(e.time.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_url_with_port_strips_port() {
        let e = entry(
            "1700000000.000 3 10.0.0.7 TCP_MISS/304 0 GET http://static.example.com:8080/img.png - HIER_DIRECT/10.1.1.1 image/png",
        );
        assert_eq!(e.host, "static.example.com");
        assert_eq!(e.domain, ".example.com");
        assert_eq!(e.path, "/img.png");
    }

    #[test]
    fn test_parse_connect_to_ipv6() {
        let e = entry(
            "1700000000.000 10 10.0.0.5 TCP_TUNNEL/200 0 CONNECT [2001:db8::1]:443 - HIER_DIRECT/2001:db8::1 -",
        );
        assert_eq!(e.host, "2001:db8::1");
        assert_eq!(e.domain, "2001:db8::1");
    }

    #[test]
    fn test_empty_line_is_skipped() {
        assert_eq!(parse_line(""), Ok(LineOutcome::Skip));
    }

    #[test]
    fn test_malformed_lines_are_rejected_whole() {
        for line in [
            "garbage",
            " ",
            "1700000000.000 10 10.0.0.5 TCP_TUNNEL/200",
            "1700000000.000 abc 10.0.0.5 TCP_MISS/200 0 GET http://x/ - HIER_NONE/- -",
            "1700000000.000 10 10.0.0.5 TCP_MISS/200 0 GET http://example.com/",
        ] {
            match parse_line(line) {
                Err(LogParseError::Malformed { line: l }) => assert_eq!(l, line),
                other => panic!("expected malformed for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_bad_epoch_is_malformed() {
        let line = "1.2.3 10 10.0.0.5 TCP_MISS/200 0 GET http://example.com/ - HIER_DIRECT/1.1.1.1 text/html";
        let err = parse_line(line).unwrap_err();
        assert!(matches!(err, LogParseError::BadEpoch { ref value, .. } if value == "1.2.3"));
        assert_eq!(err.line(), line);
    }

    #[test]
    fn test_entry_serializes_with_readable_time() {
        let e = entry(
            "1700000000.999 1 10.0.0.5 TCP_MISS/200 1 GET http://example.com/x - HIER_DIRECT/1.1.1.1 text/plain",
        );
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["time"], "2023-11-14 22:13:20 UTC");
        assert_eq!(json["domain"], ".example.com");
    }

    #[test]
    fn test_url_path_is_taken_from_logged_text() {
        let e = entry(
            "1700000000.000 3 10.0.0.7 TCP_MISS/200 10 GET http://Example.COM/x/../a%20b?q=1 - HIER_DIRECT/10.1.1.1 text/html",
        );
        assert_eq!(e.host, "example.com");
        assert_eq!(e.path, "/x/../a b");
        assert_eq!(e.url, "http://Example.COM/x/../a%20b?q=1");

        let bare = entry(
            "1700000000.000 3 10.0.0.7 TCP_MISS/200 10 GET http://user@example.com:8080 - HIER_DIRECT/10.1.1.1 text/html",
        );
        assert_eq!(bare.host, "example.com");
        assert_eq!(bare.path, "");
    }

    #[test]
    fn test_host_case_does_not_split_domains() {
        let tunnel = entry(
            "1700000000.000 10 10.0.0.5 TCP_TUNNEL/200 0 CONNECT WWW.Example.com:443 - HIER_DIRECT/93.184.216.34 -",
        );
        let plain = entry(
            "1700000000.000 10 10.0.0.5 TCP_MISS/200 0 GET http://www.EXAMPLE.com/ - HIER_DIRECT/93.184.216.34 text/html",
        );
        assert_eq!(tunnel.host, "www.example.com");
        assert_eq!(tunnel.domain, ".example.com");
        assert_eq!(tunnel.domain, plain.domain);
    }

    #[test]
    fn test_url_with_ipv6_host() {
        let e = entry(
            "1700000000.000 3 10.0.0.7 TCP_MISS/200 10 GET http://[2001:db8::1]:8080/index.html - HIER_DIRECT/2001:db8::1 text/html",
        );
        assert_eq!(e.host, "2001:db8::1");
        assert_eq!(e.domain, "2001:db8::1");
        assert_eq!(e.path, "/index.html");
    }
}

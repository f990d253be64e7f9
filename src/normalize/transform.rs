//! Field-level transforms shared by the normalization processors.
//!
//! The coercion helpers return `None` for anything unparseable: "source did
//! not report this" is an explicit absence, never an error and never a
//! synthetic zero.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::OnceLock;

use regex::Regex;

/// Default bound for slugged names.
pub const SLUG_MAX_LEN: usize = 50;

/// BGP session state codes, keyed case-insensitively by state name.
fn session_state_map() -> &'static HashMap<&'static str, u8> {
    static MAP: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("idle", 1),
            ("connect", 2),
            ("active", 3),
            ("opensent", 4),
            ("openconfirm", 5),
            ("established", 6),
        ])
    })
}

/// Numeric code for a BGP session state name.
///
/// State names outside the fixed enumeration map to no code.
///
/// # Examples
///
/// ```
/// use netgauge::normalize::transform::session_state_code;
///
/// assert_eq!(session_state_code("Established"), Some(6));
/// assert_eq!(session_state_code("half-open"), None);
/// ```
pub fn session_state_code(state: &str) -> Option<u8> {
    session_state_map().get(state.to_lowercase().as_str()).copied()
}

/// Canonicalize a BGP neighbor type string.
///
/// Case-insensitive substring match: anything containing "external" or
/// "ebgp" becomes `EXTERNAL`, anything containing "internal" or "ibgp"
/// becomes `INTERNAL`; everything else passes through unchanged.
///
/// # Examples
///
/// ```
/// use netgauge::normalize::transform::canonical_peer_type;
///
/// assert_eq!(canonical_peer_type("external peer"), "EXTERNAL");
/// assert_eq!(canonical_peer_type("iBGP"), "INTERNAL");
/// ```
pub fn canonical_peer_type(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("external") || lower.contains("ebgp") {
        "EXTERNAL".to_string()
    } else if lower.contains("internal") || lower.contains("ibgp") {
        "INTERNAL".to_string()
    } else {
        raw.to_string()
    }
}

/// Strip a trailing `+<port>` suffix from an address string.
///
/// # Examples
///
/// ```
/// use netgauge::normalize::transform::strip_port_suffix;
///
/// assert_eq!(strip_port_suffix("192.168.7.7+179"), "192.168.7.7");
/// assert_eq!(strip_port_suffix("192.168.4.4"), "192.168.4.4");
/// ```
pub fn strip_port_suffix(raw: &str) -> &str {
    match raw.split_once('+') {
        Some((address, _port)) => address,
        None => raw,
    }
}

/// Parse an address string (optionally carrying a `+<port>` suffix) as an
/// IP address; absent on failure.
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    strip_port_suffix(raw).trim().parse().ok()
}

/// Integer coercion: absent on failure, never an error, never zero.
pub fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Normalize a MAC address to lowercase colon-separated octets.
///
/// Accepts hexadecimal-with-`0x`-prefix or already-delimited forms
/// (`:`, `-`, `.`); absent when the input does not hold twelve hex digits.
///
/// # Examples
///
/// ```
/// use netgauge::normalize::transform::normalize_mac;
///
/// assert_eq!(
///     normalize_mac("0x02AB11223344").as_deref(),
///     Some("02:ab:11:22:33:44")
/// );
/// assert_eq!(
///     normalize_mac("02AB.1122.3344").as_deref(),
///     Some("02:ab:11:22:33:44")
/// );
/// ```
pub fn normalize_mac(raw: &str) -> Option<String> {
    let hex: String = raw
        .trim()
        .strip_prefix("0x")
        .unwrap_or(raw.trim())
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let lower = hex.to_lowercase();
    let octets: Vec<&str> = (0..6).map(|i| &lower[i * 2..i * 2 + 2]).collect();
    Some(octets.join(":"))
}

/// Slug a group/session name into a bounded, lowercase, ASCII token.
///
/// Strips characters outside `[A-Za-z0-9_.\-\s]`, trims, collapses runs of
/// `-`, `.`, and whitespace into single `-`, drops non-ASCII, lowercases,
/// and truncates to `max_len`. Idempotent on its own output.
pub fn slugify(raw: &str, max_len: usize) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();
    let strip =
        STRIP.get_or_init(|| Regex::new(r"[^\-.\w\s]").expect("slug strip regex must compile"));
    let collapse = COLLAPSE
        .get_or_init(|| Regex::new(r"[\-.\s]+").expect("slug collapse regex must compile"));

    let cleaned = strip.replace_all(raw, "");
    let cleaned = cleaned.trim().to_lowercase();
    let joined = collapse.replace_all(&cleaned, "-");
    let ascii: String = joined.chars().filter(char::is_ascii).collect();
    ascii.chars().take(max_len).collect()
}

/// [`slugify`] with the default length bound.
pub fn slug(raw: &str) -> String {
    slugify(raw, SLUG_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_codes_case_insensitive() {
        assert_eq!(session_state_code("Established"), Some(6));
        assert_eq!(session_state_code("ESTABLISHED"), Some(6));
        assert_eq!(session_state_code("established"), Some(6));
        assert_eq!(session_state_code("idle"), Some(1));
        assert_eq!(session_state_code("connect"), Some(2));
        assert_eq!(session_state_code("active"), Some(3));
        assert_eq!(session_state_code("OpenSent"), Some(4));
        assert_eq!(session_state_code("OpenConfirm"), Some(5));
        // Unrecognized states map to no code, not an error.
        assert_eq!(session_state_code("half-open"), None);
    }

    #[test]
    fn test_peer_type_canonicalization() {
        assert_eq!(canonical_peer_type("external peer"), "EXTERNAL");
        assert_eq!(canonical_peer_type("eBGP"), "EXTERNAL");
        assert_eq!(canonical_peer_type("internal peer"), "INTERNAL");
        assert_eq!(canonical_peer_type("iBGP"), "INTERNAL");
        assert_eq!(canonical_peer_type("unknown-custom"), "unknown-custom");
    }

    #[test]
    fn test_strip_port_suffix() {
        assert_eq!(strip_port_suffix("192.168.7.7+179"), "192.168.7.7");
        assert_eq!(strip_port_suffix("192.168.4.4"), "192.168.4.4");
        assert_eq!(strip_port_suffix("2001:db8::1+52302"), "2001:db8::1");
    }

    #[test]
    fn test_parse_ip() {
        assert_eq!(
            parse_ip("192.168.7.7+179"),
            Some("192.168.7.7".parse().unwrap())
        );
        assert_eq!(parse_ip("2001:db8::1"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(parse_ip("not-an-ip"), None);
    }

    #[test]
    fn test_parse_int_absent_on_failure() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int(" 42 "), Some(42));
        assert_eq!(parse_int("n/a"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_mac_normalization_forms() {
        assert_eq!(
            normalize_mac("0x02AB11223344").as_deref(),
            Some("02:ab:11:22:33:44")
        );
        assert_eq!(
            normalize_mac("02-AB-11-22-33-44").as_deref(),
            Some("02:ab:11:22:33:44")
        );
        assert_eq!(
            normalize_mac("02ab.1122.3344").as_deref(),
            Some("02:ab:11:22:33:44")
        );
        assert_eq!(
            normalize_mac("02:ab:11:22:33:44").as_deref(),
            Some("02:ab:11:22:33:44")
        );
        assert_eq!(normalize_mac("02:ab:11"), None);
        assert_eq!(normalize_mac("zz:zz:zz:zz:zz:zz"), None);
    }

    #[test]
    fn test_slug_collapses_and_bounds() {
        assert_eq!(slug("AnyConnect Client"), "anyconnect-client");
        assert_eq!(slug("  Group -- 1 .. a  "), "group-1-a");
        assert_eq!(slug("IKEv2 VPN (remote)"), "ikev2-vpn-remote");
        let long = "x".repeat(80);
        assert_eq!(slug(&long).len(), SLUG_MAX_LEN);
    }

    #[test]
    fn test_slug_is_idempotent() {
        let once = slug("Clientless  VPN -- East.Coast");
        assert_eq!(slug(&once), once);
    }

    #[test]
    fn test_slug_drops_non_ascii() {
        assert_eq!(slug("café münchen"), "caf-mnchen");
    }
}

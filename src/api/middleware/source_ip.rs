//! Client address resolution from proxy headers

use std::net::IpAddr;

use axum::http::HeaderMap;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Placeholder logged when no client address is known
pub const UNKNOWN_SOURCE_IP: &str = "-";

/// First public address in `X-Forwarded-For`, then `X-Real-IP`
pub fn public_source_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|candidate| candidate.trim().parse::<IpAddr>().ok())
        .find(is_public);

    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    headers
        .get(X_REAL_IP)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
}

/// Source IP for log lines, `-` when unknown
pub fn source_ip_or_dash(headers: &HeaderMap) -> String {
    public_source_ip(headers).unwrap_or_else(|| UNKNOWN_SOURCE_IP.to_string())
}

fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64))
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_first_public_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("10.0.0.1, 192.168.1.5, 8.8.8.8, 1.1.1.1"),
        );
        headers.insert(X_REAL_IP, HeaderValue::from_static("9.9.9.9"));

        assert_eq!(public_source_ip(&headers).as_deref(), Some("8.8.8.8"));
    }

    #[test]
    fn test_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1, unknown"));
        headers.insert(X_REAL_IP, HeaderValue::from_static("203.0.114.7"));

        assert_eq!(public_source_ip(&headers).as_deref(), Some("203.0.114.7"));
    }

    #[test]
    fn test_unknown_source() {
        assert_eq!(source_ip_or_dash(&HeaderMap::new()), "-");
    }

    #[test]
    fn test_private_ranges() {
        for private in ["127.0.0.1", "172.16.4.2", "169.254.0.1", "100.64.1.1", "::1", "fd00::1", "fe80::1"] {
            let ip: IpAddr = private.parse().unwrap();
            assert!(!is_public(&ip), "{private} should not be public");
        }
        assert!(is_public(&"2606:4700::1111".parse().unwrap()));
    }
}

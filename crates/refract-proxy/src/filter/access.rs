//! Source-IP allow-list with a loopback bypass.

use super::codec::set_content_length;
use super::FilterError;
use anyhow::Context;
use bytes::Bytes;
use hyper::{Response, StatusCode};
use ipnet::IpNet;
use std::net::SocketAddr;
use tracing::{debug, error};

/// Body sent in place of the upstream response when a client is refused.
pub const FORBIDDEN_BODY: &str = "Access forbidden from this IP";

/// Parse the configured CIDR allow-list, keeping its order.
pub fn parse_networks(cidrs: &[String]) -> Result<Vec<IpNet>, anyhow::Error> {
    cidrs
        .iter()
        .map(|cidr| {
            cidr.trim()
                .parse::<IpNet>()
                .with_context(|| format!("invalid restricted network '{cidr}'"))
        })
        .collect()
}

/// Decide whether the client at `remote_addr` may see filtered content.
///
/// An empty allow-list lets everyone through. Loopback clients always pass.
/// An address that is not `ip:port` is an error, never an implicit allow.
pub fn authorize(remote_addr: &str, restricted: &[IpNet]) -> Result<bool, FilterError> {
    if restricted.is_empty() {
        return Ok(true);
    }

    let addr: SocketAddr = remote_addr.parse().map_err(|_| {
        error!(userip = %remote_addr, "userip is not IP:port");
        FilterError::AddressParse {
            addr: remote_addr.to_string(),
        }
    })?;

    let ip = addr.ip().to_canonical();
    if ip.is_loopback() {
        return Ok(true);
    }

    let allowed = restricted.iter().any(|net| net.contains(&ip));
    if !allowed {
        debug!(source = %ip, "forbidden from this IP");
    }
    Ok(allowed)
}

/// Replace the response with the fixed 403 denial. Other headers are kept.
pub fn deny(res: &mut Response<Bytes>) {
    *res.body_mut() = Bytes::from_static(FORBIDDEN_BODY.as_bytes());
    set_content_length(res.headers_mut(), FORBIDDEN_BODY.len());
    *res.status_mut() = StatusCode::FORBIDDEN;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};

    fn nets(cidrs: &[&str]) -> Vec<IpNet> {
        parse_networks(&cidrs.iter().map(|c| c.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_empty_allow_list_allows_everyone() {
        assert!(authorize("203.0.113.9:5555", &[]).unwrap());
        // Not even parsed when unrestricted
        assert!(authorize("garbage", &[]).unwrap());
    }

    #[test]
    fn test_loopback_always_allowed() {
        let restricted = nets(&["10.0.0.0/8"]);
        assert!(authorize("127.0.0.1:40000", &restricted).unwrap());
        assert!(authorize("[::1]:40000", &restricted).unwrap());
        assert!(authorize("[::ffff:127.0.0.1]:40000", &restricted).unwrap());
    }

    #[test]
    fn test_ip_inside_network_allowed() {
        let restricted = nets(&["192.168.1.0/24", "10.0.0.0/8"]);
        assert!(authorize("10.20.30.40:1234", &restricted).unwrap());
        assert!(authorize("192.168.1.77:1234", &restricted).unwrap());
    }

    #[test]
    fn test_ip_outside_networks_denied() {
        let restricted = nets(&["192.168.1.0/24"]);
        assert!(!authorize("192.168.2.1:1234", &restricted).unwrap());
        assert!(!authorize("[2001:db8::1]:1234", &restricted).unwrap());
    }

    #[test]
    fn test_malformed_address_is_error() {
        let restricted = nets(&["192.168.1.0/24"]);
        assert!(matches!(
            authorize("192.168.1.5", &restricted),
            Err(FilterError::AddressParse { .. })
        ));
        assert!(matches!(
            authorize("localhost:80", &restricted),
            Err(FilterError::AddressParse { .. })
        ));
    }

    #[test]
    fn test_parse_networks_rejects_invalid() {
        let err = parse_networks(&["10.0.0.0/33".to_string()]).unwrap_err();
        assert!(err.to_string().contains("10.0.0.0/33"));
    }

    #[test]
    fn test_deny_replaces_body_and_status() {
        let mut res = Response::builder()
            .status(200)
            .header(CONTENT_TYPE, "text/html")
            .header(CONTENT_LENGTH, "5")
            .body(Bytes::from_static(b"hello"))
            .unwrap();

        deny(&mut res);

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.body().as_ref(), FORBIDDEN_BODY.as_bytes());
        assert_eq!(
            res.headers().get(CONTENT_LENGTH).unwrap(),
            &FORBIDDEN_BODY.len().to_string()
        );
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "text/html");
    }
}

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, Request},
};
use std::net::SocketAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Resolve the originating client IP for allow-list checks.
///
/// Order: first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
/// address without its port. Returns an empty string when nothing resolves.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or("");
    if !forwarded.is_empty() {
        return forwarded.to_string();
    }

    let real_ip = header_str(headers, X_REAL_IP).map(str::trim).unwrap_or("");
    if !real_ip.is_empty() {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Client IP of a request, using `ConnectInfo<SocketAddr>` as the peer when
/// the server was started with connect info.
pub fn client_ip_of<B>(request: &Request<B>) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve_client_ip(request.headers(), peer)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some(SocketAddr::from(([192, 168, 1, 20], 51234)))
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let h = headers(&[
            ("x-forwarded-for", " 10.0.0.1 , 172.16.0.1"),
            ("x-real-ip", "10.9.9.9"),
        ]);
        assert_eq!(resolve_client_ip(&h, peer()), "10.0.0.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[("x-real-ip", " 10.9.9.9 ")]);
        assert_eq!(resolve_client_ip(&h, peer()), "10.9.9.9");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let h = headers(&[("x-forwarded-for", " , 172.16.0.1"), ("x-real-ip", "10.9.9.9")]);
        assert_eq!(resolve_client_ip(&h, peer()), "10.9.9.9");
    }

    #[test]
    fn test_peer_address_strips_port() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), peer()), "192.168.1.20");

        let v6 = Some("[::1]:8080".parse().unwrap());
        assert_eq!(resolve_client_ip(&HeaderMap::new(), v6), "::1");
    }

    #[test]
    fn test_unresolvable_is_empty() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), "");
    }

    #[test]
    fn test_client_ip_of_reads_connect_info() {
        let mut request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        assert_eq!(client_ip_of(&request), "");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_ip_of(&request), "127.0.0.1");
    }
}

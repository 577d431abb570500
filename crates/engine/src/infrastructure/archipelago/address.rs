//! Turning a user-typed server address into websocket URLs.

use url::Url;

use crate::infrastructure::ports::TransportError;

/// Port the public Archipelago host listens on when none is given.
pub const DEFAULT_PORT: u16 = 38281;

/// URLs to try, in order. A bare `host[:port]` tries TLS first, then plain.
pub fn candidate_urls(host: &str) -> Result<Vec<Url>, TransportError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(TransportError::InvalidAddress(host.to_string()));
    }

    if host.contains("://") {
        let url = parse_with_port(host)?;
        return match url.scheme() {
            "ws" | "wss" => Ok(vec![url]),
            _ => Err(TransportError::InvalidAddress(host.to_string())),
        };
    }

    Ok(vec![
        parse_with_port(&format!("wss://{host}"))?,
        parse_with_port(&format!("ws://{host}"))?,
    ])
}

fn parse_with_port(raw: &str) -> Result<Url, TransportError> {
    let invalid = || TransportError::InvalidAddress(raw.to_string());
    let mut url = Url::parse(raw).map_err(|_| invalid())?;
    if url.host_str().is_none() {
        return Err(invalid());
    }
    if url.port().is_none() {
        url.set_port(Some(DEFAULT_PORT)).map_err(|_| invalid())?;
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_tries_tls_then_plain() {
        let urls = candidate_urls("archipelago.gg:38281").expect("valid address");
        let urls: Vec<_> = urls.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec!["wss://archipelago.gg:38281/", "ws://archipelago.gg:38281/"]
        );
    }

    #[test]
    fn missing_port_uses_default() {
        let urls = candidate_urls("localhost").expect("valid address");
        assert!(urls.iter().all(|u| u.port() == Some(DEFAULT_PORT)));
    }

    #[test]
    fn explicit_scheme_is_used_alone() {
        let urls = candidate_urls("ws://127.0.0.1:1234").expect("valid address");
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].port(), Some(1234));
    }

    #[test]
    fn rejects_non_websocket_scheme_and_blank_input() {
        assert!(matches!(
            candidate_urls("http://example.com"),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            candidate_urls("   "),
            Err(TransportError::InvalidAddress(_))
        ));
    }
}

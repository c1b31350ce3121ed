use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during feed URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Validates a URL string for use as a feed source.
///
/// Always rejects non-HTTP(S) schemes and host-less URLs. Unless
/// `allow_private_hosts` is set, also rejects localhost, loopback and
/// private/link-local ranges so a polled URL cannot be used to reach
/// internal services.
///
/// # Examples
///
/// ```
/// use atomdiff::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://example.com/feed.atom", false).is_ok());
/// assert!(validate_feed_url("http://192.168.1.1/feed", false).is_err());
/// assert!(validate_feed_url("http://192.168.1.1/feed", true).is_ok());
/// assert!(validate_feed_url("file:///etc/passwd", true).is_err());
/// ```
pub fn validate_feed_url(url_str: &str, allow_private_hosts: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if allow_private_hosts {
        return Ok(url);
    }

    if host == "localhost" {
        return Err(UrlValidationError::Localhost);
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

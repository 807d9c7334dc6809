//! Target validation for outbound fetches.

use std::net::{IpAddr, Ipv4Addr};

use blogwriter_shared::{BlogWriterError, Result};
use url::Url;

/// Redirect hops followed before a fetch gives up.
pub const MAX_REDIRECTS: usize = 5;

/// Parse `raw` and accept only `http`/`https` URLs with a host.
pub fn parse_source_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| BlogWriterError::validation(format!("invalid URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(BlogWriterError::validation(format!(
                "unsupported URL scheme '{other}' (expected http or https)"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(BlogWriterError::validation(format!("URL '{raw}' has no host")));
    }
    Ok(url)
}

/// Check if a URL targets a loopback, private or link-local resource.
pub fn is_private_target(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d reaches the IPv4 host.
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_v4(&v4);
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 (unique local)
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 (link-local)
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 100.64.0.0/10 (Carrier-grade NAT)
        || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
}

/// Whether a redirect to `next` may be followed after `hops` earlier
/// redirects. Private targets are refused at every hop.
pub fn check_redirect(next: &Url, hops: usize) -> std::result::Result<(), String> {
    if hops >= MAX_REDIRECTS {
        return Err(format!("too many redirects (limit {MAX_REDIRECTS})"));
    }
    if is_private_target(next) {
        return Err(format!("redirect to {next}: private or loopback hosts are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(parse_source_url("https://example.com/post").is_ok());
        assert!(parse_source_url("  http://example.com  ").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(parse_source_url("file:///etc/passwd").is_err());
        assert!(parse_source_url("ftp://example.com").is_err());
        assert!(parse_source_url("not a url").is_err());
    }

    #[test]
    fn private_targets() {
        for raw in [
            "http://127.0.0.1:8080/",
            "http://10.0.0.1/",
            "http://192.168.1.1/admin",
            "http://localhost/",
            "http://[::1]/",
            "http://printer.local/",
        ] {
            assert!(is_private_target(&Url::parse(raw).unwrap()), "{raw}");
        }
    }

    #[test]
    fn private_ipv6_targets() {
        for raw in [
            "http://[::ffff:127.0.0.1]/",
            "http://[::ffff:10.0.0.1]/",
            "http://[::ffff:169.254.169.254]/",
            "http://[fd00::1]/",
            "http://[fc00::abcd]/",
            "http://[fe80::1]/",
            "http://[::]/",
        ] {
            assert!(is_private_target(&Url::parse(raw).unwrap()), "{raw}");
        }
    }

    #[test]
    fn public_targets() {
        for raw in [
            "https://blog.example.com/page",
            "http://93.184.216.34/",
            "http://[2606:2800:220:1::1]/",
            "http://[::ffff:93.184.216.34]/",
        ] {
            assert!(!is_private_target(&Url::parse(raw).unwrap()), "{raw}");
        }
    }

    #[test]
    fn redirect_hops_are_checked() {
        let public = Url::parse("https://example.com/next").unwrap();
        assert!(check_redirect(&public, 0).is_ok());
        assert!(check_redirect(&public, MAX_REDIRECTS - 1).is_ok());
        assert!(check_redirect(&public, MAX_REDIRECTS).unwrap_err().contains("too many"));

        let metadata = Url::parse("http://169.254.169.254/latest/meta-data").unwrap();
        assert!(check_redirect(&metadata, 0).unwrap_err().contains("private or loopback"));
    }
}

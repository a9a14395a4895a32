//! Request validation
//!
//! Every check here runs before the dispatcher issues a single network call.
//! A request with one bad URL is rejected as a whole.

use crate::error::ValidationError;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Validate and normalize a list of page URLs
///
/// Inputs are trimmed and parsed; exact duplicates (after normalization) are
/// collapsed, keeping the first occurrence. Order is otherwise preserved.
pub fn validate_urls(raw: &[String], max_urls: usize) -> Result<Vec<Url>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::NoUrls);
    }
    if raw.len() > max_urls {
        return Err(ValidationError::TooManyUrls {
            count: raw.len(),
            max: max_urls,
        });
    }

    let mut urls: Vec<Url> = Vec::with_capacity(raw.len());
    for (index, input) in raw.iter().enumerate() {
        let url = validate_url(index, input)?;
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    Ok(urls)
}

/// Validate a single URL: http(s), has a host, host is public
pub fn validate_url(index: usize, input: &str) -> Result<Url, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidUrl {
            index,
            url: input.to_string(),
            reason: "URL is empty".to_string(),
        });
    }

    let url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
        index,
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ValidationError::UnsupportedScheme {
                index,
                url: trimmed.to_string(),
                scheme: scheme.to_string(),
            });
        }
    }

    let Some(host) = url.host() else {
        return Err(ValidationError::MissingHost {
            index,
            url: trimmed.to_string(),
        });
    };

    if is_internal_host(&host) {
        return Err(ValidationError::PrivateAddress {
            index,
            url: trimmed.to_string(),
            host: host.to_string(),
        });
    }

    Ok(url)
}

/// Check whether a host names a loopback, private, link-local or internal target
fn is_internal_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost"
                || domain.ends_with(".localhost")
                || domain.ends_with(".local")
                || domain.ends_with(".internal")
        }
        Host::Ipv4(ip) => is_private_ipv4(ip),
        Host::Ipv6(ip) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    // 169.254.0.0/16 covers the cloud metadata endpoint
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&mapped);
    }
    let segments = ip.segments();
    // Unique Local (fc00::/7)
    let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
    // Link-Local (fe80::/10)
    let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
    is_unique_local || is_link_local
}

/// Resolve an optional service selection against the configured names
///
/// `None` selects every configured service. Returned names keep the
/// configuration order so aggregation order is stable.
pub fn select_services<'a>(
    configured: &'a [String],
    selection: Option<&[String]>,
) -> Result<Vec<&'a str>, ValidationError> {
    let Some(selection) = selection else {
        return Ok(configured.iter().map(String::as_str).collect());
    };

    if selection.is_empty() {
        return Err(ValidationError::NoServicesSelected);
    }

    if let Some(unknown) = selection
        .iter()
        .find(|name| !configured.iter().any(|c| c == *name))
    {
        return Err(ValidationError::UnknownService {
            name: unknown.clone(),
        });
    }

    Ok(configured
        .iter()
        .filter(|c| selection.contains(c))
        .map(String::as_str)
        .collect())
}

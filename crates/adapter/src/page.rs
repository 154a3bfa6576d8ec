//! Page URL helpers.

use error_stack::{Report, ResultExt};
use url::{Host, Url};

use crate::error::AdapterError;
use crate::types::RefererInfo;

/// Extract the hostname of a page URL.
///
/// URLs with a scheme are parsed with [`Url`]; protocol-relative URLs
/// (`//host/path`) are read as `https`. Anything else is treated as a bare
/// `host[:port]/path` reference: fragment, query and path are stripped, then
/// a numeric port.
///
/// # Errors
///
/// Returns [`AdapterError::ExtractionDegraded`] when the URL does not parse or
/// has no host.
pub fn extract_hostname(raw: &str) -> Result<String, Report<AdapterError>> {
    let trimmed = raw.trim();
    if let Some(stripped) = trimmed.strip_prefix("//") {
        return parse_hostname(&format!("https://{stripped}"), raw);
    }
    if has_scheme(trimmed) {
        return parse_hostname(trimmed, raw);
    }
    strip_hostname(trimmed, raw)
}

fn has_scheme(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn degraded(message: &str, raw: &str) -> Report<AdapterError> {
    Report::new(AdapterError::ExtractionDegraded {
        message: message.to_string(),
    })
    .attach(format!("url: {raw}"))
}

fn parse_hostname(url: &str, raw: &str) -> Result<String, Report<AdapterError>> {
    let parsed = Url::parse(url)
        .change_context(AdapterError::ExtractionDegraded {
            message: "failed to parse page URL".to_string(),
        })
        .attach(format!("url: {raw}"))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(degraded("page URL has no host", raw)),
    }
}

fn strip_hostname(reference: &str, raw: &str) -> Result<String, Report<AdapterError>> {
    let without_fragment = reference.split(['#', '?']).next().unwrap_or_default();
    let authority = without_fragment.split('/').next().unwrap_or_default();
    let is_port = |port: &str| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit());

    let host = if authority.ends_with(']') {
        authority
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if is_port(port) => host,
            Some(_) => return Err(degraded("page reference has a non-numeric port", raw)),
            None => authority,
        }
    };

    Host::parse(host)
        .map(|host| host.to_string())
        .change_context(AdapterError::ExtractionDegraded {
            message: "page reference has no valid host".to_string(),
        })
        .attach(format!("url: {raw}"))
}

/// Resolve the `d` hostname for a request.
///
/// Tries the referer, then the current page URL, then the raw current page
/// URL. Returns an empty string when nothing is known.
#[must_use]
pub fn resolve_hostname(referer_info: &RefererInfo) -> String {
    let from = |candidate: Option<&String>| {
        candidate.and_then(|url| match extract_hostname(url) {
            Ok(host) => Some(host),
            Err(report) => {
                log::debug!("hostname extraction degraded: {report:?}");
                None
            }
        })
    };

    from(referer_info.referer.as_ref())
        .or_else(|| from(referer_info.page.as_ref()))
        .or_else(|| referer_info.page.clone())
        .unwrap_or_default()
}

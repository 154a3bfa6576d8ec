//! Browser-derived request fields: device class and language.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{DEVICE_TYPE_DESKTOP, DEVICE_TYPE_MOBILE};

// Best-effort classification; user agents are not authoritative.
static MOBILE_USER_AGENT: Lazy<Regex> =
    Lazy::new(|| Regex::new("Mobi").expect("mobile user-agent pattern should compile"));

/// Coarse device class sent as `dt`: 2 for mobile, 1 otherwise.
#[must_use]
pub fn device_type(user_agent: &str) -> u8 {
    if MOBILE_USER_AGENT.is_match(user_agent) {
        DEVICE_TYPE_MOBILE
    } else {
        DEVICE_TYPE_DESKTOP
    }
}

/// Primary language subtag sent as `l` (`en-US` becomes `en`).
#[must_use]
pub fn primary_language(language: Option<&str>) -> String {
    language
        .and_then(|tag| tag.split('-').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Bidder code registered with the orchestrator.
pub const BIDDER_CODE: &str = "vidoomy";

/// Exchange endpoint receiving the GET bid requests.
pub const ENDPOINT: &str = "https://d.vidoomy.com/api/rtbserver/prebid";

/// Device type codes sent as `dt`.
pub const DEVICE_TYPE_DESKTOP: u8 = 1;
pub const DEVICE_TYPE_MOBILE: u8 = 2;

/// Position sent when the configured one is not a positive integer.
pub const DEFAULT_POSITION: i64 = 1;

/// Environment variable prefix and separator for settings overrides.
pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "VIDOOMY";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

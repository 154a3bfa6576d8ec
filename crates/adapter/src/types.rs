//! Core types exchanged with the orchestrator.

use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::renderer::RendererHandle;

/// Media type enumeration.
#[derive(Debug, Clone, Copy, Display, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[display("banner")]
    Banner,
    #[display("video")]
    Video,
    #[display("native")]
    Native,
}

/// Placement context of a video slot.
#[derive(Debug, Clone, Copy, Display, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoContext {
    #[display("instream")]
    Instream,
    #[display("outstream")]
    Outstream,
    #[display("adpod")]
    Adpod,
    /// Any context this adapter does not distinguish
    #[display("unknown")]
    #[serde(other)]
    Unknown,
}

/// A bidder parameter as publishers write it: a JSON number or a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric value with unary-plus semantics: strings are trimmed, the empty
    /// string is zero, anything unparsable or non-finite yields `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
        };
        value.is_finite().then_some(value)
    }

    /// True when the value coerces to a number greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.as_number().is_some_and(|n| n > 0.0)
    }

    /// Leading integer with `parseInt` semantics (`"3rd"` is 3, `2.9` is 2).
    #[must_use]
    pub fn leading_integer(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Self::Number(_) => None,
            Self::Text(s) => {
                let trimmed = s.trim_start();
                let (sign, digits) = match trimmed.as_bytes().first() {
                    Some(b'-') => (-1, &trimmed[1..]),
                    Some(b'+') => (1, &trimmed[1..]),
                    _ => (1, trimmed),
                };
                let end = digits
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(digits.len());
                digits[..end].parse::<i64>().ok().map(|n| sign * n)
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Vidoomy bidder parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BidParams {
    /// Placement id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParamValue>,
    /// Publisher id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<ParamValue>,
    /// Slot position on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ParamValue>,
}

/// Player size, accepted both as `[w, h]` and `[[w, h], ...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PlayerSize {
    Single([u32; 2]),
    Multiple(Vec<[u32; 2]>),
}

impl PlayerSize {
    #[must_use]
    pub fn first(&self) -> Option<[u32; 2]> {
        match self {
            Self::Single(size) => Some(*size),
            Self::Multiple(sizes) => sizes.first().copied(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BannerMediaType {
    #[serde(default)]
    pub sizes: Vec<[u32; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_size: Option<PlayerSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<VideoContext>,
}

impl VideoMediaType {
    /// First declared player size, if any.
    #[must_use]
    pub fn size(&self) -> Option<[u32; 2]> {
        self.player_size.as_ref().and_then(PlayerSize::first)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaTypes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<BannerMediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoMediaType>,
}

/// One ad slot the orchestrator wants a bid for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidConfiguration {
    /// Identifier of this bid request, echoed to the exchange as `dealId`
    pub bid_id: String,
    #[serde(default)]
    pub ad_unit_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BidParams>,
    #[serde(default)]
    pub media_types: MediaTypes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefererInfo {
    /// Referring page as resolved by the orchestrator
    #[serde(default)]
    pub referer: Option<String>,
    /// Current page URL as reported by the browser
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdprConsent {
    #[serde(default)]
    pub gdpr_applies: Option<bool>,
    #[serde(default)]
    pub consent_string: Option<String>,
}

/// Auction-wide context shared by every request of one auction round.
///
/// Browser state (user agent, language, page URL) is carried here instead of
/// being read from ambient globals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionContext {
    #[serde(default)]
    pub referer_info: RefererInfo,
    #[serde(default)]
    pub gdpr_consent: Option<GdprConsent>,
    #[serde(default)]
    pub usp_consent: Option<String>,
    #[serde(default)]
    pub coppa: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Correlation payload handed back with the matching response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub video_context: Option<VideoContext>,
}

/// Outbound request produced for one bid configuration.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub data: RequestData,
    pub bid_id: String,
    pub ad_unit_code: String,
}

/// Raw exchange response as delivered by the transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(default)]
    pub body: Option<Json>,
}

impl ServerResponse {
    #[must_use]
    pub fn new(body: Json) -> Self {
        Self { body: Some(body) }
    }
}

/// Bid forwarded to the orchestrator.
///
/// Serializes as the typed fields below, except for bids read under the legacy
/// policy, which serialize as the exchange body they were read from.
#[derive(Debug, Clone)]
pub struct NormalizedBid {
    pub request_id: String,
    pub media_type: Option<MediaType>,
    /// Creative payload (markup, or the VAST URL for video)
    pub ad: Option<String>,
    pub vast_url: Option<String>,
    pub cpm: Option<f64>,
    pub currency: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub ttl: Option<u32>,
    pub creative_id: Option<String>,
    pub net_revenue: Option<bool>,
    pub meta: Option<Json>,
    /// Outstream renderer; never serialized
    pub renderer: Option<Arc<dyn RendererHandle>>,
    /// Exchange body kept verbatim for pass-through bids
    pub raw_body: Option<Map<String, Json>>,
}

impl NormalizedBid {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            media_type: None,
            ad: None,
            vast_url: None,
            cpm: None,
            currency: None,
            width: None,
            height: None,
            ttl: None,
            creative_id: None,
            net_revenue: None,
            meta: None,
            renderer: None,
            raw_body: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BidFields<'a> {
    request_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ad: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vast_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creative_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    net_revenue: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a Json>,
}

impl Serialize for NormalizedBid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if let Some(body) = &self.raw_body {
            return body.serialize(serializer);
        }

        BidFields {
            request_id: &self.request_id,
            media_type: self.media_type,
            ad: self.ad.as_deref(),
            vast_url: self.vast_url.as_deref(),
            cpm: self.cpm,
            currency: self.currency.as_deref(),
            width: self.width,
            height: self.height,
            ttl: self.ttl,
            creative_id: self.creative_id.as_deref(),
            net_revenue: self.net_revenue,
            meta: self.meta.as_ref(),
        }
        .serialize(serializer)
    }
}

/// Deserialize an identifier that the exchange may send as string or number.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer identifier")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Optional variant of [`deserialize_id`]; `null` maps to `None`.
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_value_coercion() {
        assert_eq!(ParamValue::Number(123.0).as_number(), Some(123.0));
        assert_eq!(ParamValue::Text(" 42 ".into()).as_number(), Some(42.0));
        assert_eq!(ParamValue::Text(String::new()).as_number(), Some(0.0));
        assert_eq!(ParamValue::Text("abc".into()).as_number(), None);
        assert_eq!(ParamValue::Text("inf".into()).as_number(), None);

        assert!(ParamValue::Text("7".into()).is_positive());
        assert!(!ParamValue::Text("0".into()).is_positive());
        assert!(!ParamValue::Number(-3.0).is_positive());
        assert!(!ParamValue::Text("12abc".into()).is_positive());
    }

    #[test]
    fn test_param_value_leading_integer() {
        assert_eq!(ParamValue::Text("3rd".into()).leading_integer(), Some(3));
        assert_eq!(ParamValue::Text("  -2".into()).leading_integer(), Some(-2));
        assert_eq!(ParamValue::Text("top".into()).leading_integer(), None);
        assert_eq!(ParamValue::Text(String::new()).leading_integer(), None);
        assert_eq!(ParamValue::Number(2.9).leading_integer(), Some(2));
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::Number(123.0).to_string(), "123");
        assert_eq!(ParamValue::Number(1.5).to_string(), "1.5");
        assert_eq!(ParamValue::Text("0042".into()).to_string(), "0042");
    }

    #[test]
    fn test_bid_configuration_deserializes_prebid_shape() {
        let bid: BidConfiguration = serde_json::from_value(json!({
            "bidId": "30b31c1838de1e",
            "adUnitCode": "video-slot",
            "params": { "id": "123123", "pid": 123123, "position": "2" },
            "mediaTypes": {
                "video": { "playerSize": [[640, 480]], "context": "outstream" }
            }
        }))
        .expect("should deserialize bid configuration");

        let params = bid.params.expect("should have params");
        assert_eq!(params.id, Some(ParamValue::Text("123123".into())));
        assert_eq!(params.pid, Some(ParamValue::Number(123123.0)));

        let video = bid.media_types.video.expect("should have video");
        assert_eq!(video.size(), Some([640, 480]));
        assert_eq!(video.context, Some(VideoContext::Outstream));
        assert!(bid.media_types.banner.is_none());
    }

    #[test]
    fn test_player_size_accepts_flat_pair() {
        let video: VideoMediaType =
            serde_json::from_value(json!({ "playerSize": [300, 250], "context": "instream" }))
                .expect("should deserialize flat player size");
        assert_eq!(video.size(), Some([300, 250]));

        let empty: VideoMediaType = serde_json::from_value(json!({ "playerSize": [] }))
            .expect("should deserialize empty player size");
        assert_eq!(empty.size(), None);
    }

    #[test]
    fn test_normalized_bid_serializes_typed_fields() {
        let mut bid = NormalizedBid::new("42");
        bid.cpm = Some(1.25);
        bid.creative_id = Some("cr-1".to_string());

        let value = serde_json::to_value(&bid).expect("should serialize bid");
        assert_eq!(
            value,
            json!({ "requestId": "42", "cpm": 1.25, "creativeId": "cr-1" })
        );
    }

    #[test]
    fn test_normalized_bid_serializes_raw_body_verbatim() {
        let body = json!({
            "requestId": 1.5,
            "cpm": "1.5",
            "ad": null,
            "custom": { "nested": true }
        });
        let mut bid = NormalizedBid::new("1.5");
        bid.cpm = Some(9.0);
        bid.raw_body = body.as_object().cloned();

        let value = serde_json::to_value(&bid).expect("should serialize bid");
        assert_eq!(value, body);
    }

    #[test]
    fn test_unknown_video_context_still_deserializes() {
        let video: VideoMediaType =
            serde_json::from_value(json!({ "playerSize": [640, 480], "context": "interstitial" }))
                .expect("should deserialize unknown context");
        assert_eq!(video.context, Some(VideoContext::Unknown));
        assert_eq!(video.size(), Some([640, 480]));
    }

    #[test]
    fn test_media_type_display() {
        assert_eq!(MediaType::Banner.to_string(), "banner");
        assert_eq!(MediaType::Video.to_string(), "video");
        assert_eq!(VideoContext::Outstream.to_string(), "outstream");
    }
}

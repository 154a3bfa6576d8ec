use std::sync::Arc;

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as Json};

use crate::error::AdapterError;
use crate::renderer::{OutstreamRenderer, RendererHandle, RendererInstallation};
use crate::settings::{ResponsePolicy, Settings};
use crate::types::{
    deserialize_optional_id, MediaType, NormalizedBid, RequestDescriptor, ServerResponse,
    VideoContext,
};

/// Bid fields forwarded without interpretation.
///
/// A value of the wrong shape drops that field only, never the bid.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassThroughFields {
    #[serde(default, deserialize_with = "lenient_number")]
    cpm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    w: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    h: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    ttl: Option<u32>,
    #[serde(default, deserialize_with = "lenient_id")]
    creative_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    net_revenue: Option<bool>,
}

impl PassThroughFields {
    fn apply(self, bid: &mut NormalizedBid) {
        bid.cpm = self.cpm;
        bid.currency = self.currency;
        bid.width = self.width.or(self.w);
        bid.height = self.height.or(self.h);
        bid.ttl = self.ttl;
        bid.creative_id = self.creative_id;
        bid.net_revenue = self.net_revenue;
    }
}

/// Vidoomy bid response body as read by the current policy.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VidoomyBidResponse {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    deal_id: Option<String>,
    #[serde(default)]
    media_type: Option<MediaType>,
    #[serde(default)]
    ad: Option<String>,
    #[serde(default)]
    vast_url: Option<String>,
    #[serde(default)]
    meta: Option<Json>,
    #[serde(flatten)]
    pass_through: PassThroughFields,
}

fn lenient_with<'de, D, T>(
    deserializer: D,
    read: impl Fn(&Json) -> Option<T>,
) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Json>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        let parsed = read(&value);
        if parsed.is_none() {
            log::debug!("dropping unreadable bid field value {value}");
        }
        parsed
    }))
}

fn read_number(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_with(deserializer, read_number)
}

fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_with(deserializer, |value| {
        read_number(value)
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32)
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_with(deserializer, |value| value.as_str().map(str::to_string))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_with(deserializer, |value| match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_with(deserializer, Json::as_bool)
}

fn malformed(message: &str) -> Report<AdapterError> {
    Report::new(AdapterError::ResponseMalformed {
        message: message.to_string(),
    })
}

fn renderer_unavailable(message: &str) -> Report<AdapterError> {
    Report::new(AdapterError::RendererUnavailable {
        message: message.to_string(),
    })
}

fn response_body(response: &ServerResponse) -> Result<&Json, Report<AdapterError>> {
    match &response.body {
        Some(body) if body.is_object() => Ok(body),
        Some(_) => Err(malformed("response body is not an object")),
        None => Err(malformed("response has no body")),
    }
}

/// JavaScript truthiness of a JSON value.
fn is_truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Json::String(s) => !s.is_empty(),
        Json::Array(_) | Json::Object(_) => true,
    }
}

/// Legacy policy: a body with a truthy `requestId` is the bid, forwarded
/// unchanged.
fn interpret_legacy(response: &ServerResponse) -> Result<NormalizedBid, Report<AdapterError>> {
    let body = response_body(response)?;

    let request_id = body
        .get("requestId")
        .filter(|id| is_truthy(id))
        .ok_or_else(|| malformed("missing requestId"))?;

    let mut bid = NormalizedBid::new(match request_id {
        Json::String(id) => id.clone(),
        other => other.to_string(),
    });
    bid.media_type = body
        .get("mediaType")
        .and_then(|value| MediaType::deserialize(value).ok());
    bid.ad = body.get("ad").and_then(Json::as_str).map(str::to_string);
    bid.vast_url = body.get("vastUrl").and_then(Json::as_str).map(str::to_string);
    bid.meta = body.get("meta").filter(|meta| !meta.is_null()).cloned();
    PassThroughFields::deserialize(body)
        .change_context(AdapterError::ResponseMalformed {
            message: "failed to read legacy bid".to_string(),
        })?
        .apply(&mut bid);
    bid.raw_body = body.as_object().cloned();

    Ok(bid)
}

/// Current policy: map `dealId` and wire outstream renderers.
fn interpret_current(
    response: &ServerResponse,
    request: &RequestDescriptor,
    renderer: Option<&OutstreamRenderer>,
    bidder_code: &str,
) -> Result<NormalizedBid, Report<AdapterError>> {
    let body = response_body(response)?;
    let parsed: VidoomyBidResponse = serde_json::from_value(body.clone()).change_context(
        AdapterError::ResponseMalformed {
            message: "failed to read bid response".to_string(),
        },
    )?;

    let deal_id = parsed
        .deal_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed("missing dealId"))?;

    let mut bid = NormalizedBid::new(deal_id);
    bid.media_type = parsed.media_type;
    parsed.pass_through.apply(&mut bid);

    if bid.media_type == Some(MediaType::Video) {
        let vast_url = parsed
            .vast_url
            .ok_or_else(|| malformed("video response without vastUrl"))?;
        bid.ad = Some(vast_url.clone());
        bid.vast_url = Some(vast_url);

        if request.data.video_context == Some(VideoContext::Outstream) {
            match attach_renderer(&bid, parsed.meta.as_ref(), request, renderer) {
                Ok(handle) => bid.renderer = Some(handle),
                Err(report) => {
                    log::warn!(
                        "{}: serving VAST URL without outstream renderer for {}: {:?}",
                        bidder_code,
                        bid.request_id,
                        report
                    );
                }
            }
        }
    } else {
        bid.ad = parsed.ad;
    }

    bid.meta = parsed.meta;
    Ok(bid)
}

fn attach_renderer(
    bid: &NormalizedBid,
    meta: Option<&Json>,
    request: &RequestDescriptor,
    renderer: Option<&OutstreamRenderer>,
) -> Result<Arc<dyn RendererHandle>, Report<AdapterError>> {
    let renderer =
        renderer.ok_or_else(|| renderer_unavailable("no renderer installer configured"))?;

    let url = meta
        .and_then(|meta| meta.get("rendererUrl"))
        .and_then(Json::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| renderer_unavailable("missing meta.rendererUrl"))?;

    let config = meta
        .and_then(|meta| meta.get("rendererConfig"))
        .cloned()
        .unwrap_or_else(|| Json::Object(Map::new()));

    let adunitcode = if request.ad_unit_code.is_empty() {
        bid.request_id.clone()
    } else {
        request.ad_unit_code.clone()
    };

    renderer.attach(&RendererInstallation {
        id: bid.request_id.clone(),
        adunitcode,
        loaded: false,
        config,
        url: url.to_string(),
    })
}

/// Interpret one exchange response; failures yield no bid.
pub(crate) fn interpret_response(
    response: &ServerResponse,
    request: &RequestDescriptor,
    settings: &Settings,
    renderer: Option<&OutstreamRenderer>,
) -> Vec<NormalizedBid> {
    let result = match settings.response_policy {
        ResponsePolicy::Legacy => interpret_legacy(response),
        ResponsePolicy::Current => {
            interpret_current(response, request, renderer, &settings.bidder_code)
        }
    };

    match result {
        Ok(bid) => {
            log::debug!(
                "{}: bid {} for request {}",
                settings.bidder_code,
                bid.request_id,
                request.bid_id
            );
            vec![bid]
        }
        Err(report) => {
            log::debug!(
                "{}: no bid for request {}: {:?}",
                settings.bidder_code,
                request.bid_id,
                report
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::{
        outstream_renderer, FailingInstaller, RecordingInstaller, RejectingInstaller,
    };
    use crate::types::RequestData;
    use http::Method;
    use serde_json::json;

    fn request(video_context: Option<VideoContext>) -> RequestDescriptor {
        RequestDescriptor {
            method: Method::GET,
            url: "https://d.vidoomy.com/api/rtbserver/prebid?id=1".to_string(),
            data: RequestData { video_context },
            bid_id: "789012".to_string(),
            ad_unit_code: "video-slot".to_string(),
        }
    }

    fn settings(policy: ResponsePolicy) -> Settings {
        Settings {
            response_policy: policy,
            ..Settings::default()
        }
    }

    fn video_response() -> ServerResponse {
        ServerResponse::new(json!({
            "dealId": "abc123",
            "mediaType": "video",
            "vastUrl": "http://x/v.xml"
        }))
    }

    fn outstream_response() -> ServerResponse {
        ServerResponse::new(json!({
            "dealId": "abc123",
            "mediaType": "video",
            "vastUrl": "http://x/v.xml",
            "meta": { "rendererUrl": "https://cdn.vidoomy.example/outstream.js" }
        }))
    }

    #[test]
    fn test_legacy_empty_body_yields_no_bid() {
        let bids = interpret_response(
            &ServerResponse::new(json!({})),
            &request(None),
            &settings(ResponsePolicy::Legacy),
            None,
        );
        assert!(bids.is_empty());

        let bids = interpret_response(
            &ServerResponse::default(),
            &request(None),
            &settings(ResponsePolicy::Legacy),
            None,
        );
        assert!(bids.is_empty());
    }

    #[test]
    fn test_legacy_passes_body_through() {
        let body = json!({
            "requestId": "123456",
            "cpm": 2.5,
            "currency": "USD",
            "width": 300,
            "height": 250,
            "ad": "<div>creative</div>",
            "mediaType": "banner",
            "netRevenue": true,
            "meta": { "advertiserDomains": ["brand.example"] }
        });

        let bids = interpret_response(
            &ServerResponse::new(body.clone()),
            &request(None),
            &settings(ResponsePolicy::Legacy),
            None,
        );

        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].request_id, "123456");
        assert_eq!(
            serde_json::to_value(&bids[0]).expect("should serialize bid"),
            body
        );
    }

    #[test]
    fn test_legacy_falsy_request_id_yields_no_bid() {
        for request_id in [json!(""), json!(0), json!(false), json!(null)] {
            let bids = interpret_response(
                &ServerResponse::new(json!({ "requestId": request_id.clone(), "cpm": 1.0 })),
                &request(None),
                &settings(ResponsePolicy::Legacy),
                None,
            );
            assert!(bids.is_empty(), "requestId {request_id} should yield no bid");
        }
    }

    #[test]
    fn test_legacy_keeps_mistyped_and_null_fields() {
        let body = json!({
            "requestId": "r1",
            "cpm": "1.5",
            "width": 300.5,
            "mediaType": "audio",
            "ad": null
        });

        let bids = interpret_response(
            &ServerResponse::new(body.clone()),
            &request(None),
            &settings(ResponsePolicy::Legacy),
            None,
        );

        assert_eq!(bids.len(), 1);
        let bid = &bids[0];
        assert_eq!(bid.request_id, "r1");
        assert_eq!(bid.cpm, Some(1.5));
        assert_eq!(bid.width, None);
        assert_eq!(bid.media_type, None);
        assert_eq!(
            serde_json::to_value(bid).expect("should serialize bid"),
            body
        );
    }

    #[test]
    fn test_legacy_numeric_request_id() {
        let body = json!({ "requestId": 1.5 });

        let bids = interpret_response(
            &ServerResponse::new(body.clone()),
            &request(None),
            &settings(ResponsePolicy::Legacy),
            None,
        );

        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].request_id, "1.5");
        assert_eq!(
            serde_json::to_value(&bids[0]).expect("should serialize bid"),
            body
        );
    }

    #[test]
    fn test_current_instream_video() {
        let bids = interpret_response(
            &video_response(),
            &request(Some(VideoContext::Instream)),
            &settings(ResponsePolicy::Current),
            None,
        );

        assert_eq!(bids.len(), 1);
        assert!(bids[0].renderer.is_none());
        assert_eq!(
            serde_json::to_value(&bids[0]).expect("should serialize bid"),
            json!({
                "requestId": "abc123",
                "mediaType": "video",
                "ad": "http://x/v.xml",
                "vastUrl": "http://x/v.xml"
            })
        );
    }

    #[test]
    fn test_current_outstream_attaches_renderer() {
        let installer = Arc::new(RecordingInstaller::default());
        let renderer = outstream_renderer(installer.clone());

        let bids = interpret_response(
            &outstream_response(),
            &request(Some(VideoContext::Outstream)),
            &settings(ResponsePolicy::Current),
            Some(&renderer),
        );

        assert_eq!(bids.len(), 1);
        let handle = bids[0].renderer.as_ref().expect("should attach renderer");
        assert_eq!(handle.url(), "https://cdn.vidoomy.example/outstream.js");
        assert_eq!(bids[0].ad.as_deref(), Some("http://x/v.xml"));
        assert!(installer.render_was_set());

        let installs = installer.installations();
        assert_eq!(installs.len(), 1);
        assert_eq!(
            installs[0],
            RendererInstallation {
                id: "abc123".to_string(),
                adunitcode: "video-slot".to_string(),
                loaded: false,
                config: json!({}),
                url: "https://cdn.vidoomy.example/outstream.js".to_string(),
            }
        );
    }

    #[test]
    fn test_current_outstream_falls_back_when_install_fails() {
        let renderer = outstream_renderer(Arc::new(FailingInstaller));

        let bids = interpret_response(
            &outstream_response(),
            &request(Some(VideoContext::Outstream)),
            &settings(ResponsePolicy::Current),
            Some(&renderer),
        );

        assert_eq!(bids.len(), 1);
        assert!(bids[0].renderer.is_none());
        assert_eq!(bids[0].ad.as_deref(), Some("http://x/v.xml"));
        assert_eq!(bids[0].vast_url.as_deref(), Some("http://x/v.xml"));
    }

    #[test]
    fn test_current_outstream_falls_back_when_render_rejected() {
        let renderer = outstream_renderer(Arc::new(RejectingInstaller));

        let bids = interpret_response(
            &outstream_response(),
            &request(Some(VideoContext::Outstream)),
            &settings(ResponsePolicy::Current),
            Some(&renderer),
        );

        assert_eq!(bids.len(), 1);
        assert!(bids[0].renderer.is_none());
        assert_eq!(bids[0].ad.as_deref(), Some("http://x/v.xml"));
    }

    #[test]
    fn test_current_outstream_without_renderer_url_or_installer() {
        let installer = Arc::new(RecordingInstaller::default());
        let renderer = outstream_renderer(installer.clone());

        let bids = interpret_response(
            &video_response(),
            &request(Some(VideoContext::Outstream)),
            &settings(ResponsePolicy::Current),
            Some(&renderer),
        );
        assert_eq!(bids.len(), 1);
        assert!(bids[0].renderer.is_none());
        assert!(installer.installations().is_empty());

        let bids = interpret_response(
            &outstream_response(),
            &request(Some(VideoContext::Outstream)),
            &settings(ResponsePolicy::Current),
            None,
        );
        assert_eq!(bids.len(), 1);
        assert!(bids[0].renderer.is_none());
    }

    #[test]
    fn test_current_renderer_config_forwarded() {
        let installer = Arc::new(RecordingInstaller::default());
        let renderer = outstream_renderer(installer.clone());
        let response = ServerResponse::new(json!({
            "dealId": 991,
            "mediaType": "video",
            "vastUrl": "http://x/v.xml",
            "meta": {
                "rendererUrl": "https://cdn.vidoomy.example/outstream.js",
                "rendererConfig": { "position": "bottom-right" }
            }
        }));

        let bids = interpret_response(
            &response,
            &request(Some(VideoContext::Outstream)),
            &settings(ResponsePolicy::Current),
            Some(&renderer),
        );

        assert_eq!(bids[0].request_id, "991");
        assert_eq!(
            installer.installations()[0].config,
            json!({ "position": "bottom-right" })
        );
    }

    #[test]
    fn test_current_missing_deal_id_yields_no_bid() {
        for body in [
            json!({}),
            json!({ "requestId": "abc123", "mediaType": "video", "vastUrl": "http://x/v.xml" }),
            json!({ "dealId": "", "mediaType": "banner" }),
        ] {
            let bids = interpret_response(
                &ServerResponse::new(body),
                &request(None),
                &settings(ResponsePolicy::Current),
                None,
            );
            assert!(bids.is_empty());
        }
    }

    #[test]
    fn test_current_malformed_bodies_yield_no_bid() {
        for body in [
            json!("not an object"),
            json!(null),
            json!({ "dealId": "abc123", "mediaType": "audio" }),
            json!({ "dealId": "abc123", "mediaType": "video" }),
        ] {
            let bids = interpret_response(
                &ServerResponse::new(body),
                &request(Some(VideoContext::Outstream)),
                &settings(ResponsePolicy::Current),
                None,
            );
            assert!(bids.is_empty());
        }
    }

    #[test]
    fn test_current_banner_keeps_markup() {
        let response = ServerResponse::new(json!({
            "dealId": "abc123",
            "mediaType": "banner",
            "ad": "<div>creative</div>",
            "cpm": 1.75,
            "currency": "EUR",
            "w": 300,
            "h": 250,
            "ttl": 60,
            "creativeId": 555,
            "netRevenue": true
        }));

        let bids = interpret_response(
            &response,
            &request(None),
            &settings(ResponsePolicy::Current),
            None,
        );

        assert_eq!(bids.len(), 1);
        let bid = &bids[0];
        assert_eq!(bid.request_id, "abc123");
        assert_eq!(bid.media_type, Some(MediaType::Banner));
        assert_eq!(bid.ad.as_deref(), Some("<div>creative</div>"));
        assert_eq!(bid.vast_url, None);
        assert_eq!(bid.cpm, Some(1.75));
        assert_eq!(bid.currency.as_deref(), Some("EUR"));
        assert_eq!(bid.width, Some(300));
        assert_eq!(bid.height, Some(250));
        assert_eq!(bid.ttl, Some(60));
        assert_eq!(bid.creative_id.as_deref(), Some("555"));
        assert_eq!(bid.net_revenue, Some(true));
    }

    #[test]
    fn test_current_tolerates_mistyped_pass_through_fields() {
        let response = ServerResponse::new(json!({
            "dealId": "abc",
            "mediaType": "banner",
            "ad": "<b/>",
            "cpm": "1.5",
            "width": 300.0,
            "height": 250.5,
            "ttl": "soon",
            "currency": 978,
            "netRevenue": "yes"
        }));

        let bids = interpret_response(
            &response,
            &request(None),
            &settings(ResponsePolicy::Current),
            None,
        );

        assert_eq!(bids.len(), 1);
        let bid = &bids[0];
        assert_eq!(bid.request_id, "abc");
        assert_eq!(bid.ad.as_deref(), Some("<b/>"));
        assert_eq!(bid.cpm, Some(1.5));
        assert_eq!(bid.width, Some(300));
        assert_eq!(bid.height, None);
        assert_eq!(bid.ttl, None);
        assert_eq!(bid.currency, None);
        assert_eq!(bid.net_revenue, None);
    }

    #[test]
    fn test_current_unreadable_cpm_drops_only_that_field() {
        let bids = interpret_response(
            &ServerResponse::new(json!({
                "dealId": "abc123",
                "mediaType": "banner",
                "cpm": "expensive"
            })),
            &request(None),
            &settings(ResponsePolicy::Current),
            None,
        );

        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].cpm, None);
    }
}

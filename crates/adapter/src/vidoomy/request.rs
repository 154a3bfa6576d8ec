use http::Method;
use url::form_urlencoded;

use crate::constants::DEFAULT_POSITION;
use crate::device::{device_type, primary_language};
use crate::page::resolve_hostname;
use crate::settings::Settings;
use crate::types::{
    AuctionContext, BidConfiguration, MediaType, MediaTypes, ParamValue, RequestData,
    RequestDescriptor,
};

/// Ad type and dimensions requested for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AdFormat {
    pub media_type: MediaType,
    pub size: Option<[u32; 2]>,
}

/// Pick the requested format.
///
/// A banner with sizes wins over a video with a player size. When neither
/// carries dimensions the slot is sent as an unsized banner and the exchange
/// decides.
pub(crate) fn resolve_ad_format(media_types: &MediaTypes) -> AdFormat {
    if let Some(size) = media_types
        .banner
        .as_ref()
        .and_then(|banner| banner.sizes.first().copied())
    {
        return AdFormat {
            media_type: MediaType::Banner,
            size: Some(size),
        };
    }

    if let Some(size) = media_types.video.as_ref().and_then(|video| video.size()) {
        return AdFormat {
            media_type: MediaType::Video,
            size: Some(size),
        };
    }

    AdFormat {
        media_type: MediaType::Banner,
        size: None,
    }
}

/// Configured position, or the default when it is not a positive integer.
fn position(value: Option<&ParamValue>) -> i64 {
    value
        .and_then(ParamValue::leading_integer)
        .filter(|pos| *pos > 0)
        .unwrap_or(DEFAULT_POSITION)
}

/// Marks `encodeURIComponent` leaves as-is but `urlencoding` escapes.
const URI_COMPONENT_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode a URI component with the `encodeURIComponent` unreserved set.
///
/// Every `%` in the encoded text starts an escape, so each mark escape can
/// only come from the mark itself.
pub(crate) fn encode_uri_component(value: &str) -> String {
    URI_COMPONENT_MARKS
        .iter()
        .fold(urlencoding::encode(value).into_owned(), |encoded, (escape, mark)| {
            encoded.replace(escape, mark)
        })
}

fn param_string(value: Option<&ParamValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Query parameters in wire order.
pub(crate) fn query_params(
    bid: &BidConfiguration,
    context: &AuctionContext,
) -> Vec<(&'static str, String)> {
    let format = resolve_ad_format(&bid.media_types);
    let params = bid.params.as_ref();
    let user_agent = context.user_agent.as_deref().unwrap_or_default();
    let referer = context.referer_info.referer.as_deref().unwrap_or_default();
    let dimension = |index: usize| {
        format
            .size
            .map(|size| size[index].to_string())
            .unwrap_or_default()
    };

    let mut query = vec![
        ("id", param_string(params.and_then(|p| p.id.as_ref()))),
        ("adtype", format.media_type.to_string()),
        ("w", dimension(0)),
        ("h", dimension(1)),
        (
            "pos",
            position(params.and_then(|p| p.position.as_ref())).to_string(),
        ),
        ("ua", user_agent.to_string()),
        ("l", primary_language(context.language.as_deref())),
        ("dt", device_type(user_agent).to_string()),
        ("pid", param_string(params.and_then(|p| p.pid.as_ref()))),
        ("dealId", bid.bid_id.clone()),
        ("d", resolve_hostname(&context.referer_info)),
        ("sp", encode_uri_component(referer)),
    ];

    if let Some(gdpr) = &context.gdpr_consent {
        query.push(("gdpr", gdpr.gdpr_applies.unwrap_or(false).to_string()));
        query.push(("gdprcs", gdpr.consent_string.clone().unwrap_or_default()));
    }

    query.push(("usp", context.usp_consent.clone().unwrap_or_default()));
    query.push(("coppa", context.coppa.unwrap_or(false).to_string()));

    query
}

/// Build the GET request for one bid configuration.
pub(crate) fn build_request(
    bid: &BidConfiguration,
    context: &AuctionContext,
    settings: &Settings,
) -> RequestDescriptor {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query_params(bid, context))
        .finish();

    let url = format!("{}?{}", settings.endpoint, query);
    log::debug!(
        "{}: built request for bid {}: {}",
        settings.bidder_code,
        bid.bid_id,
        url
    );

    RequestDescriptor {
        method: Method::GET,
        url,
        data: RequestData {
            video_context: bid.media_types.video.as_ref().and_then(|v| v.context),
        },
        bid_id: bid.bid_id.clone(),
        ad_unit_code: bid.ad_unit_code.clone(),
    }
}

/// Build one request per configuration, preserving order.
pub(crate) fn build_requests(
    bids: &[BidConfiguration],
    context: &AuctionContext,
    settings: &Settings,
) -> Vec<RequestDescriptor> {
    log::info!(
        "{}: building requests for {} bids",
        settings.bidder_code,
        bids.len()
    );

    bids.iter()
        .map(|bid| build_request(bid, context, settings))
        .collect()
}

use error_stack::Report;

use crate::error::AdapterError;
use crate::types::{BidConfiguration, ParamValue, VideoContext};

fn invalid(message: &str) -> Report<AdapterError> {
    Report::new(AdapterError::ConfigurationInvalid {
        message: message.to_string(),
    })
}

fn is_positive(value: Option<&ParamValue>) -> bool {
    value.is_some_and(ParamValue::is_positive)
}

/// Check the required bidder params and the instream player size.
pub(crate) fn check_bid_request(bid: &BidConfiguration) -> Result<(), Report<AdapterError>> {
    let params = bid
        .params
        .as_ref()
        .ok_or_else(|| invalid("bid.params should be non-empty"))?;

    if !is_positive(params.pid.as_ref()) {
        return Err(invalid("bid.params.pid should be non-empty Number"));
    }

    if !is_positive(params.id.as_ref()) {
        return Err(invalid("bid.params.id should be non-empty Number"));
    }

    if let Some(video) = &bid.media_types.video {
        if video.context == Some(VideoContext::Instream) && video.size().is_none() {
            return Err(invalid("bid.mediaTypes.video.playerSize should be non-empty"));
        }
    }

    Ok(())
}

/// Validate a bid configuration, logging the reason on rejection.
pub(crate) fn is_bid_request_valid(bid: &BidConfiguration, bidder_code: &str) -> bool {
    match check_bid_request(bid) {
        Ok(()) => true,
        Err(report) => {
            log::error!(
                "{}: {} (bid {})",
                bidder_code,
                report.current_context(),
                bid.bid_id
            );
            false
        }
    }
}

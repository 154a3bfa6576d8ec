//! Trait definition for bidder adapters.

use crate::types::{
    AuctionContext, BidConfiguration, MediaType, NormalizedBid, RequestDescriptor, ServerResponse,
};

/// Trait implemented by bidder adapters plugged into the orchestrator.
///
/// None of the operations fail: rejected configurations return `false`,
/// and unusable responses return no bids.
pub trait BidderAdapter: Send + Sync {
    /// Bidder code registered with the orchestrator (e.g., "vidoomy").
    fn code(&self) -> &str;

    /// Media types this bidder can serve.
    fn supported_media_types(&self) -> &'static [MediaType];

    /// Check if this bidder supports a specific media type.
    fn supports_media_type(&self, media_type: &MediaType) -> bool {
        self.supported_media_types().contains(media_type)
    }

    /// Gate a single bid configuration before any request is built.
    fn is_bid_request_valid(&self, bid: &BidConfiguration) -> bool;

    /// Build one outbound request per validated configuration, in order.
    fn build_requests(
        &self,
        bids: &[BidConfiguration],
        context: &AuctionContext,
    ) -> Vec<RequestDescriptor>;

    /// Turn an exchange response into zero or one bids.
    fn interpret_response(
        &self,
        response: &ServerResponse,
        request: &RequestDescriptor,
    ) -> Vec<NormalizedBid>;
}

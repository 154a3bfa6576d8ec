//! Vidoomy bidder adapter.
//!
//! Bids are requested with a single GET per slot against the Vidoomy
//! exchange; every field travels in the query string. Responses carry one bid
//! at most. For outstream video the adapter wires a host-supplied renderer
//! onto the bid and falls back to the plain VAST URL when that fails.

use std::sync::Arc;

use crate::adapter::BidderAdapter;
use crate::renderer::OutstreamRenderer;
use crate::settings::Settings;
use crate::types::{
    AuctionContext, BidConfiguration, MediaType, NormalizedBid, RequestDescriptor, ServerResponse,
};

mod request;
mod response;
mod validation;

const SUPPORTED_MEDIA_TYPES: &[MediaType] = &[MediaType::Banner, MediaType::Video];

/// Vidoomy adapter.
#[derive(Debug, Clone)]
pub struct VidoomyAdapter {
    settings: Settings,
    renderer: Option<OutstreamRenderer>,
}

impl VidoomyAdapter {
    /// Create an adapter without an outstream renderer.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            renderer: None,
        }
    }

    /// Enable outstream renderer wiring.
    #[must_use]
    pub fn with_outstream_renderer(mut self, renderer: OutstreamRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl BidderAdapter for VidoomyAdapter {
    fn code(&self) -> &str {
        &self.settings.bidder_code
    }

    fn supported_media_types(&self) -> &'static [MediaType] {
        SUPPORTED_MEDIA_TYPES
    }

    fn is_bid_request_valid(&self, bid: &BidConfiguration) -> bool {
        validation::is_bid_request_valid(bid, &self.settings.bidder_code)
    }

    fn build_requests(
        &self,
        bids: &[BidConfiguration],
        context: &AuctionContext,
    ) -> Vec<RequestDescriptor> {
        request::build_requests(bids, context, &self.settings)
    }

    fn interpret_response(
        &self,
        response: &ServerResponse,
        request: &RequestDescriptor,
    ) -> Vec<NormalizedBid> {
        response::interpret_response(response, request, &self.settings, self.renderer.as_ref())
    }
}

/// Build the Vidoomy adapter for registration with the orchestrator.
#[must_use]
pub fn register_bidder(
    settings: &Settings,
    renderer: Option<OutstreamRenderer>,
) -> Arc<dyn BidderAdapter> {
    log::info!(
        "Registering {} bidder (endpoint={}, policy={:?}, outstream renderer={})",
        settings.bidder_code,
        settings.endpoint,
        settings.response_policy,
        renderer.is_some()
    );

    let adapter = VidoomyAdapter::new(settings.clone());
    match renderer {
        Some(renderer) => Arc::new(adapter.with_outstream_renderer(renderer)),
        None => Arc::new(adapter),
    }
}

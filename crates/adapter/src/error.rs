//! Error types for the Vidoomy adapter.
//!
//! Adapter operations never surface these to the orchestrator: validation
//! failures become `false`, extraction failures fall back, and response or
//! renderer failures degrade into an empty result or a bid without a renderer.
//! The variants exist so each degradation is logged with a precise cause.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum AdapterError {
    /// Settings could not be loaded or failed validation.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// A bid configuration was rejected by the validator.
    #[display("Invalid bid configuration: {message}")]
    ConfigurationInvalid { message: String },

    /// A page URL could not be reduced to a hostname.
    #[display("Extraction degraded: {message}")]
    ExtractionDegraded { message: String },

    /// The exchange response was missing fields or had an unexpected shape.
    #[display("Malformed response: {message}")]
    ResponseMalformed { message: String },

    /// The outstream renderer could not be installed.
    #[display("Renderer unavailable: {message}")]
    RendererUnavailable { message: String },
}

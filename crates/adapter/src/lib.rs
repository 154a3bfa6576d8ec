//! Vidoomy bidder adapter.
//!
//! This crate plugs the Vidoomy ad exchange into a header-bidding
//! orchestrator: it validates bid configurations, turns them into GET
//! request descriptors and maps exchange responses back into bids.
//!
//! # Modules
//!
//! - [`adapter`]: The [`adapter::BidderAdapter`] trait implemented for the orchestrator
//! - [`constants`]: Bidder code, endpoint and wire constants
//! - [`device`]: Device class and language derived from browser context
//! - [`error`]: Error types and error handling utilities
//! - [`logging`]: Logger initialization for hosts without a `log` backend
//! - [`page`]: Hostname extraction from page URLs
//! - [`renderer`]: Outstream renderer collaborator traits
//! - [`settings`]: Configuration management and validation
//! - [`types`]: Bid configurations, auction context, requests and bids
//! - [`vidoomy`]: The Vidoomy adapter
//! - [`test_support`]: Testing utilities and mocks

pub mod adapter;
pub mod constants;
pub mod device;
pub mod error;
pub mod logging;
pub mod page;
pub mod renderer;
pub mod settings;
pub mod types;
pub mod vidoomy;

pub use adapter::BidderAdapter;
pub use error::AdapterError;
pub use settings::{ResponsePolicy, Settings};
pub use vidoomy::{register_bidder, VidoomyAdapter};

//! Outstream renderer collaborators.
//!
//! The adapter never plays video itself. For outstream placements it asks a
//! host-supplied [`RendererInstaller`] for a handle and registers the host's
//! render callback on it; playback happens later, on the host's side.

use std::fmt;
use std::sync::Arc;

use error_stack::Report;
use serde::Serialize;
use serde_json::Value as Json;

use crate::error::AdapterError;
use crate::types::NormalizedBid;

/// Callback invoked by the renderer to play a won bid.
pub type RenderFn = Arc<dyn Fn(&NormalizedBid) + Send + Sync>;

/// Descriptor handed to the installer, mirroring the host renderer API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RendererInstallation {
    pub id: String,
    pub adunitcode: String,
    pub loaded: bool,
    pub config: Json,
    pub url: String,
}

/// An installed renderer.
pub trait RendererHandle: fmt::Debug + Send + Sync {
    /// Script URL the renderer was installed from.
    fn url(&self) -> &str;

    /// Register the function that plays the creative.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::RendererUnavailable`] when the handle rejects
    /// the callback.
    fn set_render(&self, render: RenderFn) -> Result<(), Report<AdapterError>>;
}

/// Host collaborator that installs renderers.
pub trait RendererInstaller: Send + Sync {
    /// Install a renderer for one bid.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::RendererUnavailable`] when the renderer cannot
    /// be created.
    fn install(
        &self,
        installation: &RendererInstallation,
    ) -> Result<Arc<dyn RendererHandle>, Report<AdapterError>>;
}

/// Installer plus render callback, injected into the adapter by the host.
#[derive(Clone)]
pub struct OutstreamRenderer {
    installer: Arc<dyn RendererInstaller>,
    render: RenderFn,
}

impl OutstreamRenderer {
    #[must_use]
    pub fn new(installer: Arc<dyn RendererInstaller>, render: RenderFn) -> Self {
        Self { installer, render }
    }

    /// Install a renderer and wire the render callback onto it.
    ///
    /// # Errors
    ///
    /// Propagates installer and handle failures.
    pub fn attach(
        &self,
        installation: &RendererInstallation,
    ) -> Result<Arc<dyn RendererHandle>, Report<AdapterError>> {
        let handle = self.installer.install(installation)?;
        handle.set_render(Arc::clone(&self.render))?;
        Ok(handle)
    }
}

impl fmt::Debug for OutstreamRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutstreamRenderer").finish_non_exhaustive()
    }
}

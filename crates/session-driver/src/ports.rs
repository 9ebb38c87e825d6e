//! Capability traits the execution controller drives

use async_trait::async_trait;
use wizard_core_types::InteractionKind;

use crate::errors::DriverError;
use crate::types::{ElementHandle, PageInfo, SessionConfig};

/// Factory for browsing sessions
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Acquire a fresh session, never shared with another request
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn BrowsingSession>, DriverError>;
}

/// One live browsing session, owned by a single run
#[async_trait]
pub trait BrowsingSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Wait for `selector` to appear and return a handle to it
    async fn locate(&mut self, selector: &str) -> Result<ElementHandle, DriverError>;

    /// Perform `kind` on a located element; `value` is used by value-taking kinds
    async fn interact(
        &mut self,
        element: &ElementHandle,
        kind: InteractionKind,
        value: Option<&str>,
    ) -> Result<(), DriverError>;

    /// JPEG bytes of the current viewport
    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError>;

    /// Visible text of the first element matching `selector`
    async fn read_text(&mut self, selector: &str) -> Result<String, DriverError>;

    async fn page_info(&mut self) -> Result<PageInfo, DriverError>;

    /// Release the session; consumes it so it cannot be closed twice
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

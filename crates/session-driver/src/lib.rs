//! Browsing session capability boundary
//!
//! The execution controller only ever talks to [`SessionDriver`] and
//! [`BrowsingSession`]. Two backends ship with the crate:
//! - [`ChromiumDriver`]: a real Chromium instance over CDP (chromiumoxide)
//! - `ScriptedDriver` (feature `scripted`): in-process, records every call

mod chromium;
pub mod errors;
pub mod ports;
#[cfg(feature = "scripted")]
pub mod scripted;
pub mod types;

pub use chromium::ChromiumDriver;
pub use errors::DriverError;
pub use ports::{BrowsingSession, SessionDriver};
#[cfg(feature = "scripted")]
pub use scripted::{DriverCall, DriverOp, ScriptedDriver};
pub use types::{ElementHandle, EngineProfile, PageInfo, SessionConfig, Viewport};

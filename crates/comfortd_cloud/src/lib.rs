//! Client side of the Panasonic Comfort Cloud API as seen by comfortd.
//!
//! The daemon only ever talks to the cloud through the [`CloudSession`] trait;
//! [`HttpSession`] is the production implementation.

pub mod constants;
mod error;
pub mod http;
mod session;

pub use error::CloudError;
pub use error::Result;
pub use http::HttpSession;
pub use http::HttpSessionConfig;
pub use session::CloudSession;
pub use session::ControlParameters;
pub use session::DeviceParameters;
pub use session::DeviceStatus;
pub use session::RawDevice;

//! A small blocking client for the space-track.org API.
//!
//! ```no_run
//! use spacetrack::{ClientConfig, SessionClient};
//!
//! let config = ClientConfig::with_options([("username", "me"), ("password", "secret")])?;
//! let mut client = SessionClient::new(config);
//! let tle = client.get_latest_tle(Some(25544))?;
//! println!("{tle}");
//! # Ok::<(), anyhow::Error>(())
//! ```
pub mod config;
pub mod cookie_file;
mod error;
pub mod query;
mod session;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ApiError, ErrorKind};
pub use query::{Query, DEFAULT_NORAD_ID};
pub use session::SessionClient;
pub use transport::{HttpTransport, Transport};

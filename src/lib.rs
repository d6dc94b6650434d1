mod cache;
mod client;
mod diff;
mod error;
mod logger;
mod poller;
mod protocol;
mod transport;
mod types;

pub use client::{DEFAULT_PORT, Intent, MyPlaceIqClient, MyPlaceIqClientBuilder};
pub use error::{EntityKind, Error, Result};
pub use logger::MessageLogMode;
pub use transport::SecretHeader;
pub use types::*;

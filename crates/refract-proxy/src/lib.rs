//! Refract: a filtering reverse proxy for development environments.
//!
//! Requests are pointed at a single upstream; responses come back with their
//! bodies, redirect locations and headers rewritten by an ordered rule set.

pub mod config;
pub mod dump;
pub mod filter;
pub mod proxy;

pub use config::Config;
pub use filter::{ExchangeInfo, Filter, FilterError};
pub use proxy::ProxyServer;

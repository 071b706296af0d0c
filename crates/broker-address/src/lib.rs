//! Broker address resolution.
//!
//! Turns a mix of positional `host[:port]` lines, a `hosts` list and a shared
//! `port` into an ordered list of [`BrokerEndpoint`]s. Resolution is pure: it
//! never touches the network.
//!
//! ```
//! use broker_address::BrokerAddressSpec;
//!
//! let endpoints = BrokerAddressSpec::new(["127.0.0.1:9092"])
//!     .with_hosts(["127.0.0.2"])
//!     .with_port(9093)
//!     .resolve()
//!     .unwrap();
//!
//! let lines: Vec<String> = endpoints.iter().map(ToString::to_string).collect();
//! assert_eq!(lines, ["127.0.0.1:9092", "127.0.0.2:9093"]);
//! ```

mod endpoint;
pub mod error;
mod spec;

pub use endpoint::{BrokerEndpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{AddressError, Result};
pub use spec::{bootstrap_servers, resolve, BrokerAddressSpec};

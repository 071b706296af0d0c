use crate::error::{AddressError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host used when no host information is supplied at all.
pub const DEFAULT_HOST: &str = "localhost";

/// Port used when neither the address line nor the options carry one.
pub const DEFAULT_PORT: u16 = 9092;

/// A resolved `host:port` pair identifying one node of the broker cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BrokerEndpoint {
    host: String,
    port: u16,
}

impl BrokerEndpoint {
    /// Build an endpoint from an already separated host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(AddressError::EmptyHost(host));
        }
        if port == 0 {
            return Err(AddressError::InvalidPort {
                line: host,
                port: port.to_string(),
            });
        }
        Ok(Self { host, port })
    }

    /// Parse a free-form address line.
    ///
    /// The port embedded in the line (a trailing `:NNNN` or `:NNNNN` group)
    /// wins over `fallback_port`, which in turn wins over [`DEFAULT_PORT`].
    /// Everything before the embedded port is the host; without an embedded
    /// port the whole (trimmed) line is the host.
    pub fn parse(line: &str, fallback_port: Option<u16>) -> Result<Self> {
        let line = line.trim();
        let (host, port) = match split_port(line) {
            Some((host, digits)) => {
                let port = digits
                    .parse::<u16>()
                    .ok()
                    .filter(|port| *port != 0)
                    .ok_or_else(|| AddressError::InvalidPort {
                        line: line.to_string(),
                        port: digits.to_string(),
                    })?;
                (host, port)
            }
            None => (line, fallback_port.unwrap_or(DEFAULT_PORT)),
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost(line.to_string()));
        }
        Self::new(host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for BrokerEndpoint {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, None)
    }
}

impl TryFrom<String> for BrokerEndpoint {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BrokerEndpoint> for String {
    fn from(endpoint: BrokerEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Split a trailing `:` followed by 4 or 5 ASCII digits off the line.
fn split_port(line: &str) -> Option<(&str, &str)> {
    let (host, digits) = line.rsplit_once(':')?;
    let is_port = (4..=5).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    is_port.then_some((host, digits))
}

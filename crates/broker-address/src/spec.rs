use crate::endpoint::BrokerEndpoint;
use crate::error::{AddressError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Broker addresses as supplied by a caller, before resolution.
///
/// Addresses may come positionally (`"host:port"` lines) and through the
/// `hosts`/`port` options. Positional lines are resolved first, then
/// `hosts`, in encounter order and without deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BrokerAddressSpec {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl BrokerAddressSpec {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Build a spec from positional addresses and a loose options map.
    ///
    /// Only `hosts` (a string or an array of strings) and `port` (an integer
    /// or a numeric string) are read; every other key is ignored.
    pub fn from_options<I, S>(addresses: I, options: &Map<String, Value>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(addresses);
        if let Some(hosts) = options.get("hosts") {
            collect_lines(hosts, &mut spec.hosts)?;
        }
        spec.port = match options.get("port") {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_port(value)?),
        };
        Ok(spec)
    }

    /// Build a spec from heterogeneous positional arguments.
    ///
    /// Each argument is an address line or a list of them; a trailing JSON
    /// object is taken as the options map (see [`Self::from_options`]).
    pub fn from_args(args: &[Value]) -> Result<Self> {
        let (lines, options) = match args.split_last() {
            Some((Value::Object(options), rest)) => (rest, Some(options)),
            _ => (args, None),
        };

        let mut addresses = Vec::new();
        for line in lines {
            collect_lines(line, &mut addresses)?;
        }

        match options {
            Some(options) => Self::from_options(addresses, options),
            None => Ok(Self::new(addresses)),
        }
    }

    /// Resolve into broker endpoints.
    ///
    /// When neither positional addresses nor `hosts` are present the result
    /// is exactly one endpoint at `localhost:9092`.
    pub fn resolve(&self) -> Result<Vec<BrokerEndpoint>> {
        let endpoints = self
            .addresses
            .iter()
            .chain(self.hosts.iter())
            .map(|line| BrokerEndpoint::parse(line, self.port))
            .collect::<Result<Vec<_>>>()?;

        if endpoints.is_empty() {
            return Ok(vec![BrokerEndpoint::default()]);
        }
        Ok(endpoints)
    }
}

/// Resolve positional addresses plus `hosts`/`port` options in one call.
pub fn resolve<S: AsRef<str>>(
    addresses: &[S],
    hosts: &[S],
    port: Option<u16>,
) -> Result<Vec<BrokerEndpoint>> {
    BrokerAddressSpec {
        addresses: addresses.iter().map(|s| s.as_ref().to_string()).collect(),
        hosts: hosts.iter().map(|s| s.as_ref().to_string()).collect(),
        port,
    }
    .resolve()
}

/// Render endpoints as a comma separated `bootstrap.servers` value.
pub fn bootstrap_servers(endpoints: &[BrokerEndpoint]) -> String {
    endpoints
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn collect_lines(value: &Value, into: &mut Vec<String>) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::String(line) => {
            into.push(line.clone());
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| collect_lines(item, into)),
        other => Err(AddressError::InvalidArgument(format!(
            "expected an address string or a list of them, got {other}"
        ))),
    }
}

fn parse_port(value: &Value) -> Result<u16> {
    let invalid = || AddressError::InvalidPort {
        line: "port option".to_string(),
        port: value.to_string(),
    };
    let port = match value {
        Value::Number(n) => n.as_u64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(endpoints: &[BrokerEndpoint]) -> Vec<String> {
        endpoints.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_empty_input_resolves_to_default_endpoint() {
        let endpoints = BrokerAddressSpec::default().resolve().unwrap();
        assert_eq!(strings(&endpoints), vec!["localhost:9092"]);
    }

    #[test]
    fn test_port_option_alone_does_not_add_hosts() {
        let endpoints = BrokerAddressSpec::default().with_port(9093).resolve().unwrap();
        assert_eq!(strings(&endpoints), vec!["localhost:9092"]);
    }

    #[test]
    fn test_positional_then_hosts_with_shared_port() {
        let endpoints = BrokerAddressSpec::new(["127.0.0.1:9092"])
            .with_hosts(["127.0.0.2"])
            .with_port(9093)
            .resolve()
            .unwrap();

        assert_eq!(
            endpoints,
            vec![
                BrokerEndpoint::new("127.0.0.1", 9092).unwrap(),
                BrokerEndpoint::new("127.0.0.2", 9093).unwrap(),
            ]
        );
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let endpoints = resolve(&["broker:9092", "broker:9092"], &[], None).unwrap();
        assert_eq!(strings(&endpoints), vec!["broker:9092", "broker:9092"]);
    }

    #[test]
    fn test_from_args_with_trailing_options() {
        let args = vec![
            json!("localhost:9092"),
            json!("127.0.0.1"),
            json!({
                "hosts": ["127.0.0.2:9094"],
                "port": 9093,
                "unknown_key": "ignored"
            }),
        ];
        let endpoints = BrokerAddressSpec::from_args(&args).unwrap().resolve().unwrap();
        assert_eq!(
            strings(&endpoints),
            vec!["localhost:9092", "127.0.0.1:9093", "127.0.0.2:9094"]
        );
    }

    #[test]
    fn test_from_args_accepts_nested_lists_and_single_host() {
        let args = vec![
            json!(["a:9001", "b"]),
            json!({ "hosts": "c", "port": "9002" }),
        ];
        let endpoints = BrokerAddressSpec::from_args(&args).unwrap().resolve().unwrap();
        assert_eq!(strings(&endpoints), vec!["a:9001", "b:9002", "c:9002"]);
    }

    #[test]
    fn test_from_args_rejects_non_string_addresses() {
        let err = BrokerAddressSpec::from_args(&[json!(42)]).unwrap_err();
        assert!(matches!(err, AddressError::InvalidArgument(_)));
    }

    #[test]
    fn test_invalid_port_option() {
        let options = json!({ "port": 70000 });
        let err = BrokerAddressSpec::from_options(Vec::<String>::new(), options.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, AddressError::InvalidPort { .. }));
    }

    #[test]
    fn test_bootstrap_servers() {
        let endpoints = resolve(&["a:9001", "b"], &[], None).unwrap();
        assert_eq!(bootstrap_servers(&endpoints), "a:9001,b:9092");
    }
}

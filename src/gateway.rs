//! The entry point: cluster settings, the shared producer and the dataset
//! registry.

use crate::command::Create;
use crate::dataset::Dataset;
use crate::relation::Relation;
use broker_address::{BrokerAddressSpec, BrokerEndpoint};
use dataset_attributes::{value_to_string, AttributeMap, Attributes, Configuration, Schema};
use kafka_session::{Connector, Error, KafkaConnector, ProducerSession, Result, SharedSession};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::info;

static GATEWAY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .optional("client_id")
        .include(ProducerSession::schema())
        // Consumer defaults
        .attribute("min_bytes", 1)
        .attribute("max_bytes", 1_048_576)
        .attribute("max_wait_ms", 100)
});

/// Everything datasets of one gateway share.
pub struct Cluster {
    client_id: String,
    endpoints: Vec<BrokerEndpoint>,
    attributes: Configuration,
    connector: Arc<dyn Connector>,
    producer: SharedSession,
}

impl Cluster {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn endpoints(&self) -> &[BrokerEndpoint] {
        &self.endpoints
    }

    /// Gateway-level attributes, used as defaults by every dataset.
    pub fn attributes(&self) -> &Configuration {
        &self.attributes
    }

    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    pub fn producer(&self) -> &SharedSession {
        &self.producer
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("client_id", &self.client_id)
            .field("endpoints", &self.endpoints)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Gateway to a Kafka cluster.
///
/// Holds one producer session shared by every write path and a registry of
/// consumer datasets keyed by topic name.
#[derive(Debug)]
pub struct Gateway {
    cluster: Arc<Cluster>,
    datasets: BTreeMap<String, Dataset>,
}

impl Attributes for Gateway {
    fn schema() -> &'static Schema {
        &GATEWAY_SCHEMA
    }
}

impl Gateway {
    /// Resolve brokers from `addresses` plus the `hosts`/`port` options and
    /// open the shared producer through `connector`.
    ///
    /// `client_id` is required. Unknown options are ignored.
    pub fn new<S: Into<String>>(
        addresses: impl IntoIterator<Item = S>,
        options: &AttributeMap,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let endpoints = BrokerAddressSpec::from_options(addresses, options)?.resolve()?;
        let attributes = Self::configure(options);

        let client_id = attributes
            .get("client_id")
            .and_then(value_to_string)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "client_id is required to identify the client to the brokers".to_string(),
                )
            })?;

        let producer = ProducerSession::connect(
            connector.as_ref(),
            &endpoints,
            &client_id,
            &attributes.to_map(),
        )?;

        info!(
            "Gateway ready: client_id={}, brokers={}",
            client_id,
            broker_address::bootstrap_servers(&endpoints)
        );

        Ok(Self {
            cluster: Arc::new(Cluster {
                client_id,
                endpoints,
                attributes,
                connector,
                producer: SharedSession::new(producer),
            }),
            datasets: BTreeMap::new(),
        })
    }

    /// Like [`Gateway::new`], connecting to a real cluster.
    pub fn connect<S: Into<String>>(
        addresses: impl IntoIterator<Item = S>,
        options: &AttributeMap,
    ) -> Result<Self> {
        Self::new(addresses, options, Arc::new(KafkaConnector::new()))
    }

    /// Register a dataset for `topic` with the gateway defaults, replacing
    /// (and closing) any dataset already registered under that name.
    pub fn dataset(&mut self, topic: &str) -> Result<&mut Self> {
        if let Some(previous) = self.datasets.remove(topic) {
            previous.close()?;
        }
        let dataset = Dataset::new(self.cluster.clone(), topic, &AttributeMap::new())?;
        self.datasets.insert(topic.to_string(), dataset);
        Ok(self)
    }

    pub fn get(&self, topic: &str) -> Option<&Dataset> {
        self.datasets.get(topic)
    }

    pub fn has_dataset(&self, topic: &str) -> bool {
        self.datasets.contains_key(topic)
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// A relation over a fresh view of a registered dataset.
    ///
    /// The view gets its own consumer session, starting from the registered
    /// dataset's configuration.
    pub fn relation(&self, topic: &str) -> Result<Relation> {
        let registered = self.registered(topic)?;
        Ok(Relation::new(Dataset::new(
            self.cluster.clone(),
            topic,
            &registered.attributes().to_map(),
        )?))
    }

    /// A create command writing to a registered dataset's topic through the
    /// shared producer.
    pub fn command(&self, topic: &str) -> Result<Create> {
        let registered = self.registered(topic)?;
        Create::new(Dataset::producer(
            self.cluster.clone(),
            topic,
            &registered.attributes().to_map(),
        ))
    }

    pub fn producer(&self) -> &SharedSession {
        &self.cluster.producer
    }

    pub fn client_id(&self) -> &str {
        &self.cluster.client_id
    }

    pub fn endpoints(&self) -> &[BrokerEndpoint] {
        &self.cluster.endpoints
    }

    pub fn attributes(&self) -> &Configuration {
        &self.cluster.attributes
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    /// Close every dataset session and the shared producer.
    pub fn close(&mut self) -> Result<()> {
        for (_, dataset) in std::mem::take(&mut self.datasets) {
            dataset.close()?;
        }
        self.cluster.producer.close()?;
        info!("Gateway closed: client_id={}", self.cluster.client_id);
        Ok(())
    }

    fn registered(&self, topic: &str) -> Result<&Dataset> {
        self.get(topic).ok_or_else(|| {
            Error::Configuration(format!("no dataset registered for topic {topic:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafka_session::{BrokerEvent, MemoryBroker, Role};
    use serde_json::{json, Value};

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn gateway(broker: &MemoryBroker, options: Value) -> Result<Gateway> {
        Gateway::new(
            ["127.0.0.1:9092"],
            &map(options),
            Arc::new(broker.connector()),
        )
    }

    #[test]
    fn test_defaults() {
        let broker = MemoryBroker::new();
        let gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        let attributes = gateway.attributes();

        assert_eq!(gateway.client_id(), "foo");
        assert_eq!(attributes.get("partitioner"), Some(&Value::Null));
        assert_eq!(attributes.get("compression_codec"), Some(&Value::Null));
        assert_eq!(attributes.get("metadata_refresh_interval_ms"), Some(&json!(600_000)));
        assert_eq!(attributes.get("max_send_retries"), Some(&json!(3)));
        assert_eq!(attributes.get("retry_backoff_ms"), Some(&json!(100)));
        assert_eq!(attributes.get("required_acks"), Some(&json!(0)));
        assert_eq!(attributes.get("ack_timeout_ms"), Some(&json!(1_500)));
        assert_eq!(attributes.get("socket_timeout_ms"), Some(&json!(10_000)));
        assert_eq!(attributes.get("min_bytes"), Some(&json!(1)));
        assert_eq!(attributes.get("max_bytes"), Some(&json!(1_048_576)));
        assert_eq!(attributes.get("max_wait_ms"), Some(&json!(100)));
    }

    #[test]
    fn test_resolves_brokers_from_mixed_input() {
        let broker = MemoryBroker::new();
        let gateway = gateway(
            &broker,
            json!({ "client_id": "foo", "hosts": ["127.0.0.2"], "port": 9093 }),
        )
        .unwrap();
        let endpoints: Vec<String> = gateway.endpoints().iter().map(ToString::to_string).collect();
        assert_eq!(endpoints, vec!["127.0.0.1:9092", "127.0.0.2:9093"]);
    }

    #[test]
    fn test_client_id_is_required() {
        let broker = MemoryBroker::new();
        let err = gateway(&broker, json!({})).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(broker.events().is_empty());
    }

    #[test]
    fn test_numeric_client_id_is_stringified() {
        let broker = MemoryBroker::new();
        let gateway = gateway(&broker, json!({ "client_id": 42 })).unwrap();
        assert_eq!(gateway.client_id(), "42");
    }

    #[test]
    fn test_opens_producer_eagerly() {
        let broker = MemoryBroker::new();
        let gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        assert_eq!(gateway.producer().role(), Role::Producer);
        assert_eq!(broker.events(), vec![BrokerEvent::ProducerOpened]);
    }

    #[test]
    fn test_registers_datasets() {
        let broker = MemoryBroker::new();
        let mut gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        gateway.dataset("foo").unwrap().dataset("bar").unwrap();

        assert!(gateway.has_dataset("foo"));
        assert!(!gateway.has_dataset("baz"));
        assert!(gateway.get("baz").is_none());

        let dataset = gateway.get("bar").unwrap();
        assert_eq!(dataset.topic(), "bar");
        assert_eq!(dataset.client_id(), "foo");
        assert_eq!(dataset.role(), Role::Consumer);
        assert_eq!(gateway.dataset_names().collect::<Vec<_>>(), vec!["bar", "foo"]);
    }

    #[test]
    fn test_reregistering_closes_previous_dataset() {
        let broker = MemoryBroker::new();
        let mut gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        gateway.dataset("foo").unwrap();
        let previous = gateway.get("foo").unwrap().session().clone();

        gateway.dataset("foo").unwrap();

        assert!(previous.is_closed().unwrap());
        assert!(!gateway.get("foo").unwrap().session().is_closed().unwrap());
    }

    #[test]
    fn test_relation_requires_registration() {
        let broker = MemoryBroker::new();
        let gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        assert!(matches!(gateway.relation("nope"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_command_opens_no_consumer() {
        let broker = MemoryBroker::new();
        let mut gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        gateway.dataset("scholars").unwrap();
        let before = broker.events().len();

        let command = gateway.command("scholars").unwrap();

        assert_eq!(broker.events().len(), before);
        assert_eq!(command.dataset().role(), Role::Producer);
        assert!(command.dataset().session().ptr_eq(gateway.producer()));
    }

    #[test]
    fn test_command_ignores_unreachable_partition() {
        let broker = MemoryBroker::with_partitions(1);
        let mut gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        gateway.dataset("scholars").unwrap();

        let options = map(json!({ "partition": 5, "key": "0" }));
        let sent = gateway
            .command("scholars")
            .unwrap()
            .with(&options)
            .unwrap()
            .call(["Matthew"])
            .unwrap();

        assert_eq!(sent.len(), 1);
        assert_eq!(broker.partition_len("scholars", 0), 1);
    }

    #[test]
    fn test_close_releases_everything() {
        let broker = MemoryBroker::new();
        let mut gateway = gateway(&broker, json!({ "client_id": "foo" })).unwrap();
        gateway.dataset("foo").unwrap();
        gateway.close().unwrap();

        assert!(!gateway.has_dataset("foo"));
        assert!(gateway.producer().is_closed().unwrap());
    }
}

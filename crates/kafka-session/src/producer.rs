use crate::driver::{Connector, ProducerDriver};
use crate::error::{Error, Result};
use crate::tuple::{OutgoingRecord, Tuple};
use broker_address::BrokerEndpoint;
use dataset_attributes::{AttributeMap, Attributes, Configuration, Schema};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

static PRODUCER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .optional("partitioner")
        .optional("compression_codec")
        .attribute("metadata_refresh_interval_ms", 600_000)
        .attribute("max_send_retries", 3)
        .attribute("retry_backoff_ms", 100)
        .attribute("required_acks", 0)
        .attribute("ack_timeout_ms", 1_500)
        .attribute("socket_timeout_ms", 10_000)
});

/// Publish-side settings forwarded to the broker client.
///
/// Retries and backoff are the client's business; sessions never retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerTuning {
    /// Name of the client's key partitioner (e.g. `murmur2_random`).
    pub partitioner: Option<String>,
    /// `gzip`, `snappy`, `lz4`, `zstd` or none.
    pub compression_codec: Option<String>,
    pub metadata_refresh_interval_ms: u64,
    pub max_send_retries: u32,
    pub retry_backoff_ms: u64,
    pub required_acks: i16,
    pub ack_timeout_ms: u64,
    pub socket_timeout_ms: u64,
}

impl ProducerTuning {
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Ok(Self {
            partitioner: config.get_as("partitioner")?,
            compression_codec: config.get_as("compression_codec")?,
            metadata_refresh_interval_ms: config.require("metadata_refresh_interval_ms")?,
            max_send_retries: config.require("max_send_retries")?,
            retry_backoff_ms: config.require("retry_backoff_ms")?,
            required_acks: config.require("required_acks")?,
            ack_timeout_ms: config.require("ack_timeout_ms")?,
            socket_timeout_ms: config.require("socket_timeout_ms")?,
        })
    }
}

impl Default for ProducerTuning {
    fn default() -> Self {
        Self {
            partitioner: None,
            compression_codec: None,
            metadata_refresh_interval_ms: 600_000,
            max_send_retries: 3,
            retry_backoff_ms: 100,
            required_acks: 0,
            ack_timeout_ms: 1_500,
            socket_timeout_ms: 10_000,
        }
    }
}

/// A session that can only publish.
pub struct ProducerSession {
    client_id: String,
    endpoints: Vec<BrokerEndpoint>,
    attributes: Configuration,
    driver: Option<Box<dyn ProducerDriver>>,
}

impl Attributes for ProducerSession {
    fn schema() -> &'static Schema {
        &PRODUCER_SCHEMA
    }
}

impl ProducerSession {
    /// Open a producer connection.
    ///
    /// `options` may hold anything; only the producer attributes are kept.
    pub fn connect(
        connector: &dyn Connector,
        endpoints: &[BrokerEndpoint],
        client_id: &str,
        options: &AttributeMap,
    ) -> Result<Self> {
        if client_id.trim().is_empty() {
            return Err(Error::Configuration(
                "client_id is required to identify the producer".to_string(),
            ));
        }
        if endpoints.is_empty() {
            return Err(Error::Configuration(
                "at least one broker endpoint is required".to_string(),
            ));
        }

        let attributes = Self::configure(options);
        let tuning = ProducerTuning::from_config(&attributes)?;
        let driver = connector.connect_producer(endpoints, client_id, &tuning)?;

        info!(
            "Producer session opened: client_id={}, brokers={}",
            client_id,
            broker_address::bootstrap_servers(endpoints)
        );

        Ok(Self {
            client_id: client_id.to_string(),
            endpoints: endpoints.to_vec(),
            attributes,
            driver: Some(driver),
        })
    }

    /// Send every tuple to its topic/key and return the tuples as sent.
    ///
    /// Nothing is returned unless the whole batch went through.
    pub fn publish<I>(&mut self, tuples: I) -> Result<Vec<Tuple>>
    where
        I: IntoIterator<Item = Tuple>,
    {
        let driver = self.driver.as_mut().ok_or(Error::SessionClosed)?;
        let tuples: Vec<Tuple> = tuples.into_iter().collect();
        if tuples.is_empty() {
            return Ok(tuples);
        }

        if let Some(tuple) = tuples.iter().find(|tuple| tuple.topic.is_empty()) {
            return Err(Error::Configuration(format!(
                "cannot publish {:?} without a topic",
                tuple.value
            )));
        }

        let records: Vec<OutgoingRecord> = tuples.iter().map(OutgoingRecord::from).collect();
        driver.send_batch(&records)?;

        debug!("Published {} tuples", tuples.len());
        Ok(tuples)
    }

    pub fn close(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.close();
            info!("Producer session closed: client_id={}", self.client_id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn endpoints(&self) -> &[BrokerEndpoint] {
        &self.endpoints
    }

    pub fn attributes(&self) -> &Configuration {
        &self.attributes
    }
}

impl Drop for ProducerSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ProducerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerSession")
            .field("client_id", &self.client_id)
            .field("endpoints", &self.endpoints)
            .field("attributes", &self.attributes)
            .field("closed", &self.is_closed())
            .finish()
    }
}

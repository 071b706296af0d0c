use crate::driver::{Connector, ConsumerDriver, ConsumerTarget};
use crate::each::Each;
use crate::error::{Error, Result};
use crate::tuple::Tuple;
use broker_address::BrokerEndpoint;
use dataset_attributes::{AttributeMap, Attributes, Configuration, Schema};
use serde_json::json;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

static CONSUMER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .optional("topic")
        .attribute("partition", 0)
        .attribute("offset", 0)
        .attribute("min_bytes", 1)
        .attribute("max_bytes", 1_048_576)
        .attribute("max_wait_ms", 100)
});

/// Fetch-side settings forwarded to the broker client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTuning {
    /// Smallest amount of data the broker should answer with.
    pub min_bytes: u32,
    /// Upper bound for one fetched batch.
    pub max_bytes: u32,
    /// How long one fetch may block waiting for `min_bytes`.
    pub max_wait_ms: u64,
}

impl FetchTuning {
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Ok(Self {
            min_bytes: config.require("min_bytes")?,
            max_bytes: config.require("max_bytes")?,
            max_wait_ms: config.require("max_wait_ms")?,
        })
    }

    fn to_map(self) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("min_bytes".to_string(), json!(self.min_bytes));
        map.insert("max_bytes".to_string(), json!(self.max_bytes));
        map.insert("max_wait_ms".to_string(), json!(self.max_wait_ms));
        map
    }
}

impl Default for FetchTuning {
    fn default() -> Self {
        Self {
            min_bytes: 1,
            max_bytes: 1_048_576,
            max_wait_ms: 100,
        }
    }
}

/// A session that can only fetch, bound to one topic partition.
///
/// The position starts at the configured `offset` and moves past the last
/// record of every fetched batch.
pub struct ConsumerSession {
    client_id: String,
    endpoints: Vec<BrokerEndpoint>,
    attributes: Configuration,
    topic: String,
    partition: i32,
    position: i64,
    driver: Option<Box<dyn ConsumerDriver>>,
}

impl Attributes for ConsumerSession {
    fn schema() -> &'static Schema {
        &CONSUMER_SCHEMA
    }
}

impl ConsumerSession {
    /// Open a consumer connection at `topic`/`partition`/`offset` taken from
    /// `options`.
    pub fn connect(
        connector: &dyn Connector,
        endpoints: &[BrokerEndpoint],
        client_id: &str,
        options: &AttributeMap,
    ) -> Result<Self> {
        if client_id.trim().is_empty() {
            return Err(Error::Configuration(
                "client_id is required to identify the consumer".to_string(),
            ));
        }
        if endpoints.is_empty() {
            return Err(Error::Configuration(
                "at least one broker endpoint is required".to_string(),
            ));
        }

        let attributes = Self::configure(options);
        let topic: String = attributes.require("topic")?;
        let partition: i32 = attributes.require("partition")?;
        let offset: i64 = attributes.require("offset")?;
        if partition < 0 || offset < 0 {
            return Err(Error::Configuration(format!(
                "partition and offset must not be negative (partition={partition}, offset={offset})"
            )));
        }
        let tuning = FetchTuning::from_config(&attributes)?;

        let target = ConsumerTarget {
            client_id,
            endpoints,
            topic: &topic,
            partition,
            offset,
        };
        let driver = connector.connect_consumer(&target, &tuning)?;

        info!(
            "Consumer session opened: topic={}, partition={}, offset={}",
            topic, partition, offset
        );

        Ok(Self {
            client_id: client_id.to_string(),
            endpoints: endpoints.to_vec(),
            attributes,
            topic,
            partition,
            position: offset,
            driver: Some(driver),
        })
    }

    /// Fetch one batch from the current position.
    pub fn fetch(&mut self) -> Result<Vec<Tuple>> {
        let driver = self.driver.as_mut().ok_or(Error::SessionClosed)?;
        let tuples: Vec<Tuple> = driver
            .fetch_batch()?
            .into_iter()
            .map(Tuple::from)
            .collect();
        if let Some(last) = tuples.last().and_then(|tuple| tuple.offset) {
            self.position = self.position.max(last + 1);
        }
        debug!(
            "Fetched {} tuples from {}/{}",
            tuples.len(),
            self.topic,
            self.partition
        );
        Ok(tuples)
    }

    /// Iterate until a fetch comes back empty.
    pub fn each(&mut self) -> Each<impl FnMut() -> Result<Vec<Tuple>> + '_> {
        Each::new(move || self.fetch())
    }

    /// Try to apply new fetch tuning on the live connection.
    ///
    /// Returns `false` when the driver cannot do that; the session is left
    /// untouched and has to be replaced to pick up the new values.
    pub fn retune(&mut self, tuning: &FetchTuning) -> Result<bool> {
        let driver = self.driver.as_mut().ok_or(Error::SessionClosed)?;
        if !driver.retune(tuning) {
            return Ok(false);
        }
        self.attributes = Self::configure(&self.attributes.merge(&tuning.to_map()));
        debug!("Consumer session retuned in place: {:?}", tuning);
        Ok(true)
    }

    pub fn close(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.close();
            info!(
                "Consumer session closed: topic={}, partition={}",
                self.topic, self.partition
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Offset of the next record to fetch.
    pub fn position(&self) -> i64 {
        self.position
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

impl Drop for ConsumerSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ConsumerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerSession")
            .field("client_id", &self.client_id)
            .field("topic", &self.topic)
            .field("partition", &self.partition)
            .field("position", &self.position)
            .field("attributes", &self.attributes)
            .field("closed", &self.is_closed())
            .finish()
    }
}

//! The seam between sessions and the broker-protocol client.
//!
//! Sessions never talk to the network themselves. They ask a [`Connector`]
//! for a producer or consumer driver and forward records and tuning values to
//! it. [`crate::kafka::KafkaConnector`] is the rdkafka-backed implementation;
//! [`crate::memory::MemoryConnector`] keeps everything in process.

use crate::consumer::FetchTuning;
use crate::error::Result;
use crate::producer::ProducerTuning;
use crate::tuple::{OutgoingRecord, RawMessage};
use broker_address::BrokerEndpoint;

/// Where a consumer driver reads from.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerTarget<'a> {
    pub client_id: &'a str,
    pub endpoints: &'a [BrokerEndpoint],
    pub topic: &'a str,
    pub partition: i32,
    pub offset: i64,
}

/// Opens driver connections to a broker cluster.
pub trait Connector: Send + Sync {
    fn connect_producer(
        &self,
        endpoints: &[BrokerEndpoint],
        client_id: &str,
        tuning: &ProducerTuning,
    ) -> Result<Box<dyn ProducerDriver>>;

    fn connect_consumer(
        &self,
        target: &ConsumerTarget<'_>,
        tuning: &FetchTuning,
    ) -> Result<Box<dyn ConsumerDriver>>;
}

/// A live producer connection.
pub trait ProducerDriver: Send {
    /// Send every record, returning once the whole batch is acknowledged or
    /// the first failure is known.
    fn send_batch(&mut self, records: &[OutgoingRecord]) -> Result<()>;

    fn close(&mut self) {}
}

/// A live consumer connection bound to one topic partition.
pub trait ConsumerDriver: Send {
    /// Fetch the next batch from the tracked offset, advancing it past every
    /// returned message. An empty batch means nothing is available right now.
    fn fetch_batch(&mut self) -> Result<Vec<RawMessage>>;

    /// Apply new fetch tuning without reconnecting.
    ///
    /// Returns `false` when the driver cannot do that; the caller then has to
    /// reconnect.
    fn retune(&mut self, _tuning: &FetchTuning) -> bool {
        false
    }

    fn close(&mut self) {}
}

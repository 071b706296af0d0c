//! rdkafka-backed drivers.

use crate::consumer::FetchTuning;
use crate::driver::{Connector, ConsumerDriver, ConsumerTarget, ProducerDriver};
use crate::error::{Error, Result};
use crate::producer::ProducerTuning;
use crate::tuple::{OutgoingRecord, RawMessage};
use broker_address::{bootstrap_servers, BrokerEndpoint};
use futures::executor::block_on;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, warn};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens rdkafka producers and partition-assigned consumers.
///
/// Extra librdkafka properties given with [`KafkaConnector::with_config`]
/// are applied last and win over the values derived from session attributes.
#[derive(Debug, Clone, Default)]
pub struct KafkaConnector {
    overrides: Vec<(String, String)>,
}

impl KafkaConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Client configuration for a producer.
    pub fn producer_config(
        &self,
        endpoints: &[BrokerEndpoint],
        client_id: &str,
        tuning: &ProducerTuning,
    ) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", bootstrap_servers(endpoints))
            .set("client.id", client_id)
            .set("acks", tuning.required_acks.to_string())
            .set("request.timeout.ms", tuning.ack_timeout_ms.to_string())
            .set("message.send.max.retries", tuning.max_send_retries.to_string())
            .set("retry.backoff.ms", tuning.retry_backoff_ms.to_string())
            .set(
                "topic.metadata.refresh.interval.ms",
                tuning.metadata_refresh_interval_ms.to_string(),
            )
            .set("socket.timeout.ms", tuning.socket_timeout_ms.to_string());
        if let Some(codec) = &tuning.compression_codec {
            config.set("compression.codec", codec);
        }
        if let Some(partitioner) = &tuning.partitioner {
            config.set("partitioner", partitioner);
        }
        self.apply_overrides(&mut config);
        config
    }

    /// Client configuration for a consumer.
    ///
    /// Offsets are never committed; the session owns its position.
    pub fn consumer_config(&self, target: &ConsumerTarget<'_>, tuning: &FetchTuning) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", bootstrap_servers(target.endpoints))
            .set("client.id", target.client_id)
            .set("group.id", target.client_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "true")
            .set("fetch.min.bytes", tuning.min_bytes.to_string())
            .set("max.partition.fetch.bytes", tuning.max_bytes.to_string())
            .set("fetch.wait.max.ms", tuning.max_wait_ms.to_string());
        self.apply_overrides(&mut config);
        config
    }

    fn apply_overrides(&self, config: &mut ClientConfig) {
        for (key, value) in &self.overrides {
            config.set(key, value);
        }
    }
}

impl Connector for KafkaConnector {
    fn connect_producer(
        &self,
        endpoints: &[BrokerEndpoint],
        client_id: &str,
        tuning: &ProducerTuning,
    ) -> Result<Box<dyn ProducerDriver>> {
        let producer: FutureProducer = self.producer_config(endpoints, client_id, tuning).create()?;
        Ok(Box::new(KafkaProducer { producer }))
    }

    fn connect_consumer(
        &self,
        target: &ConsumerTarget<'_>,
        tuning: &FetchTuning,
    ) -> Result<Box<dyn ConsumerDriver>> {
        let consumer: BaseConsumer = self.consumer_config(target, tuning).create()?;

        let mut assignment = TopicPartitionList::new();
        assignment.add_partition_offset(target.topic, target.partition, Offset::Offset(target.offset))?;
        consumer.assign(&assignment)?;

        debug!(
            "Assigned {}/{} at offset {}",
            target.topic, target.partition, target.offset
        );

        Ok(Box::new(KafkaPartitionConsumer {
            consumer,
            max_wait: Duration::from_millis(tuning.max_wait_ms),
            max_bytes: tuning.max_bytes as usize,
        }))
    }
}

struct KafkaProducer {
    producer: FutureProducer,
}

impl ProducerDriver for KafkaProducer {
    fn send_batch(&mut self, records: &[OutgoingRecord]) -> Result<()> {
        let mut deliveries = Vec::with_capacity(records.len());
        for record in records {
            let mut message = FutureRecord::<str, str>::to(&record.topic).payload(&record.value);
            if let Some(key) = &record.key {
                message = message.key(key.as_str());
            }
            let delivery = self.producer.send_result(message).map_err(|(err, _)| err)?;
            deliveries.push(delivery);
        }

        for delivery in deliveries {
            match block_on(delivery) {
                Ok(Ok(_)) => {}
                Ok(Err((err, _))) => return Err(Error::Kafka(err)),
                Err(_) => {
                    return Err(Error::Transport(
                        "delivery was cancelled before an acknowledgement".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.producer.flush(FLUSH_TIMEOUT) {
            warn!("Failed to flush producer on close: {}", e);
        }
    }
}

struct KafkaPartitionConsumer {
    consumer: BaseConsumer,
    max_wait: Duration,
    max_bytes: usize,
}

impl ConsumerDriver for KafkaPartitionConsumer {
    fn fetch_batch(&mut self) -> Result<Vec<RawMessage>> {
        let mut batch = Vec::new();
        let mut bytes = 0;

        while bytes < self.max_bytes {
            match self.consumer.poll(self.max_wait) {
                None => break,
                Some(Ok(message)) => {
                    let value = message.payload().map(<[u8]>::to_vec).unwrap_or_default();
                    bytes += value.len();
                    batch.push(RawMessage {
                        value,
                        topic: message.topic().to_string(),
                        partition: message.partition(),
                        key: message.key().map(<[u8]>::to_vec),
                        offset: message.offset(),
                    });
                }
                Some(Err(KafkaError::PartitionEOF(_))) => break,
                Some(Err(e)) => return Err(Error::Kafka(e)),
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Vec<BrokerEndpoint> {
        vec!["127.0.0.1:9092".parse().unwrap(), "127.0.0.2".parse().unwrap()]
    }

    #[test]
    fn test_producer_config_maps_tuning() {
        let tuning = ProducerTuning {
            compression_codec: Some("gzip".to_string()),
            required_acks: -1,
            ..ProducerTuning::default()
        };
        let config = KafkaConnector::new().producer_config(&endpoints(), "admin", &tuning);

        assert_eq!(
            config.get("bootstrap.servers"),
            Some("127.0.0.1:9092,127.0.0.2:9092")
        );
        assert_eq!(config.get("client.id"), Some("admin"));
        assert_eq!(config.get("acks"), Some("-1"));
        assert_eq!(config.get("request.timeout.ms"), Some("1500"));
        assert_eq!(config.get("message.send.max.retries"), Some("3"));
        assert_eq!(config.get("compression.codec"), Some("gzip"));
        assert_eq!(config.get("partitioner"), None);
    }

    #[test]
    fn test_consumer_config_disables_commits() {
        let endpoints = endpoints();
        let target = ConsumerTarget {
            client_id: "reader",
            endpoints: &endpoints,
            topic: "bar",
            partition: 1,
            offset: 10,
        };
        let tuning = FetchTuning {
            min_bytes: 2,
            max_bytes: 3000,
            max_wait_ms: 250,
        };
        let config = KafkaConnector::new().consumer_config(&target, &tuning);

        assert_eq!(config.get("group.id"), Some("reader"));
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("enable.partition.eof"), Some("true"));
        assert_eq!(config.get("fetch.min.bytes"), Some("2"));
        assert_eq!(config.get("max.partition.fetch.bytes"), Some("3000"));
        assert_eq!(config.get("fetch.wait.max.ms"), Some("250"));
    }

    #[test]
    fn test_overrides_win() {
        let connector = KafkaConnector::new()
            .with_config("acks", "all")
            .with_config("security.protocol", "ssl");
        let config = connector.producer_config(&endpoints(), "admin", &ProducerTuning::default());

        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("security.protocol"), Some("ssl"));
    }
}

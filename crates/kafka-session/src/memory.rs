//! In-process broker.
//!
//! Keeps topics as plain vectors of records so sessions, datasets and the
//! CLI can run without a Kafka cluster. Every connection opened or closed
//! through [`MemoryConnector`] is recorded as a [`BrokerEvent`], which makes
//! session lifecycle observable in tests.

use crate::consumer::FetchTuning;
use crate::driver::{Connector, ConsumerDriver, ConsumerTarget, ProducerDriver};
use crate::error::{Error, Result};
use crate::producer::ProducerTuning;
use crate::tuple::{OutgoingRecord, RawMessage};
use broker_address::BrokerEndpoint;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    ProducerOpened,
    ProducerClosed,
    ConsumerOpened {
        topic: String,
        partition: i32,
        offset: i64,
    },
    ConsumerRetuned {
        topic: String,
        partition: i32,
    },
    ConsumerClosed {
        topic: String,
        partition: i32,
    },
}

#[derive(Debug, Clone)]
struct StoredRecord {
    value: Vec<u8>,
    key: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct BrokerState {
    topics: HashMap<String, Vec<Vec<StoredRecord>>>,
    events: Vec<BrokerEvent>,
    send_failures: VecDeque<String>,
    fetch_failures: VecDeque<String>,
    refuse_retune: bool,
}

/// A shared, in-memory topic store.
///
/// Topics are created on first use with a fixed number of partitions.
/// Records with a numeric key go to `key % partitions`, other keys are
/// hashed, keyless records land in partition 0.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    partitions: i32,
    state: Arc<Mutex<BrokerState>>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub const DEFAULT_PARTITIONS: i32 = 3;

    pub fn new() -> Self {
        Self::with_partitions(Self::DEFAULT_PARTITIONS)
    }

    pub fn with_partitions(partitions: i32) -> Self {
        Self {
            partitions: partitions.max(1),
            state: Arc::new(Mutex::new(BrokerState::default())),
        }
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            broker: self.clone(),
        }
    }

    pub fn partitions(&self) -> i32 {
        self.partitions
    }

    /// The partition a record with this key is stored in.
    pub fn partition_for(&self, key: Option<&[u8]>) -> i32 {
        let Some(key) = key else {
            return 0;
        };
        let total = i64::from(self.partitions);
        match std::str::from_utf8(key).ok().and_then(|k| k.trim().parse::<i64>().ok()) {
            Some(number) => number.rem_euclid(total) as i32,
            None => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % total as u64) as i32
            }
        }
    }

    /// Append one record, returning its partition and offset.
    pub fn append(&self, topic: &str, key: Option<&str>, value: &str) -> (i32, i64) {
        let record = StoredRecord {
            value: value.as_bytes().to_vec(),
            key: key.map(|k| k.as_bytes().to_vec()),
        };
        let mut state = self.lock();
        self.store(&mut state, topic, record)
    }

    /// Number of records stored in one partition.
    pub fn partition_len(&self, topic: &str, partition: i32) -> usize {
        let state = self.lock();
        state
            .topics
            .get(topic)
            .and_then(|partitions| partitions.get(partition as usize))
            .map_or(0, Vec::len)
    }

    /// Connection lifecycle events, oldest first.
    pub fn events(&self) -> Vec<BrokerEvent> {
        self.lock().events.clone()
    }

    /// Make the next `send_batch` fail without storing anything.
    pub fn fail_next_send(&self, message: impl Into<String>) {
        self.lock().send_failures.push_back(message.into());
    }

    /// Make the next `fetch_batch` fail without moving the position.
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        self.lock().fetch_failures.push_back(message.into());
    }

    /// Make consumers refuse in-place retuning, the way the Kafka driver
    /// does.
    pub fn refuse_retune(&self) {
        self.lock().refuse_retune = true;
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        // A panicking test thread must not hide the broker from the others.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, state: &mut BrokerState, topic: &str, record: StoredRecord) -> (i32, i64) {
        let partition = self.partition_for(record.key.as_deref());
        let log = &mut self.topic_mut(state, topic)[partition as usize];
        log.push(record);
        (partition, log.len() as i64 - 1)
    }

    fn topic_mut<'a>(
        &self,
        state: &'a mut BrokerState,
        topic: &str,
    ) -> &'a mut Vec<Vec<StoredRecord>> {
        state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); self.partitions as usize])
    }

    fn record(&self, event: BrokerEvent) {
        self.lock().events.push(event);
    }
}

/// [`Connector`] over a [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    broker: MemoryBroker,
}

impl MemoryConnector {
    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }
}

impl Connector for MemoryConnector {
    fn connect_producer(
        &self,
        endpoints: &[BrokerEndpoint],
        _client_id: &str,
        _tuning: &ProducerTuning,
    ) -> Result<Box<dyn ProducerDriver>> {
        if endpoints.is_empty() {
            return Err(Error::Transport("no broker endpoints".to_string()));
        }
        self.broker.record(BrokerEvent::ProducerOpened);
        Ok(Box::new(MemoryProducer {
            broker: self.broker.clone(),
        }))
    }

    fn connect_consumer(
        &self,
        target: &ConsumerTarget<'_>,
        tuning: &FetchTuning,
    ) -> Result<Box<dyn ConsumerDriver>> {
        if target.endpoints.is_empty() {
            return Err(Error::Transport("no broker endpoints".to_string()));
        }
        if target.partition >= self.broker.partitions {
            return Err(Error::Transport(format!(
                "unknown partition {}/{}",
                target.topic, target.partition
            )));
        }
        self.broker.record(BrokerEvent::ConsumerOpened {
            topic: target.topic.to_string(),
            partition: target.partition,
            offset: target.offset,
        });
        Ok(Box::new(MemoryConsumer {
            broker: self.broker.clone(),
            topic: target.topic.to_string(),
            partition: target.partition,
            position: target.offset,
            tuning: *tuning,
        }))
    }
}

struct MemoryProducer {
    broker: MemoryBroker,
}

impl ProducerDriver for MemoryProducer {
    fn send_batch(&mut self, records: &[OutgoingRecord]) -> Result<()> {
        let mut state = self.broker.lock();
        if let Some(message) = state.send_failures.pop_front() {
            return Err(Error::Transport(message));
        }
        for record in records {
            let stored = StoredRecord {
                value: record.value.as_bytes().to_vec(),
                key: record.key.as_ref().map(|k| k.as_bytes().to_vec()),
            };
            self.broker.store(&mut state, &record.topic, stored);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.broker.record(BrokerEvent::ProducerClosed);
    }
}

struct MemoryConsumer {
    broker: MemoryBroker,
    topic: String,
    partition: i32,
    position: i64,
    tuning: FetchTuning,
}

impl ConsumerDriver for MemoryConsumer {
    fn fetch_batch(&mut self) -> Result<Vec<RawMessage>> {
        let mut state = self.broker.lock();
        if let Some(message) = state.fetch_failures.pop_front() {
            return Err(Error::Transport(message));
        }

        let log = &self.broker.topic_mut(&mut state, &self.topic)[self.partition as usize];
        let max_bytes = self.tuning.max_bytes as usize;
        let mut batch = Vec::new();
        let mut bytes = 0;

        for (offset, record) in log.iter().enumerate().skip(self.position as usize) {
            if !batch.is_empty() && bytes + record.value.len() > max_bytes {
                break;
            }
            bytes += record.value.len();
            batch.push(RawMessage {
                value: record.value.clone(),
                topic: self.topic.clone(),
                partition: self.partition,
                key: record.key.clone(),
                offset: offset as i64,
            });
        }

        self.position += batch.len() as i64;
        Ok(batch)
    }

    fn retune(&mut self, tuning: &FetchTuning) -> bool {
        if self.broker.lock().refuse_retune {
            return false;
        }
        self.tuning = *tuning;
        self.broker.record(BrokerEvent::ConsumerRetuned {
            topic: self.topic.clone(),
            partition: self.partition,
        });
        true
    }

    fn close(&mut self) {
        self.broker.record(BrokerEvent::ConsumerClosed {
            topic: self.topic.clone(),
            partition: self.partition,
        });
    }
}

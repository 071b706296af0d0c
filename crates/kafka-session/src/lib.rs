//! Producer and consumer sessions over a Kafka cluster.
//!
//! A session is one live connection in one [`Role`]. Producers publish
//! [`Tuple`]s; consumers are bound to a single topic partition and fetch
//! batches from a position that only moves forward. Sessions reach the
//! broker through a [`Connector`]: [`KafkaConnector`] for a real cluster,
//! [`MemoryConnector`] for an in-process one.
//!
//! ```
//! use dataset_attributes::AttributeMap;
//! use kafka_session::{ConsumerSession, MemoryBroker, ProducerSession, Tuple};
//! use serde_json::json;
//!
//! let broker = MemoryBroker::with_partitions(1);
//! let endpoints = vec!["localhost:9092".parse().unwrap()];
//!
//! let mut producer =
//!     ProducerSession::connect(&broker.connector(), &endpoints, "admin", &AttributeMap::new())
//!         .unwrap();
//! producer.publish(vec![Tuple::new("Hi!").with_topic("greetings")]).unwrap();
//!
//! let options = json!({ "topic": "greetings" }).as_object().cloned().unwrap();
//! let mut consumer =
//!     ConsumerSession::connect(&broker.connector(), &endpoints, "admin", &options).unwrap();
//! let values: Vec<String> = consumer.each().map(|t| t.unwrap().value).collect();
//! assert_eq!(values, ["Hi!"]);
//! ```

mod consumer;
pub mod driver;
mod each;
pub mod error;
mod kafka;
pub mod memory;
mod producer;
mod session;
mod tuple;

pub use consumer::{ConsumerSession, FetchTuning};
pub use driver::{Connector, ConsumerDriver, ConsumerTarget, ProducerDriver};
pub use each::Each;
pub use error::{Error, Result};
pub use kafka::KafkaConnector;
pub use memory::{BrokerEvent, MemoryBroker, MemoryConnector};
pub use producer::{ProducerSession, ProducerTuning};
pub use session::{Operation, Role, Session, SharedSession};
pub use tuple::{OutgoingRecord, RawMessage, Tuple};

//! Topic Gateway
//!
//! Relation-style access to Kafka topics. A [`Gateway`] resolves the broker
//! list, opens one shared producer and keeps a registry of [`Dataset`]s,
//! one per topic. Datasets fetch through their own consumer session and
//! publish through the shared producer; reconfiguring a dataset yields a new
//! view and reconnects only when the changed attributes require it.
//!
//! ```
//! use kafka_session::{MemoryBroker, Tuple};
//! use serde_json::json;
//! use std::sync::Arc;
//! use topic_gateway::Gateway;
//!
//! let broker = MemoryBroker::new();
//! let options = json!({ "client_id": "admin" }).as_object().cloned().unwrap();
//! let mut gateway = Gateway::new(["localhost:9092"], &options, Arc::new(broker.connector())).unwrap();
//! gateway.dataset("scholars").unwrap();
//!
//! let key = json!({ "key": 0 }).as_object().cloned().unwrap();
//! let insert = gateway.command("scholars").unwrap().with(&key).unwrap();
//! insert.call(["Matthew", "Mark"]).unwrap();
//!
//! let scholars = gateway.get("scholars").unwrap();
//! let values: Vec<String> = scholars.to_vec().unwrap().into_iter().map(|t| t.value).collect();
//! assert_eq!(values, ["Matthew", "Mark"]);
//! assert_eq!(scholars.to_vec().unwrap(), Vec::<Tuple>::new());
//! ```

pub mod command;
pub mod config;
pub mod dataset;
pub mod gateway;
pub mod relation;

pub use command::Create;
pub use config::GatewayConfig;
pub use dataset::{Dataset, Transition};
pub use gateway::{Cluster, Gateway};
pub use relation::Relation;

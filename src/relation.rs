//! Query-style wrapper over a consumer dataset.

use crate::dataset::Dataset;
use crate::gateway::Cluster;
use dataset_attributes::AttributeMap;
use kafka_session::{Result, Tuple};
use serde_json::{json, Value};
use std::sync::Arc;

/// Chains `from`/`offset`/`limit` onto dataset reconfiguration.
///
/// ```no_run
/// # fn demo(gateway: &topic_gateway::Gateway) -> kafka_session::Result<()> {
/// let tuples = gateway.relation("users")?.from(1)?.offset(0)?.limit(1)?.to_vec()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Relation {
    dataset: Dataset,
}

impl Relation {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    /// A relation over `topic` whose consumer starts where `options`
    /// (`partition`, `offset`, `limit`, ...) put it.
    pub fn open(cluster: Arc<Cluster>, topic: &str, options: &AttributeMap) -> Result<Self> {
        Ok(Self::new(Dataset::new(cluster, topic, options)?))
    }

    /// Read from another partition.
    pub fn from(self, partition: i32) -> Result<Self> {
        self.set("partition", json!(partition))
    }

    pub fn offset(self, offset: i64) -> Result<Self> {
        self.set("offset", json!(offset))
    }

    pub fn limit(self, limit: usize) -> Result<Self> {
        self.set("limit", json!(limit))
    }

    pub fn using(self, options: &AttributeMap) -> Result<Self> {
        Ok(Self::new(self.dataset.using(options)?))
    }

    pub fn each(&self) -> Result<impl Iterator<Item = Result<Tuple>> + '_> {
        self.dataset.each()
    }

    pub fn to_vec(&self) -> Result<Vec<Tuple>> {
        self.dataset.to_vec()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    fn set(self, name: &str, value: Value) -> Result<Self> {
        let mut options = AttributeMap::new();
        options.insert(name.to_string(), value);
        self.using(&options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use kafka_session::{BrokerEvent, MemoryBroker};

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_open_connects_once_at_requested_position() {
        let broker = MemoryBroker::with_partitions(2);
        broker.append("scholars", Some("1"), "Matthew");
        broker.append("scholars", Some("1"), "Mark");
        broker.append("scholars", Some("1"), "Luke");
        let gateway = Gateway::new(
            ["localhost:9092"],
            &map(json!({ "client_id": "admin" })),
            Arc::new(broker.connector()),
        )
        .unwrap();
        let skip = broker.events().len();

        let relation = Relation::open(
            gateway.cluster().clone(),
            "scholars",
            &map(json!({ "partition": 1, "offset": 1, "limit": 1 })),
        )
        .unwrap();

        assert_eq!(
            broker.events()[skip..],
            [BrokerEvent::ConsumerOpened {
                topic: "scholars".to_string(),
                partition: 1,
                offset: 1
            }]
        );
        let values: Vec<String> = relation
            .to_vec()
            .unwrap()
            .into_iter()
            .map(|tuple| tuple.value)
            .collect();
        assert_eq!(values, vec!["Mark"]);
    }

    #[test]
    fn test_chained_offset_reconnects() {
        let broker = MemoryBroker::new();
        let gateway = Gateway::new(
            ["localhost:9092"],
            &map(json!({ "client_id": "admin" })),
            Arc::new(broker.connector()),
        )
        .unwrap();
        let relation = Relation::open(gateway.cluster().clone(), "scholars", &AttributeMap::new())
            .unwrap();
        let first = relation.dataset().session().clone();

        let relation = relation.offset(0).unwrap();

        assert!(first.is_closed().unwrap());
        assert!(!relation.dataset().session().is_closed().unwrap());
    }
}

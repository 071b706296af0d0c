//! Topic datasets.
//!
//! A [`Dataset`] is an immutably configured view of one topic. Changing its
//! configuration with [`Dataset::using`] yields a new view; the session
//! behind the old one is either carried over or closed and replaced.
//!
//! Reconnect policy for consumer datasets:
//!
//! | changed attribute                       | effect                                      |
//! |-----------------------------------------|---------------------------------------------|
//! | `offset` (whenever supplied)            | reconnect at that offset                    |
//! | `topic`, `partition`                    | reconnect at the configured offset          |
//! | `key`                                   | reconnect at the current position           |
//! | `min_bytes`, `max_bytes`, `max_wait_ms` | retune in place, else reconnect at position |
//! | anything else (`limit`)                 | reuse the session                           |
//!
//! A `null` option leaves the current value alone. Producer datasets share
//! the gateway's producer and never reconnect.

use crate::gateway::Cluster;
use dataset_attributes::{value_to_string, AttributeMap, Attributes, Configuration, Schema};
use kafka_session::{ConsumerSession, Error, FetchTuning, Result, Role, SharedSession, Tuple};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static DATASET_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .optional("topic")
        .attribute("partition", 0)
        .attribute("offset", 0)
        .optional("key")
        .optional("limit")
        .attribute("min_bytes", 1)
        .attribute("max_bytes", 1_048_576)
        .attribute("max_wait_ms", 100)
});

const RECONNECT_KEYS: [&str; 4] = ["topic", "partition", "offset", "key"];
const TUNING_KEYS: [&str; 3] = ["min_bytes", "max_bytes", "max_wait_ms"];
const SEEK_KEYS: [&str; 2] = ["topic", "partition"];

/// What [`Dataset::using`] does with the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Reuse,
    Retune,
    Reconnect,
}

impl Transition {
    /// Decide from the keys supplied in `options` and the keys whose values
    /// actually changed.
    pub fn plan(options: &AttributeMap, changed: &[&str]) -> Self {
        let offset_supplied = options.get("offset").is_some_and(|value| !value.is_null());
        if offset_supplied || changed.iter().any(|key| RECONNECT_KEYS.contains(key)) {
            Transition::Reconnect
        } else if changed.iter().any(|key| TUNING_KEYS.contains(key)) {
            Transition::Retune
        } else {
            Transition::Reuse
        }
    }
}

pub struct Dataset {
    cluster: Arc<Cluster>,
    role: Role,
    attributes: Configuration,
    session: SharedSession,
}

impl Attributes for Dataset {
    fn schema() -> &'static Schema {
        &DATASET_SCHEMA
    }
}

impl Dataset {
    /// A consumer dataset over `topic`, configured from the cluster
    /// defaults overridden by `overrides`.
    pub fn new(cluster: Arc<Cluster>, topic: &str, overrides: &AttributeMap) -> Result<Self> {
        let attributes = configure_for(&cluster, topic, overrides);
        let session = connect_consumer(&cluster, &attributes, None)?;
        Ok(Self {
            cluster,
            role: Role::Consumer,
            attributes,
            session,
        })
    }

    /// A producer dataset over `topic`. It writes through the cluster's
    /// shared producer and opens no connection of its own.
    pub fn producer(cluster: Arc<Cluster>, topic: &str, overrides: &AttributeMap) -> Self {
        let attributes = configure_for(&cluster, topic, overrides);
        let session = cluster.producer().clone();
        Self {
            cluster,
            role: Role::Producer,
            attributes,
            session,
        }
    }

    /// Return a view in `role`.
    ///
    /// A producer view publishes through the cluster's shared producer; the
    /// consumer session of the current view is closed first.
    pub fn with_role(self, role: Role) -> Result<Self> {
        if role == self.role {
            return Ok(self);
        }
        let session = match role {
            Role::Producer => {
                self.session.close()?;
                self.cluster.producer().clone()
            }
            Role::Consumer => connect_consumer(&self.cluster, &self.attributes, None)?,
        };
        Ok(Self {
            cluster: self.cluster,
            role,
            attributes: self.attributes,
            session,
        })
    }

    /// A new view with `options` merged over the current attributes.
    ///
    /// Unknown keys are dropped. See the module docs for when the session is
    /// replaced.
    pub fn using(self, options: &AttributeMap) -> Result<Self> {
        let options: AttributeMap = options
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let attributes = Self::configure(&self.attributes.merge(&options));
        if self.role == Role::Producer {
            return Ok(Self { attributes, ..self });
        }

        let changed = self.attributes.changed_keys(&attributes);
        let transition = match Transition::plan(&options, &changed) {
            Transition::Retune => {
                let tuning = FetchTuning::from_config(&attributes)?;
                if self.session.retune(&tuning)? {
                    Transition::Retune
                } else {
                    Transition::Reconnect
                }
            }
            other => other,
        };
        debug!(
            "Dataset {} reconfigured: changed={:?}, transition={:?}",
            self.topic(),
            changed,
            transition
        );

        let session = match transition {
            Transition::Reconnect => {
                let reseek = options.contains_key("offset")
                    || changed.iter().any(|key| SEEK_KEYS.contains(key));
                let resume = if reseek {
                    None
                } else {
                    self.session.position()?
                };
                self.session.close()?;
                connect_consumer(&self.cluster, &attributes, resume)?
            }
            Transition::Reuse | Transition::Retune => self.session,
        };
        Ok(Self {
            cluster: self.cluster,
            role: self.role,
            attributes,
            session,
        })
    }

    /// Lazily iterate over fetched tuples, stopping at `limit` if one is set.
    ///
    /// The session's position moves past every fetched batch, so tuples cut
    /// off by the limit are not seen by the next call.
    pub fn each(&self) -> Result<impl Iterator<Item = Result<Tuple>> + '_> {
        let limit = self.limit()?;
        Ok(self.session.each()?.take(limit.unwrap_or(usize::MAX)))
    }

    pub fn to_vec(&self) -> Result<Vec<Tuple>> {
        self.each()?.collect()
    }

    /// Publish tuples, filling in this dataset's topic and key where a tuple
    /// has none.
    pub fn publish<I>(&self, tuples: I) -> Result<Vec<Tuple>>
    where
        I: IntoIterator<Item = Tuple>,
    {
        let topic = self.topic();
        let key = self.key();
        let tuples = tuples
            .into_iter()
            .map(|tuple| tuple.stamp(topic, key.as_deref()))
            .collect();
        self.session.publish(tuples)
    }

    /// Close a consumer dataset's session. The shared producer stays open.
    pub fn close(&self) -> Result<()> {
        match self.role {
            Role::Consumer => self.session.close(),
            Role::Producer => Ok(()),
        }
    }

    pub fn topic(&self) -> &str {
        self.attributes
            .get("topic")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The configured key, rendered the way it is put on the wire.
    pub fn key(&self) -> Option<String> {
        self.attributes.get("key").and_then(value_to_string)
    }

    pub fn limit(&self) -> Result<Option<usize>> {
        let limit: Option<i64> = self.attributes.get_as("limit")?;
        Ok(limit.filter(|limit| *limit > 0).map(|limit| limit as usize))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn client_id(&self) -> &str {
        self.cluster.client_id()
    }

    pub fn attributes(&self) -> &Configuration {
        &self.attributes
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("topic", &self.topic())
            .field("role", &self.role)
            .field("attributes", &self.attributes)
            .finish()
    }
}

fn configure_for(cluster: &Cluster, topic: &str, overrides: &AttributeMap) -> Configuration {
    let mut input = cluster.attributes().merge(overrides);
    if input.get("topic").is_none_or(Value::is_null) {
        input.insert("topic".to_string(), Value::String(topic.to_string()));
    }
    Dataset::configure(&input)
}

/// Open a consumer for `attributes`, at `resume` instead of the configured
/// offset when given.
fn connect_consumer(
    cluster: &Cluster,
    attributes: &Configuration,
    resume: Option<i64>,
) -> Result<SharedSession> {
    if attributes.get("topic").is_none_or(Value::is_null) {
        return Err(Error::Configuration("dataset topic is required".to_string()));
    }
    let mut options = attributes.to_map();
    if let Some(position) = resume {
        options.insert("offset".to_string(), Value::from(position));
    }
    let consumer = ConsumerSession::connect(
        cluster.connector(),
        cluster.endpoints(),
        cluster.client_id(),
        &options,
    )?;
    Ok(SharedSession::new(consumer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_offset_always_reconnects() {
        assert_eq!(
            Transition::plan(&map(json!({ "offset": 0 })), &[]),
            Transition::Reconnect
        );
        assert_eq!(
            Transition::plan(&map(json!({ "offset": null })), &[]),
            Transition::Reuse
        );
    }

    #[test]
    fn test_identity_keys_reconnect() {
        for key in ["topic", "partition", "key"] {
            assert_eq!(
                Transition::plan(&AttributeMap::new(), &[key]),
                Transition::Reconnect
            );
        }
        assert_eq!(
            Transition::plan(&AttributeMap::new(), &["max_wait_ms", "partition"]),
            Transition::Reconnect
        );
    }

    #[test]
    fn test_tuning_keys_retune() {
        assert_eq!(
            Transition::plan(&AttributeMap::new(), &["min_bytes", "max_bytes"]),
            Transition::Retune
        );
    }

    #[test]
    fn test_limit_alone_reuses() {
        assert_eq!(
            Transition::plan(&map(json!({ "limit": 2 })), &["limit"]),
            Transition::Reuse
        );
        assert_eq!(
            Transition::plan(&map(json!({ "max_wait_ms": 100 })), &[]),
            Transition::Reuse
        );
    }

    #[test]
    fn test_schema_keys() {
        let names: Vec<&str> = Dataset::schema().names().collect();
        assert_eq!(
            names,
            vec![
                "topic",
                "partition",
                "offset",
                "key",
                "limit",
                "min_bytes",
                "max_bytes",
                "max_wait_ms"
            ]
        );
    }
}

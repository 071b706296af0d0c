//! Write commands.

use crate::dataset::Dataset;
use dataset_attributes::AttributeMap;
use kafka_session::{Result, Role, Tuple};

/// Publishes plain values to a dataset's topic through the shared producer.
#[derive(Debug)]
pub struct Create {
    dataset: Dataset,
}

impl Create {
    /// Wrap `dataset`, switching it to the producer role.
    pub fn new(dataset: Dataset) -> Result<Self> {
        Ok(Self {
            dataset: dataset.with_role(Role::Producer)?,
        })
    }

    /// A command whose dataset has `options` applied, e.g. a `key`.
    pub fn with(self, options: &AttributeMap) -> Result<Self> {
        self.using(options)
    }

    pub fn using(self, options: &AttributeMap) -> Result<Self> {
        Ok(Self {
            dataset: self.dataset.using(options)?,
        })
    }

    /// Publish `values`, returning the tuples as sent.
    pub fn call<I, V>(&self, values: I) -> Result<Vec<Tuple>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Tuple>,
    {
        self.dataset.publish(values.into_iter().map(Into::into))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

use serde::{Deserialize, Serialize};

/// One broker record, incoming or outgoing.
///
/// Outgoing tuples have no `offset`; fetched tuples always carry one. The
/// partition a record lives in is never part of the tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    pub value: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl Tuple {
    /// An outgoing tuple with only a value; topic and key are stamped later.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            topic: String::new(),
            key: None,
            offset: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Fill in topic and key where the tuple does not carry its own.
    pub fn stamp(mut self, topic: &str, key: Option<&str>) -> Self {
        if self.topic.is_empty() {
            self.topic = topic.to_string();
        }
        if self.key.is_none() {
            self.key = key.map(str::to_string);
        }
        self
    }
}

impl From<&str> for Tuple {
    fn from(value: &str) -> Self {
        Tuple::new(value)
    }
}

impl From<String> for Tuple {
    fn from(value: String) -> Self {
        Tuple::new(value)
    }
}

/// A record as handed to a producer driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRecord {
    pub topic: String,
    pub value: String,
    pub key: Option<String>,
}

impl From<&Tuple> for OutgoingRecord {
    fn from(tuple: &Tuple) -> Self {
        Self {
            topic: tuple.topic.clone(),
            value: tuple.value.clone(),
            key: tuple.key.clone(),
        }
    }
}

/// A record as returned by a consumer driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub value: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub key: Option<Vec<u8>>,
    pub offset: i64,
}

impl From<RawMessage> for Tuple {
    fn from(message: RawMessage) -> Self {
        Self {
            value: String::from_utf8_lossy(&message.value).into_owned(),
            topic: message.topic,
            key: message
                .key
                .map(|key| String::from_utf8_lossy(&key).into_owned()),
            offset: Some(message.offset),
        }
    }
}
